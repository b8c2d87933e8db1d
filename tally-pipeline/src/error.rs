use tally_broker::BrokerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Client creation or subscription failed.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// The producer's delivery stream was already handed to someone else.
    #[error("Delivery events already taken from this producer")]
    EventsUnavailable,

    /// The delivery tracker task did not finish cleanly.
    #[error("Delivery tracker failed: {0}")]
    Tracker(String),
}
