//! Error types for broker clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// Nothing arrived within the read timeout. Not a fault.
    #[error("Timed out waiting for a message")]
    Timeout,

    /// Transport-level failure; the client is expected to recover on its own.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The local send queue cannot take another message.
    #[error("Producer queue is full")]
    QueueFull,

    /// `flush` gave up with messages still awaiting an outcome.
    #[error("Flush timed out with {pending} message(s) in flight")]
    FlushTimeout { pending: usize },

    /// The client has been closed.
    #[error("Client closed")]
    Closed,

    #[error("Consumer is not subscribed to a topic")]
    NotSubscribed,

    /// Client could not be created from the given settings.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BrokerError {
    /// Returns `true` for the "no data available" signal of a read.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

#[cfg(feature = "kafka")]
impl From<rdkafka::error::KafkaError> for BrokerError {
    fn from(error: rdkafka::error::KafkaError) -> Self {
        use rdkafka::{error::KafkaError, types::RDKafkaErrorCode};

        match error {
            KafkaError::ClientCreation(msg) => Self::Configuration(msg),
            KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull) => Self::QueueFull,
            KafkaError::Flush(RDKafkaErrorCode::OperationTimedOut) => {
                Self::FlushTimeout { pending: 0 }
            }
            other => Self::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeout_is_timeout() {
        assert!(BrokerError::Timeout.is_timeout());
        assert!(!BrokerError::Transport("reset by peer".into()).is_timeout());
        assert!(!BrokerError::FlushTimeout { pending: 3 }.is_timeout());
    }

    #[test]
    fn flush_timeout_message() {
        let err = BrokerError::FlushTimeout { pending: 3 };
        assert_eq!(err.to_string(), "Flush timed out with 3 message(s) in flight");
    }
}
