use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{DeliveryReport, Record, Result};

/// Stream of delivery reports emitted by a producer client.
///
/// Ends once the producer is closed and every outstanding send has been
/// reported.
pub type DeliveryEvents = mpsc::UnboundedReceiver<DeliveryReport>;

/// Publishing side of a broker client.
#[async_trait]
pub trait ProducerClient: Send + Sync + Debug {
    /// Queue `payload` for asynchronous delivery to `topic`.
    ///
    /// Returns as soon as the payload is queued; the outcome arrives later
    /// on the delivery stream.
    ///
    /// # Errors
    /// If the local queue is full or the client is closed
    fn produce(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Wait until nothing is in flight, or `timeout` elapses.
    ///
    /// # Errors
    /// [`BrokerError::FlushTimeout`](crate::BrokerError::FlushTimeout) if
    /// sends are still outstanding when the timeout expires
    async fn flush(&self, timeout: Duration) -> Result<()>;

    /// Hand out the delivery stream. Only the first call returns `Some`.
    fn take_events(&self) -> Option<DeliveryEvents>;

    /// Stop accepting sends. The delivery stream closes after the remaining
    /// outcomes have been emitted.
    fn close(&self);
}

/// Reading side of a broker client.
#[async_trait]
pub trait ConsumerClient: Send + Debug {
    /// # Errors
    /// If the subscription cannot be registered with the broker
    fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// Wait up to `timeout` for the next record.
    ///
    /// Cancelling the returned future before it completes does not consume a
    /// record.
    ///
    /// # Errors
    /// [`BrokerError::Timeout`](crate::BrokerError::Timeout) when nothing
    /// arrived in time, any other variant for transport faults
    async fn read_message(&mut self, timeout: Duration) -> Result<Record>;
}
