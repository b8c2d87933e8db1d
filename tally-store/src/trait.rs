use std::fmt::Debug;

use async_trait::async_trait;
use tally_common::Message;

use crate::{Report, Result};

/// Where the consumer puts what it reads.
///
/// A store has exactly one owner, the consumer loop, so mutation takes
/// `&mut self` and no locking is involved. Anything else that wants to look
/// inside goes through a [`StoreHandle`](crate::StoreHandle).
#[async_trait]
pub trait Store: Send + Debug {
    /// Append a message.
    ///
    /// # Errors
    /// If the message could not be recorded
    async fn add(&mut self, message: Message) -> Result<()>;

    /// Compute the summary and log it when there is enough data.
    ///
    /// Returns the report when one was emitted, `None` when the store holds
    /// too few messages. Never mutates the store.
    ///
    /// # Errors
    /// If the summary cannot be computed
    fn report(&self) -> Result<Option<Report>>;

    /// The summary over everything received, with no threshold applied.
    fn summary(&self) -> Report;

    /// Number of messages held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
