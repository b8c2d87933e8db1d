use serde::{Deserialize, Serialize};

use crate::Status;

/// A single unit of work on the topic: a status tag plus an opaque payload.
///
/// Built once by the producer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub status: Status,
    pub value: String,
}

impl Message {
    pub fn new(status: Status, value: impl Into<String>) -> Self {
        Self {
            status,
            value: value.into(),
        }
    }

    /// The message a producer emits for position `sequence` of a burst.
    #[must_use]
    pub fn numbered(status: Status, sequence: usize) -> Self {
        Self::new(status, format!("message #{sequence}"))
    }
}
