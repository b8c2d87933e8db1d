use core::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Progress tag carried by every [`Message`](crate::Message).
///
/// Travels on the wire as its numeric code. Decoding any other code is an
/// error; there is no fallback variant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Status {
    Failed = 0,
    Complete = 1,
    InProgress = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown status code {0}")]
pub struct UnknownStatus(pub i64);

impl Status {
    pub const ALL: [Self; 3] = [Self::Failed, Self::Complete, Self::InProgress];

    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for Status {
    type Error = UnknownStatus;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Failed),
            1 => Ok(Self::Complete),
            2 => Ok(Self::InProgress),
            _ => Err(UnknownStatus(value)),
        }
    }
}

impl From<Status> for i64 {
    fn from(value: Status) -> Self {
        value.code()
    }
}

impl Display for Status {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt.write_str(match self {
            Self::Failed => "failed",
            Self::Complete => "complete",
            Self::InProgress => "in progress",
        })
    }
}
