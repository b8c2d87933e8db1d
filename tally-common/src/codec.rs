//! Wire encoding for [`Message`].
//!
//! The wire form is a JSON object with two fields, `status` (numeric code)
//! and `value` (string):
//!
//! ```json
//! {"status":1,"value":"message #7"}
//! ```

use std::fmt::Debug;

use thiserror::Error;

use crate::Message;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// A payload the codec refuses outright (empty, wrong framing, ...).
    #[error("Invalid payload: {0}")]
    Invalid(String),
}

/// Converts messages to and from their wire bytes.
///
/// Both loops take a codec as a trait object so an alternative encoding can
/// be substituted without touching the loop logic.
pub trait Codec: Send + Sync + Debug {
    /// # Errors
    /// If the message cannot be represented in this encoding
    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError>;

    /// # Errors
    /// If the payload is malformed or carries an unknown status code
    fn decode(&self, payload: &[u8]) -> Result<Message, CodecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(message).map_err(CodecError::Encode)
    }

    fn decode(&self, payload: &[u8]) -> Result<Message, CodecError> {
        if payload.is_empty() {
            return Err(CodecError::Invalid("empty payload".to_string()));
        }

        serde_json::from_slice(payload).map_err(CodecError::Decode)
    }
}
