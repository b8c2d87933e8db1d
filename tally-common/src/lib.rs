pub mod codec;
pub mod logging;
pub mod message;
pub mod status;

pub use codec::{Codec, CodecError, JsonCodec};
pub use message::Message;
pub use status::Status;
pub use tracing;

/// Process-wide control message, published on a broadcast channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Stop reading and return what has been gathered
    Shutdown,
}
