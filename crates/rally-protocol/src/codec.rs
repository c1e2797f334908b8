//! Codec trait and the JSON implementation.
//!
//! The connection handler decodes inbound frames into [`ClientMessage`]s and
//! encodes outbound [`ServerMessage`]s with whichever codec the server was
//! built with.
//!
//! [`ClientMessage`]: crate::ClientMessage
//! [`ServerMessage`]: crate::ServerMessage

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts messages to frames and back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] producing UTF-8 JSON, which the transport sends as text
/// frames.
///
/// ```rust
/// use rally_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let msg: ClientMessage = JsonCodec.decode(br#"{"type":"resumeGame"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::ResumeGame);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
