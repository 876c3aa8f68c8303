//! Serialization for the broadcast channel wire protocol.
//!
//! Channel frames are postcard-encoded [`ChannelMessage`] values carried one
//! per WebSocket binary frame, so no length prefix is needed.

use crate::channel::ChannelMessage;

/// Default upper bound on an encoded channel frame (64 KiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Frame exceeds the configured size limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Size of the offending frame.
        size: usize,
        /// Configured limit.
        max: usize,
    },
}

/// Encodes a [`ChannelMessage`] into a byte vector using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the message cannot be serialized.
pub fn encode(msg: &ChannelMessage) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(msg).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`ChannelMessage`] from a byte slice using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode(bytes: &[u8]) -> Result<ChannelMessage, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Encodes a message and rejects it if the result exceeds `max_size` bytes.
///
/// # Errors
///
/// Returns `CodecError::FrameTooLarge` when the encoded frame is too big, or
/// `CodecError::Serialization` if encoding fails.
pub fn encode_bounded(msg: &ChannelMessage, max_size: usize) -> Result<Vec<u8>, CodecError> {
    let bytes = encode(msg)?;
    if bytes.len() > max_size {
        return Err(CodecError::FrameTooLarge {
            size: bytes.len(),
            max: max_size,
        });
    }
    Ok(bytes)
}

/// Decodes a message after checking the raw frame against `max_size`.
///
/// # Errors
///
/// Returns `CodecError::FrameTooLarge` for oversized input, or
/// `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode_bounded(bytes: &[u8], max_size: usize) -> Result<ChannelMessage, CodecError> {
    if bytes.len() > max_size {
        return Err(CodecError::FrameTooLarge {
            size: bytes.len(),
            max: max_size,
        });
    }
    decode(bytes)
}
