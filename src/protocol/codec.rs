//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! There is no length prefix. Message boundaries follow from the opcode
//! (and the data length field of `AddEntry`), so an action must always
//! reach the socket as one contiguous write.
//!
//! ### Request (Action) Format, V2
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Op (1)   │ Mode (1) │   Tag (8, Tagged only)      │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Response Format
//! ```text
//! ┌─────────────────────┬──────────────────────────────┐
//! │ Value (1, or 2 V1)  │ trailing bytes (kept raw)    │
//! └─────────────────────┴──────────────────────────────┘
//! ```

use bytes::Bytes;

use crate::error::{DecodeError, Result};
use super::{Action, ProtocolRevision, Response};

// =============================================================================
// Integer Encoding
// =============================================================================

/// Encode a single byte
pub const fn encode_u8(value: u8) -> [u8; 1] {
    [value]
}

/// Encode a 16-bit integer, big-endian
pub const fn encode_u16_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// Encode a 64-bit integer, big-endian
///
/// The full 64-bit range is written; nothing is truncated.
pub const fn encode_u64_be(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

// =============================================================================
// Integer Decoding
// =============================================================================

fn ensure_len(bytes: &[u8], expected: usize) -> std::result::Result<(), DecodeError> {
    if bytes.len() < expected {
        return Err(DecodeError::BufferTooShort {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Decode the byte at offset 0
pub fn decode_u8(bytes: &[u8]) -> std::result::Result<u8, DecodeError> {
    ensure_len(bytes, 1)?;
    Ok(bytes[0])
}

/// Decode a big-endian 16-bit integer at offset 0
pub fn decode_u16_be(bytes: &[u8]) -> std::result::Result<u16, DecodeError> {
    ensure_len(bytes, 2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Decode a big-endian 64-bit integer at offset 0
pub fn decode_u64_be(bytes: &[u8]) -> std::result::Result<u64, DecodeError> {
    ensure_len(bytes, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    Ok(u64::from_be_bytes(raw))
}

// =============================================================================
// Message Encoding/Decoding
// =============================================================================

/// Encode an action into one contiguous buffer
pub fn encode_action(action: &Action, revision: ProtocolRevision) -> Result<Bytes> {
    action.encode(revision)
}

/// Decode the minimal response carried by an inbound chunk
///
/// V1 reads a `U16BE` from the first two bytes, V2/V3 read the first byte.
/// Bytes after the decoded width are kept in the response, not decoded.
pub fn decode_response(
    revision: ProtocolRevision,
    bytes: &[u8],
) -> std::result::Result<Response, DecodeError> {
    let value = match revision.response_width() {
        2 => decode_u16_be(bytes)?,
        _ => u16::from(decode_u8(bytes)?),
    };
    Ok(Response::new(value, revision).with_chunk(Bytes::copy_from_slice(bytes)))
}
