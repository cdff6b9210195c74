//! Push notifications
//!
//! Chunks the server sends on its own once watch mode is enabled.
//!
//! ```text
//! ┌────────┬────────┬────────┬────────┬────────┬──────────────┐
//! │Type (1)│ Ts (8) │ Id (2) │ Tag (8)│ Len (2)│  Data (len)  │
//! └────────┴────────┴────────┴────────┴────────┴──────────────┘
//! ```

use bytes::{Buf, Bytes};

use crate::error::DecodeError;
use super::MessageType;

/// Fixed part of an `EntryExpired` message: type + ts + id + tag + len
pub const ENTRY_EXPIRED_HEADER_SIZE: usize = 1 + 8 + 2 + 8 + 2;

/// An entry reached its expiry time on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryExpired {
    pub timestamp: i64,
    pub id: u16,
    pub tag: u64,
    pub data: Bytes,
}

impl EntryExpired {
    /// Parse a pushed chunk; trailing bytes past `data` are ignored
    pub fn parse(chunk: &[u8]) -> Result<Self, DecodeError> {
        if chunk.len() < ENTRY_EXPIRED_HEADER_SIZE {
            return Err(DecodeError::BufferTooShort {
                expected: ENTRY_EXPIRED_HEADER_SIZE,
                actual: chunk.len(),
            });
        }

        let mut buf = chunk;
        let kind = buf.get_u8();
        if kind != MessageType::EntryExpired as u8 {
            return Err(DecodeError::InvalidValue {
                what: "notification type",
                value: kind,
            });
        }

        let timestamp = buf.get_i64();
        let id = buf.get_u16();
        let tag = buf.get_u64();
        let len = buf.get_u16() as usize;

        if buf.remaining() < len {
            return Err(DecodeError::BufferTooShort {
                expected: ENTRY_EXPIRED_HEADER_SIZE + len,
                actual: chunk.len(),
            });
        }

        Ok(Self {
            timestamp,
            id,
            tag,
            data: Bytes::copy_from_slice(&buf[..len]),
        })
    }
}
