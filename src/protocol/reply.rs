//! Server replies with a payload
//!
//! Most actions are answered by a bare message type byte. `AddEntry` is
//! answered with `EntryAdded`, and any action may be answered with `Error`.
//!
//! ```text
//! EntryAdded: ┌────────┬────────┬────────┐
//!             │Type (1)│ Ts (8) │ Id (2) │
//!             └────────┴────────┴────────┘
//! Error:      ┌────────┬────────┐
//!             │Type (1)│Code (1)│
//!             └────────┴────────┘
//! ```

use bytes::Buf;

use crate::error::DecodeError;
use super::MessageType;

pub const ENTRY_ADDED_SIZE: usize = 1 + 8 + 2;
pub const ERROR_MESSAGE_SIZE: usize = 1 + 1;

fn expect_type(chunk: &[u8], size: usize, kind: MessageType) -> Result<(), DecodeError> {
    if chunk.len() < size {
        return Err(DecodeError::BufferTooShort {
            expected: size,
            actual: chunk.len(),
        });
    }
    if chunk[0] != kind as u8 {
        return Err(DecodeError::InvalidValue {
            what: "reply type",
            value: chunk[0],
        });
    }
    Ok(())
}

/// The server stored an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryAdded {
    pub timestamp: i64,
    pub id: u16,
}

impl EntryAdded {
    pub fn parse(chunk: &[u8]) -> Result<Self, DecodeError> {
        expect_type(chunk, ENTRY_ADDED_SIZE, MessageType::EntryAdded)?;

        let mut buf = &chunk[1..];
        let timestamp = buf.get_i64();
        let id = buf.get_u16();

        Ok(Self { timestamp, id })
    }
}

/// Why the server refused or failed an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// The worker could not take more clients
    ClientRejected = 0,
    ActionNotImplemented = 1,
    /// The message sent is not an action
    InvalidAction = 2,
    ActionProcessingError = 3,
    /// Reads and/or writes on the server side failed
    ConnectionFailure = 4,
}

impl TryFrom<u8> for ErrorCode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::ClientRejected),
            1 => Ok(ErrorCode::ActionNotImplemented),
            2 => Ok(ErrorCode::InvalidAction),
            3 => Ok(ErrorCode::ActionProcessingError),
            4 => Ok(ErrorCode::ConnectionFailure),
            _ => Err(DecodeError::InvalidValue {
                what: "error code",
                value,
            }),
        }
    }
}

/// An `Error` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorMessage {
    pub code: ErrorCode,
}

impl ErrorMessage {
    pub fn parse(chunk: &[u8]) -> Result<Self, DecodeError> {
        expect_type(chunk, ERROR_MESSAGE_SIZE, MessageType::Error)?;

        Ok(Self {
            code: ErrorCode::try_from(chunk[1])?,
        })
    }
}
