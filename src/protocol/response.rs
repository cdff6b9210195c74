//! Response definitions
//!
//! Represents the value decoded from the chunk answering an action.

use std::fmt;

use bytes::Bytes;

use crate::error::DecodeError;
use super::{EntryAdded, ErrorMessage, ProtocolRevision};

/// Server message types (V2/V3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Ping = 0x00,
    Pong = 0x01,
    AddEntry = 0x02,
    EntryAdded = 0x03,
    RemoveEntry = 0x04,
    EntryRemoved = 0x05,
    EntryExpired = 0x06,
    SetWatchMode = 0x07,
    Ok = 0x08,
    Error = 0x09,
}

impl TryFrom<u8> for MessageType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        match value {
            0x00 => Ok(MessageType::Ping),
            0x01 => Ok(MessageType::Pong),
            0x02 => Ok(MessageType::AddEntry),
            0x03 => Ok(MessageType::EntryAdded),
            0x04 => Ok(MessageType::RemoveEntry),
            0x05 => Ok(MessageType::EntryRemoved),
            0x06 => Ok(MessageType::EntryExpired),
            0x07 => Ok(MessageType::SetWatchMode),
            0x08 => Ok(MessageType::Ok),
            0x09 => Ok(MessageType::Error),
            _ => Err(DecodeError::InvalidValue {
                what: "message type",
                value,
            }),
        }
    }
}

/// A decoded response
///
/// Keeps the whole inbound chunk it was decoded from, so replies with a
/// payload can be parsed and bytes past the reply are not lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    value: u16,
    revision: ProtocolRevision,
    chunk: Bytes,
}

impl Response {
    pub fn new(value: u16, revision: ProtocolRevision) -> Self {
        Self {
            value,
            revision,
            chunk: Bytes::new(),
        }
    }

    /// Attach the chunk the value was decoded from
    pub fn with_chunk(mut self, chunk: Bytes) -> Self {
        self.chunk = chunk;
        self
    }

    /// The full inbound chunk that resolved the action
    pub fn chunk(&self) -> &Bytes {
        &self.chunk
    }

    /// Bytes of the chunk after the decoded value
    ///
    /// Non-empty when the server's next message (e.g. a push) arrived in the
    /// same read as the response.
    pub fn trailing(&self) -> Bytes {
        let width = self.revision.response_width();
        if self.chunk.len() > width {
            self.chunk.slice(width..)
        } else {
            Bytes::new()
        }
    }

    /// Parse the chunk as an `EntryAdded` reply
    pub fn entry_added(&self) -> Result<EntryAdded, DecodeError> {
        EntryAdded::parse(&self.chunk)
    }

    /// Parse the chunk as an `Error` reply
    pub fn error_message(&self) -> Result<ErrorMessage, DecodeError> {
        ErrorMessage::parse(&self.chunk)
    }

    /// The raw decoded value (`U8` widened, or `U16BE` under V1)
    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn revision(&self) -> ProtocolRevision {
        self.revision
    }

    /// Interpret the value as a server message type
    ///
    /// V1 responses carry no message type table and always fail here.
    pub fn message_type(&self) -> Result<MessageType, DecodeError> {
        if self.revision == ProtocolRevision::V1 || self.value > u16::from(u8::MAX) {
            return Err(DecodeError::InvalidValue {
                what: "message type",
                value: self.value.to_be_bytes()[1],
            });
        }
        MessageType::try_from(self.value as u8)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message_type() {
            Ok(kind) => write!(f, "{} ({:?})", self.value, kind),
            Err(_) => write!(f, "{}", self.value),
        }
    }
}
