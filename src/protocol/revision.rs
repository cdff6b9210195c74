//! Protocol revisions
//!
//! Three incompatible revisions of the wire format exist in the wild. A
//! connection speaks exactly one of them, chosen up front in the `Config`.

use std::fmt;

use super::WatchMode;

/// Wire protocol revision spoken on a connection
///
/// | Field            | V1                      | V2                     | V3          |
/// |------------------|-------------------------|------------------------|-------------|
/// | Handshake        | `U8(mode)` after connect| none                   | none        |
/// | Ping             | `U16BE(0)`              | `U8(0)`                | `U8(0)`     |
/// | Close            | `U16BE(2)`              | socket shutdown        | socket shutdown |
/// | SetWatchMode     | n/a                     | `U8(7) U8(mode) [U64BE(tag)]` | `U8(7) U8(mode)` |
/// | AddEntry         | n/a                     | `U8(2) I64BE(ts) U16BE(len) data` | same    |
/// | RemoveEntry      | n/a                     | `U8(4) I64BE(ts) U16BE(id)` | same        |
/// | Response         | `U16BE`                 | `U8`                   | `U8`        |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolRevision {
    V1,
    #[default]
    V2,
    V3,
}

impl ProtocolRevision {
    /// Whether the connection mode byte is sent right after connect
    pub fn has_handshake(self) -> bool {
        matches!(self, ProtocolRevision::V1)
    }

    /// Whether `Close` exists as a protocol message
    pub fn supports_close(self) -> bool {
        matches!(self, ProtocolRevision::V1)
    }

    pub fn supports_watch_mode(self) -> bool {
        !matches!(self, ProtocolRevision::V1)
    }

    /// Whether `AddEntry`/`RemoveEntry` exist
    pub fn supports_entries(self) -> bool {
        !matches!(self, ProtocolRevision::V1)
    }

    /// Whether `SetWatchMode` may carry a 64-bit tag
    pub fn supports_tags(self) -> bool {
        matches!(self, ProtocolRevision::V2)
    }

    /// Width in bytes of the opcode that starts every action
    pub fn opcode_width(self) -> usize {
        match self {
            ProtocolRevision::V1 => 2,
            ProtocolRevision::V2 | ProtocolRevision::V3 => 1,
        }
    }

    /// Number of leading bytes decoded from a response chunk
    pub fn response_width(self) -> usize {
        match self {
            ProtocolRevision::V1 => 2,
            ProtocolRevision::V2 | ProtocolRevision::V3 => 1,
        }
    }

    /// Wire value of a watch mode, `None` if this revision has no such mode
    pub fn watch_mode_value(self, mode: WatchMode) -> Option<u8> {
        match (self, mode) {
            (ProtocolRevision::V1, _) => None,
            (_, WatchMode::None) => Some(0),
            (ProtocolRevision::V2, WatchMode::All) => Some(1),
            (ProtocolRevision::V2, WatchMode::Tagged) => Some(2),
            (ProtocolRevision::V3, WatchMode::Watching) => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolRevision::V1 => write!(f, "rev. 1"),
            ProtocolRevision::V2 => write!(f, "rev. 2"),
            ProtocolRevision::V3 => write!(f, "rev. 3"),
        }
    }
}

/// Server-side behavior selected by the V1 handshake byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ConnectionMode {
    #[default]
    Action = 0,
    Listen = 1,
}

impl ConnectionMode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
