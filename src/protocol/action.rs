//! Action definitions
//!
//! Represents the outbound messages a client can send.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{RadiumError, Result};
use super::codec::{encode_u16_be, encode_u64_be, encode_u8};
use super::{ProtocolRevision, WatchMode};

/// Action types
///
/// Opcodes are per revision: `Close` (V1) and `AddEntry` (V2/V3) share 0x02.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Ping,
    Close,
    AddEntry,
    RemoveEntry,
    SetWatchMode,
}

impl ActionType {
    pub fn opcode(self) -> u8 {
        match self {
            ActionType::Ping => 0x00,
            ActionType::Close => 0x02,
            ActionType::AddEntry => 0x02,
            ActionType::RemoveEntry => 0x04,
            ActionType::SetWatchMode => 0x07,
        }
    }
}

/// An outbound protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Liveness check
    Ping,

    /// Ask the server to close the connection (V1 only)
    Close,

    /// Store an entry that expires at `timestamp` (V2/V3)
    AddEntry { timestamp: i64, data: Bytes },

    /// Drop a previously added entry (V2/V3)
    RemoveEntry { timestamp: i64, id: u16 },

    /// Change the server-side watch mode
    SetWatchMode { mode: WatchMode, tag: Option<u64> },
}

impl Action {
    /// Watch mode change without a tag
    pub fn set_watch_mode(mode: WatchMode) -> Self {
        Action::SetWatchMode { mode, tag: None }
    }

    /// Watch only entries carrying `tag` (V2)
    pub fn watch_tagged(tag: u64) -> Self {
        Action::SetWatchMode {
            mode: WatchMode::Tagged,
            tag: Some(tag),
        }
    }

    pub fn add_entry(timestamp: i64, data: impl Into<Bytes>) -> Self {
        Action::AddEntry {
            timestamp,
            data: data.into(),
        }
    }

    pub fn remove_entry(timestamp: i64, id: u16) -> Self {
        Action::RemoveEntry { timestamp, id }
    }

    /// Get the action type
    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Ping => ActionType::Ping,
            Action::Close => ActionType::Close,
            Action::AddEntry { .. } => ActionType::AddEntry,
            Action::RemoveEntry { .. } => ActionType::RemoveEntry,
            Action::SetWatchMode { .. } => ActionType::SetWatchMode,
        }
    }

    /// Exact number of bytes this action occupies on the wire
    pub fn encoded_len(&self, revision: ProtocolRevision) -> usize {
        match self {
            Action::Ping | Action::Close => revision.opcode_width(),
            // op + ts + len + data
            Action::AddEntry { data, .. } => 1 + 8 + 2 + data.len(),
            // op + ts + id
            Action::RemoveEntry { .. } => 1 + 8 + 2,
            Action::SetWatchMode { mode, tag } => {
                let tagged = revision.supports_tags() && *mode == WatchMode::Tagged && tag.is_some();
                2 + if tagged { 8 } else { 0 }
            }
        }
    }

    /// Serialize onto `out`
    ///
    /// Nothing is written unless the whole action is expressible in
    /// `revision`, so a failed call never leaves a partial message behind.
    pub fn write_to<B: BufMut>(&self, revision: ProtocolRevision, out: &mut B) -> Result<()> {
        match self {
            Action::Ping => match revision {
                ProtocolRevision::V1 => out.put_slice(&encode_u16_be(ActionType::Ping.opcode() as u16)),
                _ => out.put_slice(&encode_u8(ActionType::Ping.opcode())),
            },
            Action::Close => {
                if !revision.supports_close() {
                    return Err(unsupported("Close", revision));
                }
                out.put_slice(&encode_u16_be(ActionType::Close.opcode() as u16));
            }
            Action::AddEntry { timestamp, data } => {
                if !revision.supports_entries() {
                    return Err(unsupported("AddEntry", revision));
                }
                let len = u16::try_from(data.len())
                    .map_err(|_| RadiumError::DataLengthOverflow { len: data.len() })?;

                out.put_slice(&encode_u8(ActionType::AddEntry.opcode()));
                out.put_i64(*timestamp);
                out.put_slice(&encode_u16_be(len));
                out.put_slice(data);
            }
            Action::RemoveEntry { timestamp, id } => {
                if !revision.supports_entries() {
                    return Err(unsupported("RemoveEntry", revision));
                }
                out.put_slice(&encode_u8(ActionType::RemoveEntry.opcode()));
                out.put_i64(*timestamp);
                out.put_slice(&encode_u16_be(*id));
            }
            Action::SetWatchMode { mode, tag } => {
                if !revision.supports_watch_mode() {
                    return Err(unsupported("SetWatchMode", revision));
                }
                let value = revision
                    .watch_mode_value(*mode)
                    .ok_or_else(|| unsupported(&format!("watch mode '{}'", mode), revision))?;

                out.put_slice(&encode_u8(ActionType::SetWatchMode.opcode()));
                out.put_slice(&encode_u8(value));

                if revision.supports_tags() && *mode == WatchMode::Tagged {
                    if let Some(tag) = tag {
                        out.put_slice(&encode_u64_be(*tag));
                    }
                }
            }
        }
        Ok(())
    }

    /// Serialize into a freshly allocated buffer
    pub fn encode(&self, revision: ProtocolRevision) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len(revision));
        self.write_to(revision, &mut buf)?;
        Ok(buf.freeze())
    }
}

fn unsupported(what: &str, revision: ProtocolRevision) -> RadiumError {
    RadiumError::Unsupported {
        what: what.to_string(),
        revision,
    }
}
