//! Protocol Module
//!
//! Defines the Radium wire protocol spoken by the client.
//!
//! ## Protocol Format
//!
//! Binary, big-endian, no length prefix. The size of each action follows
//! from its opcode (plus the data length field of `AddEntry`).
//!
//! ### Actions
//! - 0x00: PING          - V1: `U16BE(0)`, V2/V3: `U8(0)`
//! - 0x02: CLOSE         - V1 only: `U16BE(2)`
//! - 0x02: ADD_ENTRY     - V2/V3: `U8(2) I64BE(ts) U16BE(len) data`
//! - 0x04: REMOVE_ENTRY  - V2/V3: `U8(4) I64BE(ts) U16BE(id)`
//! - 0x07: SET_WATCH_MODE - `U8(7) U8(mode)`, V2 appends `U64BE(tag)` for Tagged
//!
//! ### Handshake
//! - V1: one mode byte (`Action = 0`, `Listen = 1`) right after connect
//! - V2/V3: none
//!
//! ### Responses
//! The first inbound chunk after an action answers it. Its first byte (V2/V3)
//! or first two bytes (V1) are the response value. `EntryAdded` and `Error`
//! replies carry a payload after the type byte.

mod action;
mod codec;
mod notification;
mod reply;
mod response;
mod revision;
mod watch_mode;

pub use action::{Action, ActionType};
pub use codec::{
    decode_response, decode_u16_be, decode_u64_be, decode_u8, encode_action, encode_u16_be,
    encode_u64_be, encode_u8,
};
pub use notification::{EntryExpired, ENTRY_EXPIRED_HEADER_SIZE};
pub use reply::{EntryAdded, ErrorCode, ErrorMessage, ENTRY_ADDED_SIZE, ERROR_MESSAGE_SIZE};
pub use response::{MessageType, Response};
pub use revision::{ConnectionMode, ProtocolRevision};
pub use watch_mode::WatchMode;
