#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `protocol` defines the UCRP wire contract shared by the interactive
//! shell client and the daemon: the message codes of both directions,
//! the option masks carried in the frame header, the payload
//! constructors, and the fixed six-byte header codec.
//!
//! A frame is a header of three big-endian `u16` fields (type,
//! options, payload length) followed by `length` payload bytes.
//! Structured payloads are sequences of CRLF-terminated fields;
//! [`FieldCursor`] is the only sub-field parser in the workspace.
//!
//! # Invariants
//!
//! - A [`Message`] never holds more than [`MAX_PAYLOAD`] payload bytes.
//!   Checked construction ([`Message::with_payload`]) refuses oversize
//!   input; the convenience constructors clamp formatted text at the
//!   bound instead, the way a bounded format buffer would.
//! - Decoding rejects headers that declare a payload above
//!   [`MAX_PAYLOAD`] before reading a single payload byte.
//! - Unknown message codes and unknown option bits survive a decode
//!   unchanged; policy for them belongs to the caller.
//!
//! # Errors
//!
//! All fallible operations return [`ProtocolError`]. Transport-level
//! concerns (short reads, clean closes, address resolution) live in the
//! `transport` crate.

pub mod dump;
pub mod message;
pub mod wire;

mod error;

pub use error::ProtocolError;
pub use message::{AskOptions, FieldCursor, Message, MessageCode, WaitOptions};
pub use wire::{HEADER_LEN, Header, MAX_MSGSIZE, MAX_PAYLOAD};

/// Service name looked up in the host's service database when no
/// explicit port is given.
pub const SERVICE: &str = "ucrp";

/// Field separator and terminator used inside structured payloads.
pub const SEPARATOR: &[u8] = b"\r\n";
