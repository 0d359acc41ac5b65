//! Error type for wire-contract violations.

use thiserror::Error;

use crate::wire::MAX_PAYLOAD;

/// Violations of the UCRP framing rules.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A caller tried to construct a message whose payload exceeds
    /// [`MAX_PAYLOAD`].
    #[error("payload of {length} bytes exceeds the {MAX_PAYLOAD}-byte maximum")]
    PayloadTooLarge {
        /// Size of the rejected payload.
        length: usize,
    },

    /// A decoded header declared a payload length above [`MAX_PAYLOAD`].
    ///
    /// The peer is speaking something other than UCRP; the connection
    /// should be closed rather than resynchronized.
    #[error("header declares {length} payload bytes, more than the {MAX_PAYLOAD}-byte maximum")]
    OversizedHeader {
        /// Length field taken from the wire.
        length: u16,
    },

    /// A header slice had the wrong size.
    #[error("header requires exactly {expected} bytes, got {actual}")]
    HeaderSize {
        /// Required header size.
        expected: usize,
        /// Size of the rejected slice.
        actual: usize,
    },
}
