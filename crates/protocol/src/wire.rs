//! Fixed-header frame codec.
//!
//! A frame is six header bytes (type, options, payload length, each a
//! big-endian `u16`) followed by exactly `length` payload bytes. The
//! payload bound keeps any frame plus a NUL terminator within a
//! 1500-byte buffer, a layout inherited from the wire contract this
//! workspace implements.

use std::io::{self, Read};

use crate::error::ProtocolError;
use crate::message::Message;

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 6;

/// Upper bound on an encoded frame plus its terminator byte.
pub const MAX_MSGSIZE: usize = 1500 + 1;

/// Maximum payload size a header may declare.
pub const MAX_PAYLOAD: usize = 1493;

/// The decoded fixed header of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Message type code, possibly unknown to this build.
    pub code: u16,
    /// Option bits; interpretation depends on the code.
    pub options: u16,
    /// Declared payload length, already validated against
    /// [`MAX_PAYLOAD`].
    pub length: u16,
}

impl Header {
    /// Encodes the header in network byte order.
    #[must_use]
    pub fn encode(self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..2].copy_from_slice(&self.code.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.options.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.length.to_be_bytes());
        bytes
    }

    /// Decodes a header from wire bytes, validating the payload bound.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::OversizedHeader`] when the declared
    /// length exceeds [`MAX_PAYLOAD`]; the connection is unsalvageable
    /// at that point because the stream cannot be resynchronized.
    pub fn decode(bytes: [u8; HEADER_LEN]) -> Result<Self, ProtocolError> {
        let code = u16::from_be_bytes([bytes[0], bytes[1]]);
        let options = u16::from_be_bytes([bytes[2], bytes[3]]);
        let length = u16::from_be_bytes([bytes[4], bytes[5]]);

        if usize::from(length) > MAX_PAYLOAD {
            return Err(ProtocolError::OversizedHeader { length });
        }

        Ok(Self {
            code,
            options,
            length,
        })
    }
}

impl TryFrom<&[u8]> for Header {
    type Error = ProtocolError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; HEADER_LEN] =
            bytes
                .try_into()
                .map_err(|_| ProtocolError::HeaderSize {
                    expected: HEADER_LEN,
                    actual: bytes.len(),
                })?;
        Self::decode(array)
    }
}

impl Message {
    /// The wire header for this message.
    #[must_use]
    pub fn header(&self) -> Header {
        Header {
            code: self.raw_code(),
            options: self.options(),
            length: self.payload_len() as u16,
        }
    }

    /// Encodes the full frame: header in network byte order, payload
    /// unchanged.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER_LEN + self.payload_len());
        frame.extend_from_slice(&self.header().encode());
        frame.extend_from_slice(self.payload());
        frame
    }

    /// Decodes one complete frame from `reader`.
    ///
    /// Reads exactly six header bytes and then exactly the declared
    /// payload. Returns `Ok(None)` on a clean end of stream (EOF before
    /// the first header byte); EOF inside a frame is an
    /// [`io::ErrorKind::UnexpectedEof`] error.
    ///
    /// # Errors
    ///
    /// I/O failures from `reader`; an oversized declared length is
    /// surfaced as [`io::ErrorKind::InvalidData`] wrapping
    /// [`ProtocolError::OversizedHeader`].
    pub fn decode<R: Read>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut header_bytes = [0u8; HEADER_LEN];
        if !read_exact_or_eof(reader, &mut header_bytes)? {
            return Ok(None);
        }

        let header = Header::decode(header_bytes)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let mut payload = vec![0u8; usize::from(header.length)];
        reader.read_exact(&mut payload)?;

        Ok(Some(Self::from_wire(header.code, header.options, payload)))
    }
}

/// Fills `buf` completely, looping on short reads.
///
/// Returns `Ok(false)` when the stream ends before the first byte and
/// an `UnexpectedEof` error when it ends partway through.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut done = 0;
    while done < buf.len() {
        match reader.read(&mut buf[done..]) {
            Ok(0) if done == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream closed inside a frame",
                ));
            }
            Ok(n) => done += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests;
