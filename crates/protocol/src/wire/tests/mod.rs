use std::io::Cursor;

use super::{HEADER_LEN, Header, MAX_MSGSIZE, MAX_PAYLOAD};
use crate::error::ProtocolError;
use crate::message::{AskOptions, Message, MessageCode, WaitOptions};

mod limits;

/// Reader that hands out one byte per call, exercising the short-read
/// loops the same way a congested socket would.
struct TrickleReader {
    data: Vec<u8>,
    at: usize,
}

impl TrickleReader {
    fn new(data: Vec<u8>) -> Self {
        Self { data, at: 0 }
    }
}

impl std::io::Read for TrickleReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.at == self.data.len() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.data[self.at];
        self.at += 1;
        Ok(1)
    }
}
