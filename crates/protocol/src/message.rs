//! Message codes, option masks, payload constructors, and the CRLF
//! field cursor.
//!
//! Each constructor formats exactly the payload layout its peer
//! expects: textual fields end with CRLF, empty-payload kinds carry
//! nothing, and [`Message::wait`] appends a decimal status field only
//! when the STATUS bit is set.

use std::fmt;

use crate::error::ProtocolError;
use crate::wire::MAX_PAYLOAD;
use crate::SEPARATOR;

/// Message kinds defined by the protocol, with their wire codes.
///
/// Codes in the 100 range travel server-to-client, codes in the 200
/// range client-to-server. Unknown codes are representable on a
/// received [`Message`] (see [`Message::raw_code`]) so receivers can
/// log and drop them instead of failing the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageCode {
    /// Server asks the user a question; answered with [`MessageCode::Tell`].
    Ask = 100,
    /// Server signals that it is busy; the client spins until the next frame.
    Busy = 101,
    /// Server answers a [`MessageCode::Complete`] request.
    Completed = 102,
    /// Raw bytes for the client to render.
    Display = 103,
    /// Server hands the conversation to the user with a prompt string.
    Prompt = 104,
    /// Server signals that help output for a [`MessageCode::Help`] is done.
    Helped = 105,
    /// Server suggests a window size for the client terminal.
    Swinsz = 106,
    /// Server requests execution of a command on the client host.
    Exec = 107,

    /// A completed command line from the user.
    Command = 200,
    /// Request to complete a partial command line.
    Complete = 201,
    /// Request for help on a partial command line.
    Help = 202,
    /// The user interrupted (Ctrl-C or pager quit).
    Interrupt = 203,
    /// The user's answer to an [`MessageCode::Ask`].
    Tell = 204,
    /// The user suspended a login session (Ctrl-Z).
    Suspend = 205,
    /// Result of a local [`MessageCode::Exec`] run.
    Wait = 206,
}

impl MessageCode {
    /// All message codes, server-to-client kinds first.
    pub const fn all() -> &'static [MessageCode] {
        &[
            Self::Ask,
            Self::Busy,
            Self::Completed,
            Self::Display,
            Self::Prompt,
            Self::Helped,
            Self::Swinsz,
            Self::Exec,
            Self::Command,
            Self::Complete,
            Self::Help,
            Self::Interrupt,
            Self::Tell,
            Self::Suspend,
            Self::Wait,
        ]
    }

    /// Returns the wire representation of this code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Maps a wire code back to a known kind.
    #[must_use]
    pub const fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            100 => Some(Self::Ask),
            101 => Some(Self::Busy),
            102 => Some(Self::Completed),
            103 => Some(Self::Display),
            104 => Some(Self::Prompt),
            105 => Some(Self::Helped),
            106 => Some(Self::Swinsz),
            107 => Some(Self::Exec),
            200 => Some(Self::Command),
            201 => Some(Self::Complete),
            202 => Some(Self::Help),
            203 => Some(Self::Interrupt),
            204 => Some(Self::Tell),
            205 => Some(Self::Suspend),
            206 => Some(Self::Wait),
            _ => None,
        }
    }

    /// Canonical name used in logs and frame dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ask => "ASK",
            Self::Busy => "BUSY",
            Self::Completed => "COMPLETED",
            Self::Display => "DISPLAY",
            Self::Prompt => "PROMPT",
            Self::Helped => "HELPED",
            Self::Swinsz => "SWINSZ",
            Self::Exec => "EXEC",
            Self::Command => "COMMAND",
            Self::Complete => "COMPLETE",
            Self::Help => "HELP",
            Self::Interrupt => "INTERRUPT",
            Self::Tell => "TELL",
            Self::Suspend => "SUSPEND",
            Self::Wait => "WAIT",
        }
    }

    /// Returns `true` for kinds a server emits.
    #[must_use]
    pub const fn is_server_to_client(self) -> bool {
        (self as u16) < 200
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u16> for MessageCode {
    type Error = u16;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        Self::from_u16(raw).ok_or(raw)
    }
}

bitflags::bitflags! {
    /// Option bits carried on an ASK frame.
    ///
    /// Unknown bits are retained so future peers can extend the mask
    /// without breaking older clients.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AskOptions: u16 {
        /// Do not echo the reply (password entry).
        const NOECHO = 0x1;
        /// Echo a `*` per accepted character instead of the character.
        const FEEDBACK = 0x2;
        /// Accept exactly one printable character.
        const CHAR = 0x4;
    }

    /// Option bits carried on a WAIT frame.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct WaitOptions: u16 {
        /// The payload carries the child's decimal exit status.
        const STATUS = 0x1;
        /// The child was killed by a signal; no payload.
        const SIGNAL = 0x2;
        /// The child could not be started; no payload.
        const ERROR = 0x4;
    }
}

/// A single protocol frame: code, options, and payload.
///
/// Payloads never exceed [`MAX_PAYLOAD`] bytes. The formatting
/// constructors clamp their output at that bound; checked construction
/// via [`Message::with_payload`] refuses oversize input instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    code: u16,
    options: u16,
    payload: Vec<u8>,
}

impl Message {
    /// Builds a message from a known code and a raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] when the payload
    /// exceeds [`MAX_PAYLOAD`].
    pub fn with_payload(
        code: MessageCode,
        options: u16,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Self, ProtocolError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                length: payload.len(),
            });
        }
        Ok(Self {
            code: code.as_u16(),
            options,
            payload,
        })
    }

    /// Reassembles a frame read off the wire.
    ///
    /// The caller (the header decoder) has already bounded `payload`;
    /// unknown codes are carried through for the receiver to log.
    pub(crate) fn from_wire(code: u16, options: u16, payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        Self {
            code,
            options,
            payload,
        }
    }

    fn formatted(code: MessageCode, options: u16, payload: Vec<u8>) -> Self {
        let mut payload = payload;
        payload.truncate(MAX_PAYLOAD);
        Self {
            code: code.as_u16(),
            options,
            payload,
        }
    }

    fn empty(code: MessageCode) -> Self {
        Self {
            code: code.as_u16(),
            options: 0,
            payload: Vec::new(),
        }
    }

    /// The known kind of this message, if the code is recognized.
    #[must_use]
    pub fn code(&self) -> Option<MessageCode> {
        MessageCode::from_u16(self.code)
    }

    /// The code exactly as it appeared on the wire.
    #[must_use]
    pub const fn raw_code(&self) -> u16 {
        self.code
    }

    /// The raw options word.
    #[must_use]
    pub const fn options(&self) -> u16 {
        self.options
    }

    /// The options word viewed as an ASK mask, unknown bits retained.
    #[must_use]
    pub const fn ask_options(&self) -> AskOptions {
        AskOptions::from_bits_retain(self.options)
    }

    /// The options word viewed as a WAIT mask, unknown bits retained.
    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        WaitOptions::from_bits_retain(self.options)
    }

    /// Payload bytes, exactly as carried on the wire.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Payload with one trailing CRLF removed, if present.
    ///
    /// Receivers store prompt/completion/exec strings in this form.
    #[must_use]
    pub fn payload_trimmed(&self) -> &[u8] {
        self.payload
            .strip_suffix(SEPARATOR)
            .unwrap_or(&self.payload)
    }

    /// Cursor over the CRLF-delimited fields of the payload.
    #[must_use]
    pub fn fields(&self) -> FieldCursor<'_> {
        FieldCursor::new(&self.payload)
    }

    /// ASK: question `prompt` with fallback answer `default`.
    #[must_use]
    pub fn ask(options: AskOptions, prompt: &str, default: &str) -> Self {
        let mut payload = Vec::with_capacity(prompt.len() + default.len() + 4);
        push_field(&mut payload, prompt.as_bytes());
        push_field(&mut payload, default.as_bytes());
        Self::formatted(MessageCode::Ask, options.bits(), payload)
    }

    /// BUSY: no payload.
    #[must_use]
    pub fn busy() -> Self {
        Self::empty(MessageCode::Busy)
    }

    /// COMPLETED: the full replacement line for a completion request.
    #[must_use]
    pub fn completed(completion: &str) -> Self {
        Self::formatted(
            MessageCode::Completed,
            0,
            field(completion.as_bytes()),
        )
    }

    /// DISPLAY: raw bytes for the client to render, no terminator.
    #[must_use]
    pub fn display(text: impl AsRef<[u8]>) -> Self {
        Self::formatted(MessageCode::Display, 0, text.as_ref().to_vec())
    }

    /// PROMPT: hand the conversation to the user.
    #[must_use]
    pub fn prompt(prompt: &str) -> Self {
        Self::formatted(MessageCode::Prompt, 0, field(prompt.as_bytes()))
    }

    /// HELPED: no payload.
    #[must_use]
    pub fn helped() -> Self {
        Self::empty(MessageCode::Helped)
    }

    /// SWINSZ: four decimal window-size fields.
    #[must_use]
    pub fn swinsz(rows: u16, cols: u16, xpixel: u16, ypixel: u16) -> Self {
        let text = format!("{rows}\r\n{cols}\r\n{xpixel}\r\n{ypixel}\r\n");
        Self::formatted(MessageCode::Swinsz, 0, text.into_bytes())
    }

    /// EXEC: a shell command to run on the client host.
    #[must_use]
    pub fn exec(command: &str) -> Self {
        Self::formatted(MessageCode::Exec, 0, field(command.as_bytes()))
    }

    /// COMMAND: a completed line from the user.
    #[must_use]
    pub fn command(line: &str) -> Self {
        Self::formatted(MessageCode::Command, 0, field(line.as_bytes()))
    }

    /// COMPLETE: ask the server to complete a partial line.
    #[must_use]
    pub fn complete(partial: &str) -> Self {
        Self::formatted(MessageCode::Complete, 0, field(partial.as_bytes()))
    }

    /// HELP: ask the server for help on a partial line.
    #[must_use]
    pub fn help(partial: &str) -> Self {
        Self::formatted(MessageCode::Help, 0, field(partial.as_bytes()))
    }

    /// INTERRUPT: no payload.
    #[must_use]
    pub fn interrupt() -> Self {
        Self::empty(MessageCode::Interrupt)
    }

    /// TELL: the user's answer to an ASK.
    #[must_use]
    pub fn tell(answer: &str) -> Self {
        Self::formatted(MessageCode::Tell, 0, field(answer.as_bytes()))
    }

    /// SUSPEND: no payload.
    #[must_use]
    pub fn suspend() -> Self {
        Self::empty(MessageCode::Suspend)
    }

    /// WAIT: outcome of a local exec.
    ///
    /// The decimal `status` field is appended only when `options`
    /// contains [`WaitOptions::STATUS`].
    #[must_use]
    pub fn wait(options: WaitOptions, status: i32) -> Self {
        let payload = if options.contains(WaitOptions::STATUS) {
            field(format!("{status}").as_bytes())
        } else {
            Vec::new()
        };
        Self::formatted(MessageCode::Wait, options.bits(), payload)
    }
}

fn field(text: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(text.len() + SEPARATOR.len());
    push_field(&mut payload, text);
    payload
}

fn push_field(payload: &mut Vec<u8>, text: &[u8]) {
    payload.extend_from_slice(text);
    payload.extend_from_slice(SEPARATOR);
}

/// Cursor over the CRLF-delimited fields of a payload.
///
/// Each call to [`Iterator::next`] yields the bytes up to the next
/// CRLF and advances past it. Trailing bytes with no terminator are
/// not a field and are never yielded.
#[derive(Clone, Debug)]
pub struct FieldCursor<'a> {
    rest: &'a [u8],
}

impl<'a> FieldCursor<'a> {
    /// Creates a cursor at the start of `payload`.
    #[must_use]
    pub fn new(payload: &'a [u8]) -> Self {
        Self { rest: payload }
    }

    /// The next field decoded as UTF-8, or `None` when no terminated
    /// field remains or the bytes are not valid UTF-8.
    pub fn next_str(&mut self) -> Option<&'a str> {
        self.next().and_then(|raw| std::str::from_utf8(raw).ok())
    }
}

impl<'a> Iterator for FieldCursor<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let at = memchr::memmem::find(self.rest, SEPARATOR)?;
        let (head, tail) = self.rest.split_at(at);
        self.rest = &tail[SEPARATOR.len()..];
        Some(head)
    }
}

#[cfg(test)]
mod tests;
