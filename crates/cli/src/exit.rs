//! Exit statuses, following the sysexits convention the original
//! tooling used.

/// Exit status reported by the shell binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Clean shutdown.
    Ok = 0,
    /// Bad invocation: unknown flag, `-c`, or stdin not a terminal.
    Usage = 64,
    /// Internal failure (lost peer thread, editor EOF, exec trouble).
    Software = 70,
    /// The server is unreachable or went away.
    Unavailable = 69,
    /// Local I/O failed (terminal or socket).
    IoError = 74,
    /// The peer violated the wire contract.
    Protocol = 76,
}

impl ExitCode {
    /// Numeric status as handed to the operating system.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code.as_u8())
    }
}
