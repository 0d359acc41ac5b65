#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Process-global, priority-gated logging for the UCRP workspace.
//!
//! Messages carry a syslog-style [`Priority`]; anything above the
//! configured threshold is discarded before formatting. Delivery goes
//! either to syslog or to a standard stream, and both the threshold
//! and the sink can be flipped at runtime; the client's escape menu
//! does exactly that, and mirrors the choice to its receive thread
//! through the shared control block.
//!
//! # Design
//!
//! All state is atomic or mutex-held process-global state, so the two
//! client threads and every daemon worker share one configuration.
//! [`set_priority`] returns the previous threshold because callers
//! toggle debug output by inspecting what was set before.
//!
//! Tests capture events instead of asserting on process stderr: see
//! [`begin_capture`] and [`drain_events`].

use std::fmt;
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Syslog-style message priorities, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    /// System is unusable.
    Emergency = 0,
    /// Immediate action required.
    Alert = 1,
    /// Critical condition.
    Critical = 2,
    /// Error condition.
    Error = 3,
    /// Warning condition.
    Warning = 4,
    /// Normal but significant event.
    Notice = 5,
    /// Informational.
    Info = 6,
    /// Debug-level tracing.
    Debug = 7,
}

/// Threshold in effect before anyone calls [`set_priority`].
pub const DEFAULT_PRIORITY: Priority = Priority::Warning;

impl Priority {
    /// Numeric value as stored in the shared control block.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Maps a stored numeric priority back to a level.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Emergency),
            1 => Some(Self::Alert),
            2 => Some(Self::Critical),
            3 => Some(Self::Error),
            4 => Some(Self::Warning),
            5 => Some(Self::Notice),
            6 => Some(Self::Info),
            7 => Some(Self::Debug),
            _ => None,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Emergency => "emerg",
            Self::Alert => "alert",
            Self::Critical => "crit",
            Self::Error => "err",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stream sink used when syslog delivery is off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum LogStream {
    /// Drop stream output entirely.
    #[default]
    None = 0,
    /// Write to standard output.
    Stdout = 1,
    /// Write to standard error.
    Stderr = 2,
}

static PRIORITY: AtomicU8 = AtomicU8::new(DEFAULT_PRIORITY as u8);
static USE_SYSLOG: AtomicBool = AtomicBool::new(true);
static STREAM: AtomicU8 = AtomicU8::new(LogStream::None as u8);
static CAPTURE: Mutex<Option<Vec<(Priority, String)>>> = Mutex::new(None);

/// Sets the priority threshold and returns the previous one.
pub fn set_priority(priority: Priority) -> Priority {
    let old = PRIORITY.swap(priority.as_u8(), Ordering::SeqCst);
    Priority::from_u8(old).unwrap_or(DEFAULT_PRIORITY)
}

/// The priority threshold currently in effect.
#[must_use]
pub fn priority() -> Priority {
    Priority::from_u8(PRIORITY.load(Ordering::SeqCst)).unwrap_or(DEFAULT_PRIORITY)
}

/// Routes delivery to syslog (`true`) or the configured stream.
pub fn set_use_syslog(use_syslog: bool) {
    USE_SYSLOG.store(use_syslog, Ordering::SeqCst);
}

/// Whether syslog delivery is currently selected.
#[must_use]
pub fn use_syslog() -> bool {
    USE_SYSLOG.load(Ordering::SeqCst)
}

/// Selects the stream used when syslog delivery is off.
pub fn set_stream(stream: LogStream) {
    STREAM.store(stream as u8, Ordering::SeqCst);
}

/// Whether a message at `priority` would currently be delivered.
#[must_use]
pub fn enabled(priority_of_message: Priority) -> bool {
    priority_of_message.as_u8() <= PRIORITY.load(Ordering::SeqCst)
}

/// Formats and delivers one message if the threshold admits it.
///
/// Prefer the [`log_at!`] family, which skips formatting entirely for
/// filtered messages.
pub fn emit(priority_of_message: Priority, args: fmt::Arguments<'_>) {
    if !enabled(priority_of_message) {
        return;
    }
    let text = args.to_string();

    if let Ok(mut capture) = CAPTURE.lock() {
        if let Some(events) = capture.as_mut() {
            events.push((priority_of_message, text));
            return;
        }
    }

    if use_syslog() {
        syslog_line(priority_of_message, &text);
    } else {
        stream_line(priority_of_message, &text);
    }
}

fn stream_line(priority_of_message: Priority, text: &str) {
    let stream = match STREAM.load(Ordering::SeqCst) {
        1 => LogStream::Stdout,
        2 => LogStream::Stderr,
        _ => return,
    };
    let line = format!("ucrp[{priority_of_message}]: {text}\n");
    let _ = match stream {
        LogStream::Stdout => std::io::stdout().lock().write_all(line.as_bytes()),
        LogStream::Stderr => std::io::stderr().lock().write_all(line.as_bytes()),
        LogStream::None => Ok(()),
    };
}

#[cfg(unix)]
fn syslog_line(priority_of_message: Priority, text: &str) {
    let Ok(ctext) = std::ffi::CString::new(text) else {
        return;
    };
    // SAFETY: both pointers are NUL-terminated buffers that live for
    // the duration of the call; LOG_USER is a plain facility constant.
    #[allow(unsafe_code)]
    unsafe {
        libc::syslog(
            libc::LOG_USER | libc::c_int::from(priority_of_message.as_u8()),
            c"%s".as_ptr(),
            ctext.as_ptr(),
        );
    }
}

#[cfg(not(unix))]
fn syslog_line(priority_of_message: Priority, text: &str) {
    stream_line(priority_of_message, text);
}

/// Starts buffering events instead of delivering them. Test support.
pub fn begin_capture() {
    if let Ok(mut capture) = CAPTURE.lock() {
        *capture = Some(Vec::new());
    }
}

/// Stops buffering and returns everything captured since
/// [`begin_capture`]. Test support.
pub fn drain_events() -> Vec<(Priority, String)> {
    CAPTURE
        .lock()
        .map(|mut capture| capture.take().unwrap_or_default())
        .unwrap_or_default()
}

/// Logs at an explicit [`Priority`].
#[macro_export]
macro_rules! log_at {
    ($priority:expr, $($arg:tt)*) => {
        if $crate::enabled($priority) {
            $crate::emit($priority, ::std::format_args!($($arg)*));
        }
    };
}

/// Logs at [`Priority::Debug`].
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log_at!($crate::Priority::Debug, $($arg)*) };
}

/// Logs at [`Priority::Info`].
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log_at!($crate::Priority::Info, $($arg)*) };
}

/// Logs at [`Priority::Notice`].
#[macro_export]
macro_rules! log_notice {
    ($($arg:tt)*) => { $crate::log_at!($crate::Priority::Notice, $($arg)*) };
}

/// Logs at [`Priority::Warning`].
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => { $crate::log_at!($crate::Priority::Warning, $($arg)*) };
}

/// Logs at [`Priority::Error`].
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log_at!($crate::Priority::Error, $($arg)*) };
}

/// Logs at [`Priority::Critical`].
#[macro_export]
macro_rules! log_crit {
    ($($arg:tt)*) => { $crate::log_at!($crate::Priority::Critical, $($arg)*) };
}
