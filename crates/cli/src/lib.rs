//! # Overview
//!
//! The interactive UCRP shell client. A server drives this program's
//! terminal through the protocol: it prompts, pages long output,
//! collects answers (including passwords), completes partial command
//! lines, and runs local subprocesses, while the client operates the
//! terminal and a control channel.
//!
//! # Design
//!
//! Two threads share one connection and one terminal:
//!
//! - the **receive** thread reads frames, updates the shared control
//!   block, and renders DISPLAY output (directly or through the
//!   pager);
//! - the **transmit** thread (the main thread) watches the control
//!   block and drives the user-facing state machine: busy spinner,
//!   questions, local exec, and the line editor.
//!
//! The control block is guarded by a single mutex with a condvar used
//! as the new-message wakeup; the terminal is guarded by its own gate
//! so exactly one side mutates attributes or performs mode-dependent
//! I/O at a time. SIGINT and SIGTSTP are latched by signal handlers
//! and consumed only by the transmit loop.

mod control;
mod editor;
mod emenu;
mod error;
mod exit;
mod options;
mod pager;
mod rx;
mod session;
mod term;
mod tx;

use std::ffi::OsString;
use std::io::Write;

use is_terminal::IsTerminal;
use logging::LogStream;

pub use error::ClientError;
pub use exit::ExitCode;
pub use options::Invocation;

/// Parses arguments and runs the shell until the session ends.
///
/// Startup diagnostics (usage errors, help text, the tty refusal) go
/// through the supplied writers; the session itself owns the real
/// terminal. Returns the exit status the binary should report. All
/// terminal state is restored to the startup baseline on the way out,
/// whatever the outcome.
pub fn run<I, T, Out, Err>(args: I, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let invocation = match options::parse(args, stdout, stderr) {
        Ok(invocation) => invocation,
        Err(status) => return status,
    };

    // The terminal contract cannot be honored through a pipe.
    if !std::io::stdin().is_terminal() {
        let _ = writeln!(stderr, "ucrpsh: stdin is not a tty");
        return ExitCode::Usage;
    }

    logging::set_use_syslog(true);
    logging::set_stream(LogStream::Stdout);

    match session::run(&invocation) {
        Ok(()) => ExitCode::Ok,
        Err(err) => {
            logging::log_notice!("session ended: {err}");
            err.exit_code()
        }
    }
}
