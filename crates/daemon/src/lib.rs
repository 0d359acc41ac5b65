//! # Overview
//!
//! A demonstration UCRP server. It drives the interactive client
//! through the whole protocol surface: a greeting, a busy spinner, an
//! editable prompt, questions in every echo mode, a pager-sized output
//! burst, a window-size suggestion, and a local exec request.
//!
//! One listener thread per address family accepts connections; each
//! accepted client gets a worker thread running the conversation
//! through [`serve_connection`].

mod commands;
mod listener;
mod session;

use std::ffi::OsString;
use std::io::Write;
use std::net::TcpStream;

use clap::Parser;
use logging::{LogStream, Priority};

/// Exit status reported by the server binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Clean shutdown.
    Ok = 0,
    /// Bad invocation.
    Usage = 64,
    /// No listening socket could be established.
    Unavailable = 69,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

#[derive(Parser, Debug)]
#[command(name = "ucrpd", about = "Demonstration UCRP server")]
struct Args {
    /// Service name or port number to listen on.
    #[arg(short = 'p', value_name = "SERVICE")]
    service: Option<String>,

    /// Log protocol traffic to stderr.
    #[arg(short = 'd')]
    debug: bool,
}

/// Serves one accepted connection to completion.
///
/// The listener calls this on a worker thread per client; it is public
/// so a conversation can also be driven over any connected socket.
pub fn serve_connection(stream: TcpStream) -> Result<(), transport::TransportError> {
    session::Session::new(stream).serve()
}

/// Parses arguments and serves clients until terminated.
///
/// Help text lands on `stdout`, startup failures on `stderr`; per-
/// session traffic goes through the logging crate.
pub fn run<I, T, Out, Err>(args: I, stdout: &mut Out, stderr: &mut Err) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let args = match Args::try_parse_from(args) {
        Ok(args) => args,
        Err(err) if err.kind() == clap::error::ErrorKind::DisplayHelp => {
            let _ = write!(stdout, "{}", err.render());
            return ExitCode::Ok;
        }
        Err(err) => {
            let _ = write!(stderr, "{}", err.render());
            return ExitCode::Usage;
        }
    };

    logging::set_use_syslog(false);
    logging::set_stream(LogStream::Stderr);
    logging::set_priority(if args.debug {
        Priority::Debug
    } else {
        Priority::Notice
    });

    match listener::serve(args.service.as_deref()) {
        Ok(()) => ExitCode::Ok,
        Err(err) => {
            let _ = writeln!(stderr, "ucrpd: {err}");
            ExitCode::Unavailable
        }
    }
}
