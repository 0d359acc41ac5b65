//! Client-local escape menu.
//!
//! Reached through Ctrl-B during line editing, and shown once when the
//! initial connect fails. Runs on the transmit side only.

use std::io::{self, Read, Write};
use std::os::unix::process::CommandExt;
use std::process::Command;

use logging::{DEFAULT_PRIORITY, LogStream, Priority};
use nix::sys::signal::{Signal, raise};

use crate::control::Control;
use crate::term::Terminal;

/// Program that replaces this process on the `l` option.
const LOGIN_PATH: &str = match option_env!("UCRP_LOGIN_PATH") {
    Some(path) => path,
    None => "/usr/bin/login",
};

/// Presents the menu and performs the chosen action.
pub(crate) fn run(ctl: &Control, term: &Terminal) {
    let mut out = io::stdout().lock();
    let banner = format!(
        "\n\
         Supported escape menu options:\n\
         .  - terminate connection\n\
         d  - turn on/off debug output\n\
         l  - exec {LOGIN_PATH}\n\
         \n? "
    );
    if out
        .write_all(banner.as_bytes())
        .and_then(|()| out.flush())
        .is_err()
    {
        return;
    }

    let mut byte = [0u8; 1];
    let Ok(1) = io::stdin().lock().read(&mut byte) else {
        return;
    };
    let _ = out.write_all(b"\n").and_then(|()| out.flush());

    match byte[0] {
        b'.' => {
            let _ = raise(Signal::SIGTERM);
        }
        b'd' => toggle_debug(ctl),
        b'l' => spawn_login(ctl, term),
        _ => {}
    }

    let _ = out.write_all(&byte).and_then(|()| out.flush());
}

/// Flips between debug-to-stream and quiet-to-syslog, mirroring the
/// choice into the control block so the receive thread follows.
fn toggle_debug(ctl: &Control) {
    if logging::priority() == Priority::Debug {
        logging::set_priority(DEFAULT_PRIORITY);
        logging::set_use_syslog(true);

        let mut guard = ctl.lock();
        guard.use_syslog = true;
        guard.logprio = DEFAULT_PRIORITY.as_u8();
    } else {
        logging::set_use_syslog(false);
        logging::set_stream(LogStream::Stdout);
        logging::set_priority(Priority::Debug);

        let mut guard = ctl.lock();
        guard.use_syslog = false;
        guard.logprio = Priority::Debug.as_u8();
    }
}

/// Abandons the session and replaces the process image with the local
/// login program.
fn spawn_login(ctl: &Control, term: &Terminal) {
    // Tell the receive thread to wind down quietly, then hand the
    // terminal back in its startup state.
    ctl.request_exit();
    term.reset();

    let err = Command::new(LOGIN_PATH).arg0("login").exec();
    // exec only returns on failure.
    logging::log_error!("exec {LOGIN_PATH} failed: {err}");
}
