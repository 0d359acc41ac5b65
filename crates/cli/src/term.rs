//! Terminal ownership and attribute discipline.
//!
//! The terminal is shared between the receive side (DISPLAY output and
//! the pager) and the transmit side (prompts and user input). The
//! [`Terminal::acquire`]/[`Terminal::release`] gate makes ownership
//! explicit; whoever mutates attributes first saves into its
//! role-specific snapshot and restores it before handing the terminal
//! back. A third snapshot, the baseline captured at startup with
//! canonical mode cleared, serves process-wide reset at exit and for
//! the escape menu's login takeover.
//!
//! Attribute failures are logged and survived: a session on a degraded
//! terminal beats an abort, and the baseline restore at exit is the
//! backstop.

use std::io::{self, Read, Write};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use protocol::AskOptions;
use rustix::termios::{self, LocalModes, OptionalActions, Termios, Winsize};

/// Which side currently owns a snapshot slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Role {
    /// The transmit side (prompting, spinner, question input).
    Tx,
    /// The receive side (pager sessions).
    Rx,
}

/// Binary semaphore guarding the terminal.
///
/// A plain `MutexGuard` cannot express this protocol: the editor
/// callbacks release the terminal mid-`readline` so the receive side
/// can render DISPLAY output, then take it back. Lock and unlock are
/// therefore explicit operations.
#[derive(Debug, Default)]
struct Gate {
    locked: Mutex<bool>,
    turn: Condvar,
}

impl Gate {
    fn lock(&self) {
        let mut locked = self.guard();
        while *locked {
            locked = self
                .turn
                .wait(locked)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *locked = true;
    }

    fn unlock(&self) {
        *self.guard() = false;
        self.turn.notify_one();
    }

    fn guard(&self) -> MutexGuard<'_, bool> {
        self.locked.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Debug)]
struct Snapshot {
    stdin: Termios,
    stdout: Termios,
    stderr: Termios,
}

impl Snapshot {
    fn capture() -> io::Result<Self> {
        Ok(Self {
            stdin: termios::tcgetattr(io::stdin())?,
            stdout: termios::tcgetattr(io::stdout())?,
            stderr: termios::tcgetattr(io::stderr())?,
        })
    }

    fn apply(&self) -> io::Result<()> {
        termios::tcsetattr(io::stdin(), OptionalActions::Drain, &self.stdin)?;
        termios::tcsetattr(io::stdout(), OptionalActions::Drain, &self.stdout)?;
        termios::tcsetattr(io::stderr(), OptionalActions::Drain, &self.stderr)?;
        Ok(())
    }
}

/// The terminal gate plus the three named snapshot slots.
#[derive(Debug, Default)]
pub(crate) struct Terminal {
    gate: Gate,
    baseline: Mutex<Option<Snapshot>>,
    tx_saved: Mutex<Option<Snapshot>>,
    rx_saved: Mutex<Option<Snapshot>>,
}

impl Terminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the inherited terminal state, clears canonical mode in
    /// the captured copy, and applies it. The captured copy becomes
    /// the baseline every later reset returns to.
    pub fn setup(&self) -> io::Result<()> {
        let mut snapshot = Snapshot::capture()?;
        snapshot.stdin.local_modes.remove(LocalModes::ICANON);
        snapshot.stdout.local_modes.remove(LocalModes::ICANON);
        snapshot.stderr.local_modes.remove(LocalModes::ICANON);
        snapshot.apply()?;
        *self.slot(None) = Some(snapshot);
        Ok(())
    }

    /// Takes terminal ownership, blocking until the other side is done.
    pub fn acquire(&self) {
        self.gate.lock();
    }

    /// Hands terminal ownership back.
    pub fn release(&self) {
        self.gate.unlock();
    }

    /// Saves the current attributes into a role slot.
    pub fn save(&self, role: Role) {
        match Snapshot::capture() {
            Ok(snapshot) => *self.slot(Some(role)) = Some(snapshot),
            Err(err) => logging::log_warning!("terminal save failed: {err}"),
        }
    }

    /// Restores a role slot saved earlier. A missing or failing
    /// restore is logged, not fatal.
    pub fn restore(&self, role: Role) {
        let snapshot = self.slot(Some(role)).clone();
        match snapshot {
            Some(snapshot) => {
                if let Err(err) = snapshot.apply() {
                    logging::log_warning!("terminal restore failed: {err}");
                }
            }
            None => logging::log_warning!("terminal restore without a saved state"),
        }
    }

    /// Restores the startup baseline.
    pub fn reset(&self) {
        let snapshot = self.slot(None).clone();
        if let Some(snapshot) = snapshot {
            if let Err(err) = snapshot.apply() {
                logging::log_warning!("terminal reset failed: {err}");
            }
        }
    }

    /// Puts stdin into non-canonical mode, optionally without echo.
    /// The caller has saved its role snapshot and restores it after.
    pub fn raw_input(&self, disable_echo: bool) {
        let result = termios::tcgetattr(io::stdin()).and_then(|mut t| {
            t.local_modes.remove(LocalModes::ICANON);
            if disable_echo {
                t.local_modes.remove(LocalModes::ECHO);
            }
            termios::tcsetattr(io::stdin(), OptionalActions::Now, &t)
        });
        if let Err(err) = result {
            logging::log_warning!("raw input mode failed: {err}");
        }
    }

    /// Applies a server-suggested window size to stdout.
    pub fn set_winsize(&self, rows: u16, cols: u16, xpixel: u16, ypixel: u16) {
        let size = Winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: xpixel,
            ws_ypixel: ypixel,
        };
        if let Err(err) = termios::tcsetwinsize(io::stdout(), size) {
            logging::log_debug!("window size update failed: {err}");
        }
    }

    /// Current stdout window size, if the terminal reports one.
    pub fn winsize(&self) -> Option<(u16, u16)> {
        termios::tcgetwinsize(io::stdout())
            .ok()
            .map(|size| (size.ws_row, size.ws_col))
    }

    fn slot(&self, role: Option<Role>) -> MutexGuard<'_, Option<Snapshot>> {
        let slot = match role {
            None => &self.baseline,
            Some(Role::Tx) => &self.tx_saved,
            Some(Role::Rx) => &self.rx_saved,
        };
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;

/// Reads one reply line under the ASK discipline.
///
/// The terminal is already in non-canonical mode with echo arranged by
/// the caller. Bytes are consumed until CR, LF, end of file, or a full
/// buffer (`max` of 1 in single-character mode). Backspace and delete
/// shorten the buffer; under FEEDBACK they also wipe one echoed star,
/// and every accepted character echoes a star. Only printable
/// characters are accepted. A newline is emitted when nothing else
/// will have moved the cursor: echo off, feedback, or a filled
/// single-character read.
pub(crate) fn read_reply<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    options: AskOptions,
    max: usize,
) -> io::Result<String> {
    let feedback = options.contains(AskOptions::FEEDBACK);
    let mut buf = String::new();

    while buf.len() < max {
        let mut byte = [0u8; 1];
        match input.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
        let ch = byte[0];

        if ch == BACKSPACE || ch == DELETE {
            if buf.pop().is_some() && feedback {
                output.write_all(b"\x08 \x08")?;
                output.flush()?;
            }
            continue;
        }

        if ch == b'\n' || ch == b'\r' {
            break;
        }

        if (0x20..0x7f).contains(&ch) {
            buf.push(char::from(ch));
            if feedback {
                output.write_all(b"*")?;
                output.flush()?;
            }
        }
    }

    let char_mode_filled = options.contains(AskOptions::CHAR) && buf.len() == max;
    if options.contains(AskOptions::NOECHO) || feedback || char_mode_filled {
        output.write_all(b"\n")?;
        output.flush()?;
    }

    Ok(buf)
}
