//! The transmit engine: the user-facing state machine.
//!
//! One pass of the loop drains the signal latches, then takes the
//! first applicable action in priority order (busy spinner, question,
//! local exec, prompt) and finally honors the exit flag. With nothing
//! to do it parks on the control block's condvar for a short beat.

use std::io::{self, Write};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nix::sys::signal::{SigSet, SigmaskHow, Signal, pthread_sigmask};
use protocol::{AskOptions, MAX_PAYLOAD, Message, WaitOptions};

use crate::control::ControlBlock;
use crate::editor::LineEditor;
use crate::error::ClientError;
use crate::session::Shared;
use crate::term::{self, Role};

const IDLE_WAIT: Duration = Duration::from_millis(10);
const SPIN_INTERVAL: Duration = Duration::from_millis(100);
const SPIN_FRAMES: [&[u8; 2]; 4] = [b"\x08/", b"\x08-", b"\x08\\", b"\x08|"];

/// Prompt used when the server sends an empty PROMPT payload.
const FALLBACK_PROMPT: &str = "(?) ";

enum Action {
    Busy,
    Ask,
    Exec,
    Prompt,
    Exit,
    Idle,
}

pub(crate) struct Transmitter {
    shared: Arc<Shared>,
    editor: LineEditor,
    rx_handle: JoinHandle<()>,
}

impl Transmitter {
    pub fn new(shared: Arc<Shared>, rx_handle: JoinHandle<()>) -> Result<Self, ClientError> {
        let editor = LineEditor::new(Arc::clone(&shared))?;
        Ok(Self {
            shared,
            editor,
            rx_handle,
        })
    }

    /// Drives the state machine until the session ends.
    pub fn run(mut self) -> Result<(), ClientError> {
        loop {
            if self.shared.interrupt.swap(false, Ordering::SeqCst) {
                self.shared.send(&Message::interrupt())?;
            }
            if self.shared.suspend.swap(false, Ordering::SeqCst) {
                self.shared.send(&Message::suspend())?;
            }

            let action = {
                let guard = self.shared.ctl.lock();
                pick_action(&guard)
            };

            match action {
                Action::Busy => self.busy_spinner(),
                Action::Ask => self.handle_ask()?,
                Action::Exec => self.handle_exec()?,
                Action::Prompt => self.handle_prompt()?,
                Action::Exit => return Ok(()),
                Action::Idle => {
                    self.shared.ctl.wait_for_wake(IDLE_WAIT);
                    if self.rx_handle.is_finished() && !self.shared.ctl.exit_requested() {
                        // The receive thread died without raising exit:
                        // the peer check the two sides owe each other.
                        self.shared.ctl.request_exit();
                        return Err(ClientError::PeerGone);
                    }
                }
            }
        }
    }

    /// Animates `/ - \ |` in place until BUSY clears.
    fn busy_spinner(&self) {
        let term = &self.shared.term;
        term.acquire();
        term.save(Role::Tx);
        term.raw_input(true);

        let mut out = io::stdout();
        let mut frame = 0;
        loop {
            let (busy, exit) = {
                let guard = self.shared.ctl.lock();
                (guard.busy, guard.exit)
            };
            if !busy || exit {
                break;
            }

            let _ = out.write_all(SPIN_FRAMES[frame]).and_then(|()| out.flush());
            frame = (frame + 1) % SPIN_FRAMES.len();
            thread::sleep(SPIN_INTERVAL);
        }
        let _ = out.write_all(b"\x08").and_then(|()| out.flush());

        term.restore(Role::Tx);
        term.release();
    }

    /// ASK: print the question, collect the reply under the requested
    /// echo discipline, TELL the answer (or the default for an empty
    /// reply).
    fn handle_ask(&self) -> Result<(), ClientError> {
        let msg = {
            let mut guard = self.shared.ctl.lock();
            guard.ask = false;
            guard.ask_msg.take()
        };
        let Some(msg) = msg else {
            return Ok(());
        };

        let options = msg.ask_options();
        let mut fields = msg.fields();
        let question = fields.next_str().unwrap_or_default().to_owned();
        let default = fields.next_str().unwrap_or_default().to_owned();

        if !question.is_empty() {
            let mut out = io::stdout().lock();
            let _ = out.write_all(question.as_bytes()).and_then(|()| out.flush());
        }

        let term = &self.shared.term;
        term.acquire();
        term.save(Role::Tx);
        term.raw_input(options.intersects(AskOptions::NOECHO | AskOptions::FEEDBACK));

        let max = if options.contains(AskOptions::CHAR) {
            1
        } else {
            MAX_PAYLOAD
        };
        let answer = term::read_reply(
            &mut io::stdin().lock(),
            &mut io::stdout().lock(),
            options,
            max,
        );

        term.restore(Role::Tx);
        term.release();

        let answer = answer?;
        let reply = if answer.is_empty() { &default } else { &answer };
        self.shared.send(&Message::tell(reply))
    }

    /// EXEC: run the requested command through the local shell and
    /// report how it ended. SIGCHLD/SIGINT/SIGQUIT stay blocked on
    /// this thread while the child runs; anything latched meanwhile is
    /// delivered once the mask lifts and goes out on the next pass.
    fn handle_exec(&self) -> Result<(), ClientError> {
        let command = {
            let mut guard = self.shared.ctl.lock();
            guard.exec = false;
            guard.usepager = false;
            String::from_utf8_lossy(&guard.exec_str).into_owned()
        };

        let mut mask = SigSet::empty();
        mask.add(Signal::SIGCHLD);
        mask.add(Signal::SIGINT);
        mask.add(Signal::SIGQUIT);
        let mut previous = SigSet::empty();
        let masked =
            pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&mask), Some(&mut previous)).is_ok();

        let status = Command::new("/bin/sh")
            .arg("-c")
            .arg(format!("exec {command}"))
            .status();

        let reply = match status {
            Ok(status) => match status.code() {
                Some(code) => Message::wait(WaitOptions::STATUS, code),
                // No exit code on Unix means a signal ended it.
                None => Message::wait(WaitOptions::SIGNAL, 0),
            },
            Err(err) => {
                logging::log_notice!("local exec failed: {err}");
                Message::wait(WaitOptions::ERROR, 0)
            }
        };

        if masked {
            let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&previous), None);
        }

        // DISPLAY may flow again now, but paging stays off until the
        // next PROMPT round re-enables it.
        self.shared.send(&reply)
    }

    /// PROMPT: hand the terminal to the line editor and send the
    /// resulting COMMAND.
    fn handle_prompt(&mut self) -> Result<(), ClientError> {
        let prompt_bytes = {
            let mut guard = self.shared.ctl.lock();
            // Line-edit drawing must not route through the pager.
            guard.usepager = false;
            guard.prompt_str.clone()
        };
        let prompt = if prompt_bytes.is_empty() {
            FALLBACK_PROMPT.to_owned()
        } else {
            String::from_utf8_lossy(&prompt_bytes).into_owned()
        };

        self.shared.term.acquire();
        let line = self.editor.getln(&prompt);

        match line {
            Ok(Some(line)) => {
                {
                    let mut guard = self.shared.ctl.lock();
                    guard.usepager = true;
                    guard.prompt = false;
                }
                let sent = self.shared.send(&Message::command(&line));
                self.shared.term.release();
                sent
            }
            Ok(None) => {
                self.shared.term.release();
                if self.shared.ctl.exit_requested() {
                    // Teardown arrived mid-edit; the main loop will
                    // see the flag and finish cleanly.
                    Ok(())
                } else {
                    self.shared.ctl.request_exit();
                    Err(ClientError::EditorEof)
                }
            }
            Err(err) => {
                self.shared.term.release();
                self.shared.ctl.request_exit();
                Err(err)
            }
        }
    }
}

fn pick_action(guard: &ControlBlock) -> Action {
    if guard.busy {
        Action::Busy
    } else if guard.ask {
        Action::Ask
    } else if guard.exec {
        Action::Exec
    } else if guard.prompt {
        Action::Prompt
    } else if guard.exit {
        Action::Exit
    } else {
        Action::Idle
    }
}
