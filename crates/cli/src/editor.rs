//! Line-editor shim around rustyline.
//!
//! Three keys reach across the wire: TAB sends the buffer as a
//! COMPLETE request and replaces it with the server's COMPLETED
//! answer, `?` sends HELP and pauses until HELPED (with the pager
//! armed for the help text), and Ctrl-B opens the local escape menu.
//! The two waiting keys release the terminal gate for the duration of
//! their wait so the receive side can render output, then take it
//! back before redrawing.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{
    Cmd, ConditionalEventHandler, Context, Editor, Event, EventContext, EventHandler, Helper,
    Highlighter, Hinter, KeyEvent, RepeatCount, Validator,
};

use protocol::Message;

use crate::control::ControlBlock;
use crate::emenu;
use crate::error::ClientError;
use crate::session::Shared;
use crate::term::Role;

/// Cadence of the flag polls inside the completion/help waits.
const FLAG_POLL: Duration = Duration::from_millis(50);

pub(crate) struct LineEditor {
    rl: Editor<EditorHelper, DefaultHistory>,
    shared: Arc<Shared>,
    last_line: Option<String>,
}

impl LineEditor {
    pub fn new(shared: Arc<Shared>) -> Result<Self, ClientError> {
        let mut rl: Editor<EditorHelper, DefaultHistory> =
            Editor::new().map_err(editor_error)?;

        rl.set_helper(Some(EditorHelper {
            shared: Arc::clone(&shared),
        }));
        rl.bind_sequence(
            KeyEvent::from('?'),
            EventHandler::Conditional(Box::new(HelpKey {
                shared: Arc::clone(&shared),
            })),
        );
        rl.bind_sequence(
            KeyEvent::ctrl('b'),
            EventHandler::Conditional(Box::new(MenuKey {
                shared: Arc::clone(&shared),
            })),
        );

        Ok(Self {
            rl,
            shared,
            last_line: None,
        })
    }

    /// Blocks for one non-empty line. `Ok(None)` means end of input:
    /// Ctrl-D, a closed terminal, or session teardown noticed
    /// mid-edit.
    ///
    /// A line identical to the previous one is not recorded in
    /// history; Ctrl-C during editing is swallowed, matching the
    /// ignored-SIGINT window the original line readers kept.
    pub fn getln(&mut self, prompt: &str) -> Result<Option<String>, ClientError> {
        loop {
            match self.rl.readline(prompt) {
                Ok(line) => {
                    if line.is_empty() {
                        continue;
                    }
                    if self.last_line.as_deref() != Some(line.as_str()) {
                        let _ = self.rl.add_history_entry(line.as_str());
                        self.last_line = Some(line.clone());
                    }
                    return Ok(Some(line));
                }
                Err(ReadlineError::Interrupted) => {
                    if self.shared.ctl.exit_requested() {
                        return Ok(None);
                    }
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(err) => return Err(editor_error(err)),
            }
        }
    }
}

fn editor_error(err: ReadlineError) -> ClientError {
    ClientError::Editor(err.to_string())
}

#[derive(Helper, Highlighter, Hinter, Validator)]
struct EditorHelper {
    shared: Arc<Shared>,
}

impl Completer for EditorHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        match complete_round_trip(&self.shared, line) {
            Some(replacement) => Ok((0, vec![replacement])),
            // The wait ended because the session is tearing down.
            None => Err(ReadlineError::Io(std::io::Error::other(
                "session ended during completion",
            ))),
        }
    }
}

/// COMPLETE/COMPLETED: returns the replacement buffer, or `None` when
/// the session is tearing down.
fn complete_round_trip(shared: &Shared, partial: &str) -> Option<String> {
    let display_before = shared.ctl.lock().display;

    if shared.send(&Message::complete(partial)).is_err() {
        return None;
    }

    shared.term.save(Role::Tx);
    shared.term.release();
    let completed = wait_for(shared, |guard| {
        if guard.completed {
            guard.completed = false;
            Some(String::from_utf8_lossy(&guard.completed_str).into_owned())
        } else {
            None
        }
    });
    shared.term.acquire();
    shared.term.restore(Role::Tx);

    let completed = completed?;

    // Server output landed while we waited; step off that line before
    // the editor redraws the prompt over it.
    if shared.ctl.lock().display != display_before {
        println!();
    }

    Some(completed)
}

struct HelpKey {
    shared: Arc<Shared>,
}

impl ConditionalEventHandler for HelpKey {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        let partial = ctx.line().to_owned();
        let shared = &self.shared;

        let display_before = {
            let mut guard = shared.ctl.lock();
            guard.prompt = false;
            guard.display
        };

        // Help output must not start on the edit line.
        println!();

        if shared.send(&Message::help(&partial)).is_err() {
            return Some(Cmd::Interrupt);
        }

        shared.term.save(Role::Tx);
        {
            shared.ctl.lock().usepager = true;
        }
        shared.term.release();

        let helped = wait_for(shared, |guard| {
            if guard.helped {
                guard.helped = false;
                Some(())
            } else {
                None
            }
        });

        shared.term.acquire();
        shared.term.restore(Role::Tx);
        shared.ctl.lock().usepager = false;

        if helped.is_none() {
            return Some(Cmd::Interrupt);
        }

        if shared.ctl.lock().display != display_before {
            println!();
        }
        Some(Cmd::Repaint)
    }
}

struct MenuKey {
    shared: Arc<Shared>,
}

impl ConditionalEventHandler for MenuKey {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        _ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        println!();
        self.shared.term.save(Role::Tx);
        emenu::run(&self.shared.ctl, &self.shared.term);
        self.shared.term.restore(Role::Tx);
        println!();
        Some(Cmd::Repaint)
    }
}

/// Polls the control block until `check` yields, or until the exit
/// flag rises (`None`). The caller has released the terminal gate, so
/// the receive side is free to render while we sleep.
fn wait_for<T>(
    shared: &Shared,
    mut check: impl FnMut(&mut ControlBlock) -> Option<T>,
) -> Option<T> {
    loop {
        {
            let mut guard = shared.ctl.lock();
            if guard.exit {
                return None;
            }
            if let Some(found) = check(&mut guard) {
                return Some(found);
            }
        }
        thread::sleep(FLAG_POLL);
    }
}
