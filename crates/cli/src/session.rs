//! Session assembly: shared state, signal latches, thread spawn, and
//! teardown.

use std::net::TcpStream;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use protocol::Message;

use crate::control::Control;
use crate::error::ClientError;
use crate::options::Invocation;
use crate::term::Terminal;
use crate::{emenu, rx, tx};

/// Everything both threads (and the editor callbacks) share.
pub(crate) struct Shared {
    /// The control block and its wakeup condvar.
    pub ctl: Control,
    /// Terminal gate and attribute snapshots.
    pub term: Terminal,
    /// SIGINT (or pager quit) latch; consumed only by the transmit
    /// loop.
    pub interrupt: Arc<AtomicBool>,
    /// SIGTSTP latch, armed only for login shells.
    pub suspend: Arc<AtomicBool>,
    /// Transmit-side socket handle. The receive thread reads its own
    /// clone; nothing ever writes there.
    writer: Mutex<TcpStream>,
}

impl Shared {
    /// Sends one frame to the server. A send failure is fatal: the
    /// exit flag is raised before the error propagates.
    pub fn send(&self, msg: &Message) -> Result<(), ClientError> {
        let mut sock = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        match transport::send_message(&mut *sock, msg) {
            Ok(()) => Ok(()),
            Err(err) => {
                logging::log_error!("send failed: {err}");
                self.ctl.request_exit();
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
impl Shared {
    /// Assembles a `Shared` around an arbitrary socket for dispatch
    /// tests.
    pub(crate) fn test_fixture(ctl: Control, term: Terminal, writer: Mutex<TcpStream>) -> Self {
        Self {
            ctl,
            term,
            interrupt: Arc::new(AtomicBool::new(false)),
            suspend: Arc::new(AtomicBool::new(false)),
            writer,
        }
    }
}

/// Runs one connected session to completion.
pub(crate) fn run(invocation: &Invocation) -> Result<(), ClientError> {
    let ctl = Control::new();
    let term = Terminal::new();
    term.setup()?;

    // We are normally the session leader already; a failure here
    // changes nothing.
    let _ = rustix::process::setsid();

    let stream = match transport::connect(invocation.host.as_deref(), invocation.service.as_deref())
    {
        Ok(stream) => stream,
        Err(err) => {
            logging::log_notice!("connect failed: {err}");
            emenu::run(&ctl, &term);
            term.reset();
            return Err(err.into());
        }
    };
    let writer = stream.try_clone().map_err(ClientError::Io)?;

    let interrupt = Arc::new(AtomicBool::new(false));
    let suspend = Arc::new(AtomicBool::new(false));
    let hangup = Arc::new(AtomicBool::new(false));

    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupt))?;
    // Latching into a flag nobody reads is this program's SIG_IGN:
    // sshd delivers HUPs we must survive.
    signal_hook::flag::register(signal_hook::consts::SIGHUP, hangup)?;
    if invocation.login_shell {
        signal_hook::flag::register(signal_hook::consts::SIGTSTP, Arc::clone(&suspend))?;
    }

    let shared = Arc::new(Shared {
        ctl,
        term,
        interrupt,
        suspend,
        writer: Mutex::new(writer),
    });

    let rx_handle = {
        let shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("ucrp-rx".into())
            .spawn(move || rx::Receiver::new(shared).run(stream))
            .map_err(ClientError::Io)?
    };

    let result = tx::Transmitter::new(Arc::clone(&shared), rx_handle)
        .and_then(tx::Transmitter::run);

    shared.ctl.request_exit();
    shared.term.reset();
    result
}
