//! One client conversation.

use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use protocol::{Message, MessageCode};
use transport::TransportError;

use crate::commands::{self, Outcome};

const GREETING: &str = "\r\n\r\nUser Access Verification\r\n\r\n";
const PROMPT: &str = "cli> ";

pub(crate) struct Session {
    stream: TcpStream,
}

impl Session {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Runs the conversation until the client leaves.
    ///
    /// The opening sequence is greeting DISPLAY, BUSY while the
    /// fictional access check "runs", then the first PROMPT; after
    /// that every consumed COMMAND is answered and re-prompted.
    pub fn serve(mut self) -> Result<(), TransportError> {
        self.send(&Message::display(GREETING))?;
        self.send(&Message::busy())?;
        thread::sleep(Duration::from_secs(1));
        self.prompt()?;

        loop {
            let msg = transport::recv_message(&mut self.stream)?;
            protocol::dump::dump(&msg);

            match msg.code() {
                Some(MessageCode::Command) => {
                    if !self.command(&msg)? {
                        return Ok(());
                    }
                }
                Some(MessageCode::Complete) => self.complete(&msg)?,
                Some(MessageCode::Help) => self.help()?,
                Some(MessageCode::Interrupt) => {
                    logging::log_notice!("ignoring INTERRUPT");
                }
                Some(MessageCode::Suspend) => {
                    logging::log_notice!("ignoring SUSPEND");
                }
                Some(MessageCode::Tell) => {
                    logging::log_notice!(
                        "client answered: {:?}",
                        String::from_utf8_lossy(msg.payload_trimmed())
                    );
                }
                Some(MessageCode::Wait) => log_wait(&msg),
                _ => {
                    logging::log_notice!("unknown message type={}", msg.raw_code());
                }
            }
        }
    }

    /// Handles one COMMAND. Returns `false` when the client asked to
    /// quit and the connection should close.
    fn command(&mut self, msg: &Message) -> Result<bool, TransportError> {
        let line = String::from_utf8_lossy(msg.payload_trimmed()).into_owned();
        let words: Vec<&str> = line.split_whitespace().collect();

        if let Some((name, args)) = words.split_first() {
            match commands::find(name) {
                Some(spec) => {
                    if (spec.handler)(self, args)? == Outcome::Quit {
                        return Ok(false);
                    }
                }
                None => {
                    self.send(&Message::display(format!("% unknown command: {line}\n")))?;
                }
            }
        }

        self.prompt()?;
        Ok(true)
    }

    /// Answers COMPLETE with the unique table entry the partial line
    /// prefixes. An ambiguous partial comes back unchanged; a bare
    /// request keeps the historical demo reply.
    fn complete(&mut self, msg: &Message) -> Result<(), TransportError> {
        let partial = String::from_utf8_lossy(msg.payload_trimmed()).into_owned();
        let partial = partial.trim();
        let completion = if partial.is_empty() {
            "busy"
        } else {
            commands::complete(partial).unwrap_or(partial)
        };
        self.send(&Message::completed(completion))
    }

    /// Answers HELP with the command table, one DISPLAY per row, then
    /// HELPED.
    fn help(&mut self) -> Result<(), TransportError> {
        self.send(&Message::display("\n\n"))?;
        for spec in commands::COMMANDS {
            let row = format!(" {:<10}\t{:<40}\n", spec.name, spec.help);
            self.send(&Message::display(row))?;
        }
        self.send(&Message::helped())
    }

    pub(crate) fn prompt(&mut self) -> Result<(), TransportError> {
        self.send(&Message::prompt(PROMPT))
    }

    pub(crate) fn send(&mut self, msg: &Message) -> Result<(), TransportError> {
        transport::send_message(&mut self.stream, msg)
    }
}

fn log_wait(msg: &Message) {
    let options = msg.wait_options();
    let status = msg
        .fields()
        .next_str()
        .map_or_else(|| "n/a".to_owned(), ToOwned::to_owned);
    logging::log_notice!(
        "exec result: signal={} error={} status={}",
        options.contains(protocol::WaitOptions::SIGNAL),
        options.contains(protocol::WaitOptions::ERROR),
        if options.contains(protocol::WaitOptions::STATUS) {
            status.as_str()
        } else {
            "n/a"
        }
    );
}
