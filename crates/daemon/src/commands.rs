//! The demonstration command table.
//!
//! Each entry exercises one corner of the protocol from the server
//! side; together they cover every message kind a client handles.

use std::thread;
use std::time::Duration;

use protocol::{AskOptions, Message};
use transport::TransportError;

use crate::session::Session;

/// What the session loop should do after a handler runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Keep serving; a fresh prompt follows.
    Continue,
    /// Close the connection.
    Quit,
}

pub(crate) type Handler = fn(&mut Session, &[&str]) -> Result<Outcome, TransportError>;

pub(crate) struct CommandSpec {
    pub name: &'static str,
    pub help: &'static str,
    pub handler: Handler,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "askc",
        help: "ask [char    ]",
        handler: askc,
    },
    CommandSpec {
        name: "aske",
        help: "ask [echo    ]",
        handler: aske,
    },
    CommandSpec {
        name: "askf",
        help: "ask [feedback]",
        handler: askf,
    },
    CommandSpec {
        name: "askn",
        help: "ask [no echo ]",
        handler: askn,
    },
    CommandSpec {
        name: "busy",
        help: "get busy",
        handler: busy,
    },
    CommandSpec {
        name: "exec",
        help: "exec local process",
        handler: exec,
    },
    CommandSpec {
        name: "ftp",
        help: "ftp dummy messages",
        handler: ftp,
    },
    CommandSpec {
        name: "pager",
        help: "show lots of lines",
        handler: pager,
    },
    CommandSpec {
        name: "show",
        help: "show something",
        handler: show,
    },
    CommandSpec {
        name: "term",
        help: "set terminal size",
        handler: term,
    },
    CommandSpec {
        name: "quit",
        help: "exit out of here",
        handler: quit,
    },
];

/// Exact-name lookup.
pub(crate) fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// The unique command the partial line prefixes, if any.
pub(crate) fn complete(partial: &str) -> Option<&'static str> {
    if partial.is_empty() {
        return None;
    }
    let mut matches = COMMANDS.iter().filter(|spec| spec.name.starts_with(partial));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.name),
        _ => None,
    }
}

fn askc(session: &mut Session, _args: &[&str]) -> Result<Outcome, TransportError> {
    session.send(&Message::ask(
        AskOptions::CHAR,
        "Hack the planet? [Y/n]: ",
        "Y",
    ))?;
    Ok(Outcome::Continue)
}

fn aske(session: &mut Session, _args: &[&str]) -> Result<Outcome, TransportError> {
    session.send(&Message::ask(
        AskOptions::empty(),
        "Hack the planet? [Y/n]: ",
        "Y",
    ))?;
    Ok(Outcome::Continue)
}

fn askf(session: &mut Session, _args: &[&str]) -> Result<Outcome, TransportError> {
    session.send(&Message::ask(AskOptions::FEEDBACK, "Password: ", ""))?;
    Ok(Outcome::Continue)
}

fn askn(session: &mut Session, _args: &[&str]) -> Result<Outcome, TransportError> {
    session.send(&Message::ask(AskOptions::NOECHO, "Password: ", ""))?;
    Ok(Outcome::Continue)
}

fn busy(session: &mut Session, _args: &[&str]) -> Result<Outcome, TransportError> {
    session.send(&Message::busy())?;
    thread::sleep(Duration::from_secs(5));
    Ok(Outcome::Continue)
}

fn exec(session: &mut Session, args: &[&str]) -> Result<Outcome, TransportError> {
    if args.is_empty() {
        session.send(&Message::display("% usage: exec <command>\n"))?;
        return Ok(Outcome::Continue);
    }
    session.send(&Message::exec(&args.join(" ")))?;
    Ok(Outcome::Continue)
}

fn ftp(session: &mut Session, _args: &[&str]) -> Result<Outcome, TransportError> {
    let steps = [
        "Using FTP to locate remote file...\n",
        "Preparing local system for download..\n",
        "Downloading image file..\n",
    ];
    for step in steps {
        session.send(&Message::display(step))?;
        thread::sleep(Duration::from_secs(1));
    }

    for _ in 0..300 {
        session.send(&Message::display("#"))?;
        thread::sleep(Duration::from_millis(5));
    }
    session.send(&Message::display("[OK]\n"))?;
    thread::sleep(Duration::from_secs(1));

    session.send(&Message::display("Verifying downloaded image file...\n"))?;
    Ok(Outcome::Continue)
}

fn pager(session: &mut Session, _args: &[&str]) -> Result<Outcome, TransportError> {
    for i in 0..1000 {
        session.send(&Message::display(format!("{i:<10} ooga booga\n")))?;
        session.send(&Message::display(format!(
            "{i:<10} {}\n",
            "wowy zowy ".repeat(16)
        )))?;
    }
    Ok(Outcome::Continue)
}

fn show(session: &mut Session, args: &[&str]) -> Result<Outcome, TransportError> {
    match args.first().copied() {
        None => session.send(&Message::display("Version ?.?\n"))?,
        Some("version") => {
            let line = format!("ucrpd {}\n", env!("CARGO_PKG_VERSION"));
            session.send(&Message::display(line))?;
        }
        Some("time") => {
            let now = time::OffsetDateTime::now_local()
                .unwrap_or_else(|_| time::OffsetDateTime::now_utc());
            let text = now
                .format(&time::format_description::well_known::Rfc2822)
                .unwrap_or_else(|_| "time unavailable".to_owned());
            session.send(&Message::display(format!("{text}\n")))?;
        }
        Some(other) => {
            session.send(&Message::display(format!("% unknown argument: {other}\n")))?;
        }
    }
    Ok(Outcome::Continue)
}

fn term(session: &mut Session, _args: &[&str]) -> Result<Outcome, TransportError> {
    session.send(&Message::swinsz(30, 85, 0, 0))?;
    Ok(Outcome::Continue)
}

fn quit(session: &mut Session, _args: &[&str]) -> Result<Outcome, TransportError> {
    session.send(&Message::display("goodbye...\n"))?;
    Ok(Outcome::Quit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_is_found_by_exact_name() {
        for spec in COMMANDS {
            assert!(find(spec.name).is_some(), "{} must resolve", spec.name);
        }
        assert!(find("nope").is_none());
        assert!(find("").is_none());
    }

    #[test]
    fn unique_prefixes_complete() {
        assert_eq!(complete("bu"), Some("busy"));
        assert_eq!(complete("p"), Some("pager"));
        assert_eq!(complete("q"), Some("quit"));
        assert_eq!(complete("sh"), Some("show"));
    }

    #[test]
    fn ambiguous_or_unknown_prefixes_do_not_complete() {
        assert_eq!(complete("ask"), None, "four commands share this prefix");
        assert_eq!(complete("a"), None);
        assert_eq!(complete("zz"), None);
        assert_eq!(complete(""), None);
    }

    #[test]
    fn exact_names_complete_to_themselves() {
        assert_eq!(complete("busy"), Some("busy"));
        assert_eq!(complete("quit"), Some("quit"));
    }
}
