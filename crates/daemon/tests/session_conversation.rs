//! End-to-end conversation against the demonstration server over a
//! real socket: the greeting sequence, a command round trip,
//! completion, help, a window-size push, and the quit path.

use std::net::{TcpListener, TcpStream};
use std::thread;

use protocol::{Message, MessageCode};
use transport::{TransportError, recv_message, send_message};

struct Client {
    stream: TcpStream,
    server: Option<thread::JoinHandle<Result<(), TransportError>>>,
}

fn connect() -> Client {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind an ephemeral port");
    let addr = listener.local_addr().expect("listener address");

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        daemon::serve_connection(stream)
    });

    Client {
        stream: TcpStream::connect(addr).expect("connect"),
        server: Some(server),
    }
}

impl Client {
    fn recv(&mut self) -> Message {
        recv_message(&mut self.stream).expect("server frame")
    }

    fn send(&mut self, msg: &Message) {
        send_message(&mut self.stream, msg).expect("client frame");
    }

    /// Skips DISPLAY frames until something else arrives.
    fn recv_skipping_display(&mut self) -> Message {
        loop {
            let msg = self.recv();
            if msg.code() != Some(MessageCode::Display) {
                return msg;
            }
        }
    }
}

#[test]
fn greeting_sequence_is_display_busy_prompt() {
    let mut client = connect();

    let greeting = client.recv();
    assert_eq!(greeting.code(), Some(MessageCode::Display));
    assert_eq!(
        greeting.payload(),
        b"\r\n\r\nUser Access Verification\r\n\r\n"
    );

    let busy = client.recv();
    assert_eq!(busy.code(), Some(MessageCode::Busy));
    assert_eq!(busy.payload_len(), 0);

    let prompt = client.recv();
    assert_eq!(prompt.code(), Some(MessageCode::Prompt));
    assert_eq!(prompt.payload(), b"cli> \r\n");
}

#[test]
fn commands_are_answered_and_reprompted() {
    let mut client = connect();
    // Greeting, busy, prompt.
    client.recv();
    client.recv();
    client.recv();

    client.send(&Message::command("show"));
    let version = client.recv();
    assert_eq!(version.code(), Some(MessageCode::Display));
    assert_eq!(version.payload(), b"Version ?.?\n");

    let prompt = client.recv();
    assert_eq!(prompt.code(), Some(MessageCode::Prompt));
}

#[test]
fn unknown_commands_get_a_diagnostic_and_a_prompt() {
    let mut client = connect();
    client.recv();
    client.recv();
    client.recv();

    client.send(&Message::command("frobnicate now"));
    let diagnostic = client.recv();
    assert_eq!(diagnostic.code(), Some(MessageCode::Display));
    assert!(
        diagnostic.payload().starts_with(b"% unknown command"),
        "got {:?}",
        String::from_utf8_lossy(diagnostic.payload())
    );
    assert_eq!(client.recv().code(), Some(MessageCode::Prompt));
}

#[test]
fn completion_round_trip_matches_the_table() {
    let mut client = connect();
    client.recv();
    client.recv();
    client.recv();

    client.send(&Message::complete("bu"));
    let completed = client.recv();
    assert_eq!(completed.code(), Some(MessageCode::Completed));
    assert_eq!(completed.payload(), b"busy\r\n");

    // Ambiguous prefixes come back unchanged.
    client.send(&Message::complete("ask"));
    let echoed = client.recv();
    assert_eq!(echoed.payload(), b"ask\r\n");

    // A bare request gets the fixed demo reply.
    client.send(&Message::complete(""));
    let fallback = client.recv();
    assert_eq!(fallback.code(), Some(MessageCode::Completed));
    assert_eq!(fallback.payload(), b"busy\r\n");
}

#[test]
fn help_lists_the_table_and_acknowledges() {
    let mut client = connect();
    client.recv();
    client.recv();
    client.recv();

    client.send(&Message::help(""));
    let mut rows = Vec::new();
    let done = loop {
        let msg = client.recv();
        match msg.code() {
            Some(MessageCode::Display) => rows.push(String::from_utf8_lossy(msg.payload()).into_owned()),
            other => break other,
        }
    };

    assert_eq!(done, Some(MessageCode::Helped));
    let table = rows.concat();
    for name in ["askc", "busy", "pager", "quit", "term"] {
        assert!(table.contains(name), "help table must list {name}");
    }
}

#[test]
fn term_command_suggests_a_window_size() {
    let mut client = connect();
    client.recv();
    client.recv();
    client.recv();

    client.send(&Message::command("term"));
    let swinsz = client.recv_skipping_display();
    assert_eq!(swinsz.code(), Some(MessageCode::Swinsz));
    assert_eq!(swinsz.payload(), b"30\r\n85\r\n0\r\n0\r\n");
    assert_eq!(client.recv().code(), Some(MessageCode::Prompt));
}

#[test]
fn ask_commands_carry_the_right_options() {
    let mut client = connect();
    client.recv();
    client.recv();
    client.recv();

    client.send(&Message::command("askn"));
    let ask = client.recv();
    assert_eq!(ask.code(), Some(MessageCode::Ask));
    assert_eq!(ask.options(), 0x1, "askn asks without echo");
    let mut fields = ask.fields();
    assert_eq!(fields.next_str(), Some("Password: "));
    assert_eq!(fields.next_str(), Some(""));

    // The server re-prompts immediately; the client orders ask
    // handling ahead of prompt handling on its side.
    assert_eq!(client.recv().code(), Some(MessageCode::Prompt));
}

#[test]
fn quit_says_goodbye_and_closes() {
    let mut client = connect();
    client.recv();
    client.recv();
    client.recv();

    client.send(&Message::command("quit"));
    let goodbye = client.recv();
    assert_eq!(goodbye.code(), Some(MessageCode::Display));
    assert_eq!(goodbye.payload(), b"goodbye...\n");

    let err = recv_message(&mut client.stream).expect_err("connection must close");
    assert!(err.is_closed(), "got {err:?}");

    let outcome = client
        .server
        .take()
        .expect("server handle")
        .join()
        .expect("server thread");
    assert!(outcome.is_ok(), "quit is a clean end: {outcome:?}");
}
