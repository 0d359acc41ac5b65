use super::*;

#[test]
fn ask_carries_prompt_and_default_fields() {
    let msg = Message::ask(AskOptions::NOECHO, "Password: ", "");
    assert_eq!(msg.code(), Some(MessageCode::Ask));
    assert_eq!(msg.options(), AskOptions::NOECHO.bits());
    assert_eq!(msg.payload(), b"Password: \r\n\r\n");
}

#[test]
fn empty_kinds_have_no_payload() {
    for msg in [Message::busy(), Message::helped(), Message::interrupt(), Message::suspend()] {
        assert_eq!(msg.payload_len(), 0);
        assert_eq!(msg.options(), 0);
    }
}

#[test]
fn command_appends_one_terminated_field() {
    let msg = Message::command("show");
    assert_eq!(msg.code(), Some(MessageCode::Command));
    assert_eq!(msg.payload(), b"show\r\n");
    assert_eq!(msg.payload_len(), 6);
}

#[test]
fn display_carries_raw_bytes_without_terminator() {
    let msg = Message::display("\r\n\r\nUser Access Verification\r\n\r\n");
    assert_eq!(msg.payload(), b"\r\n\r\nUser Access Verification\r\n\r\n");
}

#[test]
fn swinsz_formats_four_decimal_fields() {
    let msg = Message::swinsz(30, 85, 0, 0);
    assert_eq!(msg.payload(), b"30\r\n85\r\n0\r\n0\r\n");
}

#[test]
fn wait_with_status_carries_the_exit_code() {
    let msg = Message::wait(WaitOptions::STATUS, 0);
    assert_eq!(msg.options(), WaitOptions::STATUS.bits());
    assert_eq!(msg.payload(), b"0\r\n");
}

#[test]
fn wait_without_status_is_empty() {
    let signal = Message::wait(WaitOptions::SIGNAL, 9);
    assert_eq!(signal.payload_len(), 0);

    let error = Message::wait(WaitOptions::ERROR, 0);
    assert_eq!(error.payload_len(), 0);
}

#[test]
fn payload_trimmed_strips_exactly_one_separator() {
    let msg = Message::completed("busy");
    assert_eq!(msg.payload_trimmed(), b"busy");

    let display = Message::display("no terminator");
    assert_eq!(display.payload_trimmed(), b"no terminator");
}

#[test]
fn with_payload_accepts_the_maximum_payload() {
    let payload = vec![b'x'; MAX_PAYLOAD];
    let msg = Message::with_payload(MessageCode::Display, 0, payload)
        .expect("payload at the bound is accepted");
    assert_eq!(msg.payload_len(), MAX_PAYLOAD);
}

#[test]
fn with_payload_refuses_oversize_payloads() {
    let payload = vec![b'x'; MAX_PAYLOAD + 1];
    let err = Message::with_payload(MessageCode::Display, 0, payload)
        .expect_err("payload above the bound must fail");
    assert_eq!(
        err,
        crate::ProtocolError::PayloadTooLarge {
            length: MAX_PAYLOAD + 1
        }
    );
}

#[test]
fn formatting_constructors_clamp_at_the_bound() {
    let long = "y".repeat(MAX_PAYLOAD * 2);
    let msg = Message::display(long.as_bytes());
    assert_eq!(msg.payload_len(), MAX_PAYLOAD);

    let cmd = Message::command(&long);
    assert_eq!(cmd.payload_len(), MAX_PAYLOAD);
}
