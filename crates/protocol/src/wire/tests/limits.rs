use super::*;

#[test]
fn payload_at_the_bound_decodes() {
    let msg = Message::with_payload(MessageCode::Display, 0, vec![b'.'; MAX_PAYLOAD])
        .expect("bound payload constructs");
    let decoded = Message::decode(&mut Cursor::new(msg.encode()))
        .expect("bound payload decodes")
        .expect("a full frame is present");
    assert_eq!(decoded.payload_len(), MAX_PAYLOAD);
}

#[test]
fn oversized_declared_length_is_rejected_before_the_payload() {
    let header = Header {
        code: MessageCode::Display.as_u16(),
        options: 0,
        length: (MAX_PAYLOAD + 1) as u16,
    };
    // No payload bytes follow; the declared length alone must fail.
    let err = Message::decode(&mut Cursor::new(header.encode().to_vec()))
        .expect_err("oversized header must fail");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn header_decode_reports_the_declared_length() {
    let header = Header {
        code: 103,
        options: 0,
        length: u16::MAX,
    };
    let err = Header::decode(header.encode()).expect_err("u16::MAX exceeds the bound");
    assert_eq!(err, ProtocolError::OversizedHeader { length: u16::MAX });
}

#[test]
fn frame_size_stays_within_the_message_buffer() {
    let msg = Message::with_payload(MessageCode::Display, 0, vec![0u8; MAX_PAYLOAD])
        .expect("bound payload constructs");
    // Encoded frame plus a NUL terminator fits the historical buffer.
    assert!(msg.encode().len() + 1 <= MAX_MSGSIZE);
}
