use super::*;

#[test]
fn codes_round_trip_through_from_u16() {
    for &code in MessageCode::all() {
        assert_eq!(MessageCode::from_u16(code.as_u16()), Some(code));
    }
}

#[test]
fn try_from_matches_from_u16() {
    for &code in MessageCode::all() {
        assert_eq!(MessageCode::try_from(code.as_u16()).ok(), Some(code));
    }
}

#[test]
fn unknown_codes_are_rejected() {
    assert_eq!(MessageCode::from_u16(0), None);
    assert_eq!(MessageCode::from_u16(99), None);
    assert_eq!(MessageCode::from_u16(108), None);
    assert_eq!(MessageCode::from_u16(207), None);
    assert_eq!(MessageCode::try_from(65535), Err(65535));
}

#[test]
fn direction_split_is_at_the_200_boundary() {
    assert!(MessageCode::Ask.is_server_to_client());
    assert!(MessageCode::Exec.is_server_to_client());
    assert!(!MessageCode::Command.is_server_to_client());
    assert!(!MessageCode::Wait.is_server_to_client());
}

#[test]
fn names_match_the_wire_documentation() {
    assert_eq!(MessageCode::Ask.name(), "ASK");
    assert_eq!(MessageCode::Swinsz.name(), "SWINSZ");
    assert_eq!(MessageCode::Interrupt.name(), "INTERRUPT");
    assert_eq!(MessageCode::Wait.to_string(), "WAIT");
}

#[test]
fn option_masks_retain_unknown_bits() {
    let ask = AskOptions::from_bits_retain(0x8001);
    assert!(ask.contains(AskOptions::NOECHO));
    assert_eq!(ask.bits(), 0x8001);

    let wait = WaitOptions::from_bits_retain(0x00F1);
    assert!(wait.contains(WaitOptions::STATUS));
    assert_eq!(wait.bits(), 0x00F1);
}
