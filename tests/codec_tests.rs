use diag_trace::protocol::{decode, encode, try_decode, Frame, ResponseType};
use diag_trace::utils::config::PROTOCOL_ERROR_BODY;
use diag_trace::utils::error::{EncodingError, ProtocolError};
use pretty_assertions::assert_eq;

#[test]
fn test_console_frame_example() {
    let frame = Frame::console("hello world", "abc123");
    let raw = encode(&frame).unwrap();
    assert_eq!(raw, "C1-hello world abc123");
    assert_eq!(decode(&raw), frame);
}

#[test]
fn test_every_known_type_round_trips() {
    for (response_type, tag) in [
        (ResponseType::Ack, 'A'),
        (ResponseType::Online, 'O'),
        (ResponseType::Console, 'C'),
        (ResponseType::JsonResult, 'J'),
        (ResponseType::CommandEnd, 'E'),
    ] {
        let frame = Frame::new(response_type, false, "body", "s-1");
        let raw = encode(&frame).unwrap();
        assert!(raw.starts_with(&format!("{}0-", tag)));
        assert_eq!(decode(&raw), frame);
    }
}

#[test]
fn test_body_with_separators_recovers_session_from_tail() {
    let frame = Frame::json_result(r#"{"a": "x y z"} trailing "#, "sess");
    let decoded = decode(&encode(&frame).unwrap());
    assert_eq!(decoded.body, r#"{"a": "x y z"} trailing "#);
    assert_eq!(decoded.session_id, "sess");
}

#[test]
fn test_empty_body_and_empty_command_end() {
    let raw = encode(&Frame::command_end(true, "s1")).unwrap();
    assert_eq!(raw, "E1- s1");
    let frame = decode(&raw);
    assert!(frame.is_command_end());
    assert_eq!(frame.body, "");
}

#[test]
fn test_unknown_tag_decodes_to_unknown() {
    let frame = decode("Z1-body s1");
    assert_eq!(frame.response_type, ResponseType::Unknown);
    assert_eq!(frame.body, "body");
    assert_eq!(frame.session_id, "s1");
}

#[test]
fn test_any_non_success_char_is_failure() {
    assert!(!decode("Cx-body s1").success);
    assert!(decode("C1-body s1").success);
}

#[test]
fn test_missing_separator_degrades() {
    assert_eq!(try_decode("C1-nobody"), Err(ProtocolError::MissingSessionId));

    let frame = decode("C1-nobody");
    assert_eq!(frame.response_type, ResponseType::Console);
    assert!(!frame.success);
    assert_eq!(frame.body, PROTOCOL_ERROR_BODY);
    assert!(frame.session_id.is_empty());
}

#[test]
fn test_short_and_empty_input_degrades() {
    assert_eq!(try_decode(""), Err(ProtocolError::Truncated(0)));
    assert_eq!(try_decode("C1"), Err(ProtocolError::Truncated(2)));
    assert_eq!(try_decode("C "), Err(ProtocolError::Truncated(2)));
    assert_eq!(try_decode("C 1-body"), Err(ProtocolError::MissingBody));

    let frame = decode("");
    assert_eq!(frame.response_type, ResponseType::Unknown);
    assert!(!frame.success);
}

#[test]
fn test_trailing_separator_yields_empty_session() {
    let frame = try_decode("C1-body ").unwrap();
    assert_eq!(frame.body, "body");
    assert_eq!(frame.session_id, "");
}

#[test]
fn test_encode_rejects_bad_session_ids() {
    assert_eq!(
        encode(&Frame::console("x", "")),
        Err(EncodingError::EmptySessionId)
    );
    assert_eq!(
        encode(&Frame::console("x", "a b")),
        Err(EncodingError::SessionIdContainsSeparator("a b".to_string()))
    );
}
