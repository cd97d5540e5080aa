//! Text codec for response frames.
//!
//! Wire form: `<type><success><reserved><body><separator><session id>`.
//! The first three characters are control flags, the session id is everything
//! after the *last* separator so that bodies may contain separators freely.

use super::frame::{Frame, ResponseType};
use crate::utils::config::{
    CONTROL_PREFIX_LEN, FAILURE_FLAG, PROTOCOL_ERROR_BODY, RESERVED_FLAG, SEPARATOR, SUCCESS_FLAG,
};
use crate::utils::error::{EncodingError, ProtocolError};
use log::warn;

/// Encode a frame to its wire form
///
/// # Errors
/// * `EncodingError::EmptySessionId` - the trailing separator would be ambiguous
/// * `EncodingError::SessionIdContainsSeparator` - the session id could not be recovered
pub fn encode(frame: &Frame) -> Result<String, EncodingError> {
    if frame.session_id.is_empty() {
        return Err(EncodingError::EmptySessionId);
    }
    if frame.session_id.contains(SEPARATOR) {
        return Err(EncodingError::SessionIdContainsSeparator(
            frame.session_id.clone(),
        ));
    }

    let mut raw =
        String::with_capacity(CONTROL_PREFIX_LEN + frame.body.len() + 1 + frame.session_id.len());
    raw.push(frame.response_type.tag());
    raw.push(if frame.success { SUCCESS_FLAG } else { FAILURE_FLAG });
    raw.push(RESERVED_FLAG);
    raw.push_str(&frame.body);
    raw.push(SEPARATOR);
    raw.push_str(&frame.session_id);
    Ok(raw)
}

/// Decode a raw frame, reporting malformed input as an error
pub fn try_decode(raw: &str) -> Result<Frame, ProtocolError> {
    let mut chars = raw.char_indices();

    let (_, type_tag) = chars.next().ok_or(ProtocolError::Truncated(0))?;
    let (_, success_flag) = chars.next().ok_or(ProtocolError::Truncated(1))?;
    let body_start = match chars.next() {
        Some((index, reserved)) => index + reserved.len_utf8(),
        None => return Err(ProtocolError::Truncated(2)),
    };

    let split = raw.rfind(SEPARATOR).ok_or(ProtocolError::MissingSessionId)?;
    if split < body_start {
        return Err(ProtocolError::MissingBody);
    }

    Ok(Frame {
        response_type: ResponseType::from_tag(type_tag),
        success: success_flag == SUCCESS_FLAG,
        body: raw[body_start..split].to_string(),
        session_id: raw[split + SEPARATOR.len_utf8()..].to_string(),
    })
}

/// Decode a raw frame, never failing
///
/// Malformed input yields a frame with `success = false`, a diagnostic body
/// and an empty session id; the response type is still taken from the first
/// character when present.
pub fn decode(raw: &str) -> Frame {
    match try_decode(raw) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("{} in frame {:?}", e, raw);
            degraded_frame(raw)
        }
    }
}

fn degraded_frame(raw: &str) -> Frame {
    let response_type = raw
        .chars()
        .next()
        .map(ResponseType::from_tag)
        .unwrap_or(ResponseType::Unknown);

    Frame {
        response_type,
        success: false,
        body: PROTOCOL_ERROR_BODY.to_string(),
        session_id: String::new(),
    }
}
