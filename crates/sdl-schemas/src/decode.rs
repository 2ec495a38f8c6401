//! Frame decoder.
//!
//! A frame is accepted only if it is a JSON object whose `type` names one of
//! the five known variants and whose body matches that variant. Anything else
//! is a [`DecodeError`]: local to the frame, never a stream-level failure.

use std::fmt;

use serde_json::Value;

use crate::StreamMessage;

/// Why a raw frame was discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is not valid JSON.
    InvalidJson(String),
    /// Valid JSON, but not an object.
    NotAnObject,
    /// Object without a string `type` field.
    MissingType,
    /// `type` is not one of the known discriminators.
    UnknownType(String),
    /// Known `type`, but the body does not match it.
    InvalidBody { kind: String, reason: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidJson(e) => write!(f, "frame is not valid json: {e}"),
            DecodeError::NotAnObject => write!(f, "frame is not a json object"),
            DecodeError::MissingType => write!(f, "frame has no string 'type' field"),
            DecodeError::UnknownType(t) => write!(f, "unknown frame type '{t}'"),
            DecodeError::InvalidBody { kind, reason } => {
                write!(f, "invalid '{kind}' frame: {reason}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode one raw text frame.
pub fn decode_frame(raw: &str) -> Result<StreamMessage, DecodeError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let Some(obj) = value.as_object() else {
        return Err(DecodeError::NotAnObject);
    };
    let kind = match obj.get("type").and_then(Value::as_str) {
        Some(k) => k.to_string(),
        None => return Err(DecodeError::MissingType),
    };
    if !StreamMessage::KINDS.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownType(kind));
    }

    serde_json::from_value(value).map_err(|e| DecodeError::InvalidBody {
        kind,
        reason: e.to_string(),
    })
}

/// Decode, logging and discarding failures.
///
/// `None` means the frame was dropped; the caller carries on with the next
/// one.
pub fn decode_or_log(raw: &str) -> Option<StreamMessage> {
    match decode_frame(raw) {
        Ok(msg) => Some(msg),
        Err(err) => {
            tracing::warn!(error = %err, frame_len = raw.len(), "discarding undecodable frame");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_decodes() {
        let msg = decode_frame(r#"{"type":"handshake","event_id":"401547439","heartbeat_sec":30}"#)
            .unwrap();
        match msg {
            StreamMessage::Handshake(h) => {
                assert_eq!(h.event_id, "401547439");
                assert_eq!(h.heartbeat_sec, 30);
                assert_eq!(h.mode, None);
            }
            other => panic!("expected handshake, got {other:?}"),
        }
    }

    #[test]
    fn delta_decodes_with_optional_fields_missing() {
        let msg = decode_frame(
            r#"{"type":"delta","event_id":"9","data":{"sequence":3,"type":"pass","flags":["scoring"]}}"#,
        )
        .unwrap();
        let StreamMessage::Delta(d) = msg else {
            panic!("expected delta");
        };
        assert_eq!(d.data.sequence, 3);
        assert_eq!(d.data.kind, "pass");
        assert!(d.data.flags.contains("scoring"));
        assert_eq!(d.data.description, None);
    }

    #[test]
    fn delta_without_flags_defaults_to_empty_set() {
        let msg = decode_frame(r#"{"type":"delta","event_id":"9","data":{"sequence":1,"type":"kick"}}"#)
            .unwrap();
        let StreamMessage::Delta(d) = msg else {
            panic!("expected delta");
        };
        assert!(d.data.flags.is_empty());
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(decode_frame("{not json"), Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn non_object_is_rejected() {
        assert_eq!(decode_frame("[1,2]"), Err(DecodeError::NotAnObject));
    }

    #[test]
    fn missing_type_is_rejected() {
        assert_eq!(decode_frame(r#"{"event_id":"1"}"#), Err(DecodeError::MissingType));
        assert_eq!(decode_frame(r#"{"type":7}"#), Err(DecodeError::MissingType));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert_eq!(
            decode_frame(r#"{"type":"scoreboard","event_id":"1"}"#),
            Err(DecodeError::UnknownType("scoreboard".to_string()))
        );
    }

    #[test]
    fn known_type_with_bad_body_is_rejected() {
        let err = decode_frame(r#"{"type":"delta","event_id":"1","data":{"type":"pass"}}"#)
            .unwrap_err();
        match err {
            DecodeError::InvalidBody { kind, .. } => assert_eq!(kind, "delta"),
            other => panic!("expected InvalidBody, got {other:?}"),
        }
    }

    #[test]
    fn decode_or_log_swallows_failures() {
        assert!(decode_or_log("garbage").is_none());
        assert!(decode_or_log(r#"{"type":"replay_complete","event_id":"1"}"#).is_some());
    }
}
