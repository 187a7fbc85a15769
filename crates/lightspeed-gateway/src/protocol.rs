//! Event-stream wire protocol.
//!
//! Every frame on the socket is one JSON object carrying an operation
//! code, an optional sequence number (dispatch frames only), an optional
//! event name, and a typed body. The session state machine consumes and
//! produces [`Frame`]s; the transport layer only moves them.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use lightspeed_core::{Error, Result};

/// Operation code carried by every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    /// Server → client, first frame after connect. Carries the required
    /// heartbeat interval.
    Hello,
    /// Client → server liveness probe; the server may also send one to
    /// request an immediate heartbeat.
    Heartbeat,
    /// Server → client acknowledgment of a heartbeat.
    HeartbeatAck,
    /// Client → server credential presentation for a fresh session.
    Identify,
    /// Client → server request to continue an existing session from a
    /// sequence number.
    Resume,
    /// Server → client event delivery.
    Dispatch,
    /// Server → client request to drop and reconnect (resume expected).
    Reconnect,
    /// Server → client: the session cannot continue.
    InvalidSession,
}

/// One frame on the event stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Frame {
    /// Operation code.
    pub op: Opcode,
    /// Sequence number; present on dispatch frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Event name; present on dispatch frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Typed body for the operation.
    #[serde(default)]
    pub data: Value,
}

/// Body of a [`Opcode::Hello`] frame.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Hello {
    /// Interval the client must heartbeat on, in milliseconds.
    pub heartbeat_interval_ms: u64,
}

/// Body of the `ready` dispatch, sent once identification is accepted.
#[derive(Clone, Debug, Deserialize)]
pub struct Ready {
    /// Identifier used to resume this session later.
    pub session_id: String,
    /// Preferred URL for resume attempts, if the server has one.
    #[serde(default)]
    pub resume_url: Option<String>,
}

/// Body of an [`Opcode::InvalidSession`] frame.
#[derive(Clone, Debug, Deserialize)]
pub struct InvalidSession {
    /// Whether the session may still be resumed.
    pub resumable: bool,
    /// Machine-readable reason, if the server supplied one.
    #[serde(default)]
    pub reason: Option<String>,
}

impl InvalidSession {
    /// Whether the session died because the credentials were rejected.
    /// Together with `resumable == false` this is terminal.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        self.reason
            .as_deref()
            .is_some_and(|r| r.starts_with("authentication"))
    }
}

impl Frame {
    /// Build a heartbeat frame carrying the last seen sequence number.
    #[must_use]
    pub fn heartbeat(seq: Option<u64>) -> Self {
        Self {
            op: Opcode::Heartbeat,
            seq,
            event: None,
            data: Value::Null,
        }
    }

    /// Build an identify frame for a fresh session.
    #[must_use]
    pub fn identify(token: &str) -> Self {
        Self {
            op: Opcode::Identify,
            seq: None,
            event: None,
            data: json!({ "token": token }),
        }
    }

    /// Build a resume frame continuing `session_id` after `seq`.
    #[must_use]
    pub fn resume(token: &str, session_id: &str, seq: u64) -> Self {
        Self {
            op: Opcode::Resume,
            seq: None,
            event: None,
            data: json!({ "token": token, "session_id": session_id, "seq": seq }),
        }
    }

    /// Decode the body of a hello frame.
    pub fn hello(&self) -> Result<Hello> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Decode the body of a `ready` dispatch.
    pub fn ready(&self) -> Result<Ready> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Decode the body of an invalid-session frame.
    pub fn invalid_session(&self) -> Result<InvalidSession> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Decode a frame from wire text.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::from)
    }

    /// Encode a frame to wire text.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_uses_snake_case_strings() {
        assert_eq!(
            serde_json::to_value(Opcode::HeartbeatAck).unwrap(),
            serde_json::json!("heartbeat_ack"),
        );
        assert_eq!(
            serde_json::to_value(Opcode::InvalidSession).unwrap(),
            serde_json::json!("invalid_session"),
        );
    }

    #[test]
    fn dispatch_frame_roundtrips() {
        let text = r#"{"op":"dispatch","seq":7,"event":"message_create","data":{"content":"hi"}}"#;
        let frame = Frame::decode(text).unwrap();
        assert_eq!(frame.op, Opcode::Dispatch);
        assert_eq!(frame.seq, Some(7));
        assert_eq!(frame.event.as_deref(), Some("message_create"));
        assert_eq!(frame.data["content"], "hi");
    }

    #[test]
    fn hello_carries_heartbeat_interval() {
        let frame = Frame::decode(
            r#"{"op":"hello","data":{"heartbeat_interval_ms":45000}}"#,
        )
        .unwrap();
        assert_eq!(frame.hello().unwrap().heartbeat_interval_ms, 45_000);
    }

    #[test]
    fn heartbeat_omits_absent_fields() {
        let encoded = Frame::heartbeat(None).encode().unwrap();
        assert!(!encoded.contains("seq"));
        assert!(!encoded.contains("event"));

        let encoded = Frame::heartbeat(Some(12)).encode().unwrap();
        assert!(encoded.contains(r#""seq":12"#));
    }

    #[test]
    fn invalid_session_auth_reason_is_fatal_marker() {
        let frame = Frame::decode(
            r#"{"op":"invalid_session","data":{"resumable":false,"reason":"authentication_failed"}}"#,
        )
        .unwrap();
        let body = frame.invalid_session().unwrap();
        assert!(!body.resumable);
        assert!(body.is_auth_failure());

        let frame = Frame::decode(r#"{"op":"invalid_session","data":{"resumable":true}}"#).unwrap();
        assert!(!frame.invalid_session().unwrap().is_auth_failure());
    }
}
