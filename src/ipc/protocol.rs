//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::{ControlInput, MissionEvent};
use crate::state::MissionSnapshot;

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from a frontend to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current mission status
    GetStatus,

    /// Rocket clicked
    Click,

    /// Reset button pressed
    Reset,

    /// Speech recognized by the frontend
    Transcript { text: String, is_final: bool },

    /// Start or stop the daemon's recognizer
    ToggleListening,

    /// Ping to check connectivity
    Ping,

    /// Switch this connection to pushed mission events
    Subscribe,
}

impl Request {
    /// Mission control input carried by this request, if any
    pub fn into_input(self) -> Option<ControlInput> {
        match self {
            Request::Click => Some(ControlInput::Click),
            Request::Reset => Some(ControlInput::Reset),
            Request::Transcript { text, is_final } => Some(ControlInput::Heard { text, is_final }),
            Request::ToggleListening => Some(ControlInput::ToggleListening),
            Request::GetStatus | Request::Ping | Request::Subscribe => None,
        }
    }
}

/// Responses from daemon to frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current mission status
    Status(MissionStatus),

    /// Input queued for mission control
    Accepted,

    /// Pong response to ping
    Pong,

    /// Subscription confirmed; notifications follow
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification for subscribed frontends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Mission control emitted an event
    Event { event: MissionEvent },
}

/// Full status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionStatus {
    /// Daemon version
    pub version: String,

    /// Status line, e.g. "T-7"
    pub label: String,

    /// Mission state and voice details
    pub mission: MissionSnapshot,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for MissionStatus {
    fn default() -> Self {
        Self::from_snapshot(MissionSnapshot::default(), 0)
    }
}

impl MissionStatus {
    pub fn from_snapshot(mission: MissionSnapshot, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            label: mission.state.to_string(),
            mission,
            uptime_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MissionState;

    #[test]
    fn test_request_serialization() {
        let req = Request::Transcript {
            text: "launch".into(),
            is_final: true,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("transcript"));
        assert!(json.contains("is_final"));
    }

    #[test]
    fn test_request_deserialization() {
        let req: Request = serde_json::from_str(r#"{"type":"toggle_listening"}"#).unwrap();
        assert_eq!(req.into_input(), Some(ControlInput::ToggleListening));
    }

    #[test]
    fn test_status_label() {
        let snapshot = MissionSnapshot {
            state: MissionState::CountingDown(3),
            ..MissionSnapshot::default()
        };
        let status = MissionStatus::from_snapshot(snapshot, 12);
        assert_eq!(status.label, "T-3");

        let json = serde_json::to_string(&Response::Status(status)).unwrap();
        assert!(json.contains("counting_down"));
    }

    #[test]
    fn test_query_requests_carry_no_input() {
        assert_eq!(Request::Ping.into_input(), None);
        assert_eq!(Request::Subscribe.into_input(), None);
    }
}
