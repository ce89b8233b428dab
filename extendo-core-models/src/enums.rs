use std::fmt;

use serde::{Deserialize, Serialize};

/// Why the orchestrator was asked to (re)connect and reconcile.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    Bootstrap,
    Startup,
    Installed,
    AlarmHeartbeat,
    DisconnectRetry,
    Manual,
}

impl TriggerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerReason::Bootstrap => "bootstrap",
            TriggerReason::Startup => "startup",
            TriggerReason::Installed => "installed",
            TriggerReason::AlarmHeartbeat => "alarm_heartbeat",
            TriggerReason::DisconnectRetry => "disconnect_retry",
            TriggerReason::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a conversation event entered the pipeline. Only used for logging.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Push,
    PullReconcile,
    Replay,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::Push => "push",
            EventSource::PullReconcile => "pull_reconcile",
            EventSource::Replay => "replay",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConversationEventType {
    #[serde(rename = "conversation.ready")]
    Ready,
    #[serde(rename = "conversation.updated")]
    Updated,
    #[serde(other)]
    Unsupported,
}

impl ConversationEventType {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "conversation.ready" => ConversationEventType::Ready,
            "conversation.updated" => ConversationEventType::Updated,
            _ => ConversationEventType::Unsupported,
        }
    }

    pub fn is_conversation(&self) -> bool {
        matches!(
            self,
            ConversationEventType::Ready | ConversationEventType::Updated
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationEventType::Ready => "conversation.ready",
            ConversationEventType::Updated => "conversation.updated",
            ConversationEventType::Unsupported => "unsupported",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    CanonicalApi,
    DomSnapshotDegraded,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    High,
    Degraded,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    Complete,
    Partial,
    #[serde(other)]
    Unknown,
}

/// Failure codes the peer may answer a request with.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    InvalidRequest,
    NotFound,
    Unavailable,
    InternalError,
    #[serde(other)]
    Unknown,
}
