use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::constants::{
    BLACKIYA_API_VERSION, ORIGINAL_FORMAT, PULL_EVENT_ID_PREFIX, REPLAY_EVENT_ID_PREFIX,
};
use crate::enums::{
    CaptureSource, Completeness, ConversationEventType, EventSource, FailureCode, Fidelity,
};

/// Raw conversation document as captured by the peer (ChatGPT-style `title` + `mapping`).
pub type ConversationPayload = Map<String, Value>;

/// `[conversationId, payloadHash]`, the persisted form of one dedupe cache entry.
pub type PersistedConversationHashEntry = (String, String);

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptureMeta {
    #[serde(
        rename = "captureSource",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub capture_source: Option<CaptureSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fidelity: Option<Fidelity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness: Option<Completeness>,
}

impl CaptureMeta {
    pub fn canonical() -> Self {
        Self {
            capture_source: Some(CaptureSource::CanonicalApi),
            fidelity: Some(Fidelity::High),
            completeness: Some(Completeness::Complete),
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.capture_source == Some(CaptureSource::CanonicalApi)
            && self.fidelity == Some(Fidelity::High)
            && self.completeness == Some(Completeness::Complete)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConversationEvent {
    pub api: String,
    #[serde(rename = "type")]
    pub event_type: ConversationEventType,
    pub event_id: String,
    pub conversation_id: String,
    pub payload: ConversationPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_meta: Option<CaptureMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl ConversationEvent {
    /// Builds the event a reconciliation pull is processed as. The id is derived
    /// from the conversation and the response timestamp so that repeated pulls of
    /// the same snapshot dedupe like repeated pushes.
    pub fn from_pull(response: &GetLatestSuccess) -> Self {
        Self {
            api: response.api.clone(),
            event_type: ConversationEventType::Updated,
            event_id: pull_event_id(&response.conversation_id, &response.ts),
            conversation_id: response.conversation_id.clone(),
            payload: response.data.clone(),
            capture_meta: None,
            content_hash: None,
        }
    }

    /// Source of an event received over the events port.
    pub fn port_source(&self) -> EventSource {
        if self.event_id.starts_with(REPLAY_EVENT_ID_PREFIX) {
            EventSource::Replay
        } else {
            EventSource::Push
        }
    }
}

pub fn pull_event_id(conversation_id: &str, ts: &Number) -> String {
    format!("{PULL_EVENT_ID_PREFIX}{conversation_id}:{ts}")
}

/// Requests this side sends to the peer over one-shot messaging.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PeerRequest {
    #[serde(rename = "health.ping")]
    HealthPing { api: String },
    #[serde(rename = "conversation.getLatest")]
    GetLatest {
        api: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
}

impl PeerRequest {
    pub fn health_ping() -> Self {
        PeerRequest::HealthPing {
            api: BLACKIYA_API_VERSION.into(),
        }
    }

    pub fn get_latest_original() -> Self {
        PeerRequest::GetLatest {
            api: BLACKIYA_API_VERSION.into(),
            format: Some(ORIGINAL_FORMAT.into()),
        }
    }

    pub fn to_value(&self) -> Value {
        // Plain strings only, serialization cannot fail.
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GetLatestSuccess {
    pub api: String,
    pub ts: Number,
    pub conversation_id: String,
    pub format: String,
    pub data: ConversationPayload,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PeerFailure {
    #[serde(default)]
    pub api: String,
    #[serde(default)]
    pub ts: Option<Number>,
    pub code: FailureCode,
    #[serde(default)]
    pub message: String,
}
