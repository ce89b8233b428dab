//! Schema checks for untyped messages arriving from the peer extension.
//!
//! Nothing received over the port or as a request reply is trusted until it has
//! been narrowed into one of the tagged results below.

use serde_json::{Map, Value};

use crate::constants::{BLACKIYA_API_VERSION, ORIGINAL_FORMAT};
use crate::enums::{ConversationEventType, FailureCode};
use crate::errors::ProtocolError;
use crate::protocol::{
    CaptureMeta, ConversationEvent, GetLatestSuccess, HealthResponse, PeerFailure,
};

/// Result of validating one message read from the events port.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundMessage {
    Conversation(ConversationEvent),
    Rejected(ProtocolError),
}

/// Result of validating a `conversation.getLatest` reply.
#[derive(Clone, Debug, PartialEq)]
pub enum PullResponse {
    Latest(GetLatestSuccess),
    Failed { code: FailureCode, message: String },
    Invalid(ProtocolError),
}

pub fn validate_inbound_event(message: &Value) -> InboundMessage {
    match parse_conversation_event(message) {
        Ok(event) => InboundMessage::Conversation(event),
        Err(err) => InboundMessage::Rejected(err),
    }
}

pub fn parse_conversation_event(message: &Value) -> Result<ConversationEvent, ProtocolError> {
    let data = message.as_object().ok_or(ProtocolError::NotAnObject)?;
    check_api(data)?;

    let raw_type = string_field(data, "type")?;
    let event_type = ConversationEventType::from_wire(raw_type);
    if !event_type.is_conversation() {
        return Err(ProtocolError::UnsupportedType(raw_type.to_string()));
    }

    let event_id = string_field(data, "event_id")?;
    if event_id.is_empty() {
        return Err(ProtocolError::InvalidField("event_id"));
    }
    let conversation_id = string_field(data, "conversation_id")?;
    let payload = data
        .get("payload")
        .and_then(Value::as_object)
        .ok_or(ProtocolError::InvalidField("payload"))?;

    let capture_meta = match data.get("capture_meta") {
        None | Some(Value::Null) => None,
        Some(meta @ Value::Object(_)) => Some(
            serde_json::from_value::<CaptureMeta>(meta.clone())
                .map_err(|_| ProtocolError::InvalidField("capture_meta"))?,
        ),
        Some(_) => return Err(ProtocolError::InvalidField("capture_meta")),
    };

    let content_hash = match data.get("content_hash") {
        None | Some(Value::Null) => None,
        Some(Value::String(hash)) => Some(hash.clone()),
        Some(_) => return Err(ProtocolError::InvalidField("content_hash")),
    };

    Ok(ConversationEvent {
        api: BLACKIYA_API_VERSION.to_string(),
        event_type,
        event_id: event_id.to_string(),
        conversation_id: conversation_id.to_string(),
        payload: payload.clone(),
        capture_meta,
        content_hash,
    })
}

/// Only an explicit `{ok: true}` counts as healthy.
pub fn parse_health_response(reply: &Value) -> bool {
    serde_json::from_value::<HealthResponse>(reply.clone())
        .map(|health| health.ok)
        .unwrap_or(false)
}

pub fn parse_get_latest_response(reply: &Value) -> PullResponse {
    let Some(data) = reply.as_object() else {
        return PullResponse::Invalid(ProtocolError::NotAnObject);
    };

    match data.get("ok").and_then(Value::as_bool) {
        Some(true) => match parse_latest_success(data) {
            Ok(success) => PullResponse::Latest(success),
            Err(err) => PullResponse::Invalid(err),
        },
        Some(false) => match serde_json::from_value::<PeerFailure>(reply.clone()) {
            Ok(failure) => PullResponse::Failed {
                code: failure.code,
                message: failure.message,
            },
            Err(_) => PullResponse::Invalid(ProtocolError::InvalidField("code")),
        },
        None => PullResponse::Invalid(ProtocolError::InvalidField("ok")),
    }
}

fn parse_latest_success(data: &Map<String, Value>) -> Result<GetLatestSuccess, ProtocolError> {
    let format = string_field(data, "format")?;
    if format != ORIGINAL_FORMAT {
        return Err(ProtocolError::UntrustedFormat(format.to_string()));
    }
    let conversation_id = string_field(data, "conversation_id")?;
    let ts = match data.get("ts") {
        Some(Value::Number(ts)) => ts.clone(),
        _ => return Err(ProtocolError::InvalidField("ts")),
    };
    let payload = data
        .get("data")
        .and_then(Value::as_object)
        .ok_or(ProtocolError::InvalidField("data"))?;
    let api = data
        .get("api")
        .and_then(Value::as_str)
        .unwrap_or(BLACKIYA_API_VERSION);

    Ok(GetLatestSuccess {
        api: api.to_string(),
        ts,
        conversation_id: conversation_id.to_string(),
        format: format.to_string(),
        data: payload.clone(),
    })
}

fn check_api(data: &Map<String, Value>) -> Result<(), ProtocolError> {
    match data.get("api").and_then(Value::as_str) {
        Some(BLACKIYA_API_VERSION) => Ok(()),
        Some(other) => Err(ProtocolError::ApiMismatch {
            expected: BLACKIYA_API_VERSION,
            actual: other.to_string(),
        }),
        None => Err(ProtocolError::InvalidField("api")),
    }
}

fn string_field<'a>(
    data: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ProtocolError> {
    data.get(field)
        .and_then(Value::as_str)
        .ok_or(ProtocolError::InvalidField(field))
}
