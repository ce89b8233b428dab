use extendo_core_models::TriggerReason;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames the host writes to the browser relay.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum HostFrame {
    #[serde(rename = "peer.request")]
    PeerRequest {
        request_id: String,
        peer_id: String,
        message: Value,
    },
    #[serde(rename = "port.open")]
    PortOpen {
        port_id: String,
        peer_id: String,
        name: String,
    },
    /// `response` is null when no handler claimed the message.
    #[serde(rename = "runtime.response")]
    RuntimeResponse { request_id: String, response: Value },
}

/// Frames the browser relay writes to the host.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum RelayFrame {
    #[serde(rename = "peer.response")]
    PeerResponse {
        request_id: String,
        ok: bool,
        #[serde(default)]
        reply: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(rename = "port.message")]
    PortMessage { port_id: String, message: Value },
    #[serde(rename = "port.disconnect")]
    PortDisconnect {
        port_id: String,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(rename = "lifecycle")]
    Lifecycle { event: LifecycleEvent },
    #[serde(rename = "alarm")]
    Alarm { name: String },
    #[serde(rename = "runtime.message")]
    RuntimeMessage { request_id: String, message: Value },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    Installed,
    Startup,
    Manual,
}

impl LifecycleEvent {
    pub fn trigger_reason(&self) -> TriggerReason {
        match self {
            LifecycleEvent::Installed => TriggerReason::Installed,
            LifecycleEvent::Startup => TriggerReason::Startup,
            LifecycleEvent::Manual => TriggerReason::Manual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn host_frames_are_tagged_by_kind() {
        let frame = HostFrame::PortOpen {
            port_id: "p1".into(),
            peer_id: "peer".into(),
            name: "blackiya.events.v1".into(),
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"kind": "port.open", "port_id": "p1", "peer_id": "peer", "name": "blackiya.events.v1"})
        );
    }

    #[test]
    fn relay_frames_parse_with_optional_fields() {
        let failed: RelayFrame = serde_json::from_value(json!({
            "kind": "peer.response", "request_id": "r1", "ok": false,
            "error": "Could not establish connection. Receiving end does not exist."
        }))
        .unwrap();
        assert!(matches!(
            failed,
            RelayFrame::PeerResponse { ok: false, reply: None, error: Some(_), .. }
        ));

        let closed: RelayFrame =
            serde_json::from_value(json!({"kind": "port.disconnect", "port_id": "p1"})).unwrap();
        assert_eq!(
            closed,
            RelayFrame::PortDisconnect {
                port_id: "p1".into(),
                error: None
            }
        );

        let lifecycle: RelayFrame =
            serde_json::from_value(json!({"kind": "lifecycle", "event": "installed"})).unwrap();
        assert_eq!(
            lifecycle,
            RelayFrame::Lifecycle {
                event: LifecycleEvent::Installed
            }
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(serde_json::from_value::<RelayFrame>(json!({"kind": "tab.closed"})).is_err());
    }

    #[test]
    fn lifecycle_events_map_to_trigger_reasons() {
        assert_eq!(LifecycleEvent::Startup.trigger_reason(), TriggerReason::Startup);
        assert_eq!(LifecycleEvent::Manual.trigger_reason().as_str(), "manual");
    }
}
