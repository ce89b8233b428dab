use std::sync::Arc;

use async_trait::async_trait;
use extendo_core_models::{
    parse_get_latest_response, parse_health_response, validate_inbound_event, ConversationEvent,
    EventSource, GetLatestSuccess, InboundMessage, PeerRequest, PullResponse, TriggerReason,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::errors::PeerError;
use crate::manager::{LinkCloser, SyncLink, SyncTransport};
use crate::processor::{EventProcessor, ProcessOutcome};

/// What a long-lived peer port delivers.
#[derive(Clone, Debug, PartialEq)]
pub enum PortSignal {
    Message(Value),
    Disconnected { error: Option<String> },
}

pub struct PeerPort {
    pub port_id: String,
    pub inbound: mpsc::UnboundedReceiver<PortSignal>,
}

/// Cross-extension messaging as exposed by the host: one-shot requests and
/// named long-lived ports.
#[async_trait]
pub trait PeerMessaging: Send + Sync {
    async fn send_message(&self, peer_id: &str, message: Value) -> Result<Value, PeerError>;
    async fn connect(&self, peer_id: &str, port_name: &str) -> Result<PeerPort, PeerError>;
}

/// Health check, port handshake and pull reconciliation against the peer.
/// Every failure is logged and folded into `false`/`None`.
#[derive(Clone)]
pub struct ConnectionManager {
    messaging: Arc<dyn PeerMessaging>,
    processor: EventProcessor,
    port_name: String,
}

impl ConnectionManager {
    pub fn new(messaging: Arc<dyn PeerMessaging>, processor: EventProcessor, config: &SyncConfig) -> Self {
        Self {
            messaging,
            processor,
            port_name: config.port_name.clone(),
        }
    }

    pub async fn is_healthy(&self, peer_id: &str) -> bool {
        match self
            .messaging
            .send_message(peer_id, PeerRequest::health_ping().to_value())
            .await
        {
            Ok(reply) => parse_health_response(&reply),
            Err(err) => {
                debug!(peer_id, error = %err, "health ping failed");
                false
            }
        }
    }

    pub async fn pull_latest(&self, peer_id: &str, reason: TriggerReason) -> Option<GetLatestSuccess> {
        info!(peer_id, %reason, "reconcile pull start");
        let reply = match self
            .messaging
            .send_message(peer_id, PeerRequest::get_latest_original().to_value())
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                error!(peer_id, %reason, error = %err, "reconcile pull failed");
                return None;
            }
        };

        match parse_get_latest_response(&reply) {
            PullResponse::Latest(latest) => {
                info!(
                    peer_id,
                    %reason,
                    conversation_id = %latest.conversation_id,
                    ts = %latest.ts,
                    "reconcile pull success"
                );
                Some(latest)
            }
            PullResponse::Failed { code, message } => {
                info!(peer_id, %reason, ?code, %message, "reconcile pull skip");
                None
            }
            PullResponse::Invalid(err) => {
                info!(peer_id, %reason, error = %err, "reconcile pull skip: invalid response");
                None
            }
        }
    }

    /// Feeds the peer's latest conversation through the same pipeline as pushed
    /// events.
    pub async fn reconcile(&self, peer_id: &str, reason: TriggerReason) -> Option<ProcessOutcome> {
        let latest = self.pull_latest(peer_id, reason).await?;
        let event = ConversationEvent::from_pull(&latest);
        Some(self.processor.process(&event, EventSource::PullReconcile).await)
    }

    /// Opens the events port after a successful health check and starts routing
    /// its messages into the processor.
    pub async fn open_listener(&self, peer_id: &str, reason: TriggerReason) -> Option<SyncLink> {
        info!(peer_id, port_name = %self.port_name, %reason, "attempting to start event listener");
        if !self.is_healthy(peer_id).await {
            warn!(peer_id, "health check failed; listener not started");
            return None;
        }

        let port = match self.messaging.connect(peer_id, &self.port_name).await {
            Ok(port) => port,
            Err(err) => {
                error!(peer_id, error = %err, "failed to connect to peer");
                return None;
            }
        };

        let (link, closer) = SyncLink::pair(port.port_id.clone());
        tokio::spawn(pump_port(self.processor.clone(), port, closer));
        info!(peer_id, "connected to peer event stream");
        Some(link)
    }
}

#[async_trait]
impl SyncTransport for ConnectionManager {
    async fn connect(&self, peer_id: &str, reason: TriggerReason) -> Option<SyncLink> {
        self.open_listener(peer_id, reason).await
    }

    async fn reconcile(&self, peer_id: &str, reason: TriggerReason) {
        self.reconcile(peer_id, reason).await;
    }
}

async fn pump_port(processor: EventProcessor, mut port: PeerPort, closer: LinkCloser) {
    while let Some(signal) = port.inbound.recv().await {
        match signal {
            PortSignal::Message(message) => dispatch_port_message(&processor, message),
            PortSignal::Disconnected { error } => {
                closer.close(error);
                return;
            }
        }
    }
    closer.close(None);
}

fn dispatch_port_message(processor: &EventProcessor, message: Value) {
    debug!(
        api = ?message.get("api"),
        event_type = ?message.get("type"),
        event_id = ?message.get("event_id"),
        conversation_id = ?message.get("conversation_id"),
        "received message from event stream"
    );

    match validate_inbound_event(&message) {
        InboundMessage::Conversation(event) => {
            let processor = processor.clone();
            let source = event.port_source();
            tokio::spawn(async move {
                processor.process(&event, source).await;
            });
        }
        InboundMessage::Rejected(reason) => {
            info!(%reason, "ignoring non-conversation event message");
        }
    }
}
