use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use extendo_blackiya::{Alarm, PeerError, PeerMessaging, PeerPort, PortSignal};
use extendo_core_models::TriggerReason;
use serde_json::Value;
use tokio::io::AsyncWrite;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::errors::FrameError;
use crate::frame::write_message;
use crate::protocol::{HostFrame, RelayFrame};

type PeerReply = Result<Value, PeerError>;

/// Relay frames the bridge does not consume itself.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    Lifecycle(TriggerReason),
    Alarm(Alarm),
    RuntimeMessage { request_id: String, message: Value },
}

/// Peer messaging carried over the browser relay. Requests are correlated by
/// id; ports are keyed by the id the host assigns when opening them.
pub struct NativeBridge {
    outbound: mpsc::UnboundedSender<HostFrame>,
    pending: Mutex<HashMap<String, oneshot::Sender<PeerReply>>>,
    ports: Mutex<HashMap<String, mpsc::UnboundedSender<PortSignal>>>,
    request_timeout: Duration,
}

impl NativeBridge {
    pub fn new(request_timeout: Duration) -> (Self, mpsc::UnboundedReceiver<HostFrame>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let bridge = Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            ports: Mutex::new(HashMap::new()),
            request_timeout,
        };
        (bridge, outbound_rx)
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<PeerReply>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ports(&self) -> MutexGuard<'_, HashMap<String, mpsc::UnboundedSender<PortSignal>>> {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn send(&self, frame: HostFrame) -> bool {
        self.outbound.send(frame).is_ok()
    }

    pub fn open_ports(&self) -> usize {
        self.ports().len()
    }

    /// Consumes responses and port traffic; hands everything else back.
    pub fn route(&self, frame: RelayFrame) -> Option<HostEvent> {
        match frame {
            RelayFrame::PeerResponse {
                request_id,
                ok,
                reply,
                error,
            } => {
                let Some(waiter) = self.pending().remove(&request_id) else {
                    debug!(%request_id, "late or unknown peer response dropped");
                    return None;
                };
                let outcome = if ok {
                    Ok(reply.unwrap_or(Value::Null))
                } else {
                    Err(PeerError::Remote(
                        error.unwrap_or_else(|| "peer request failed".into()),
                    ))
                };
                let _ = waiter.send(outcome);
                None
            }
            RelayFrame::PortMessage { port_id, message } => {
                let delivered = self
                    .ports()
                    .get(&port_id)
                    .is_some_and(|tx| tx.send(PortSignal::Message(message)).is_ok());
                if !delivered {
                    debug!(%port_id, "message for unknown port dropped");
                }
                None
            }
            RelayFrame::PortDisconnect { port_id, error } => {
                if let Some(tx) = self.ports().remove(&port_id) {
                    let _ = tx.send(PortSignal::Disconnected { error });
                }
                None
            }
            RelayFrame::Lifecycle { event } => Some(HostEvent::Lifecycle(event.trigger_reason())),
            RelayFrame::Alarm { name } => Some(HostEvent::Alarm(Alarm { name })),
            RelayFrame::RuntimeMessage {
                request_id,
                message,
            } => Some(HostEvent::RuntimeMessage {
                request_id,
                message,
            }),
        }
    }

    /// Reports every open port as disconnected and fails pending requests.
    pub fn disconnect_all(&self, error: Option<String>) {
        let ports: Vec<_> = self.ports().drain().collect();
        for (port_id, tx) in ports {
            debug!(%port_id, "closing port");
            let _ = tx.send(PortSignal::Disconnected {
                error: error.clone(),
            });
        }
        self.pending().clear();
    }
}

#[async_trait]
impl PeerMessaging for NativeBridge {
    async fn send_message(&self, peer_id: &str, message: Value) -> Result<Value, PeerError> {
        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending().insert(request_id.clone(), tx);

        let frame = HostFrame::PeerRequest {
            request_id: request_id.clone(),
            peer_id: peer_id.to_string(),
            message,
        };
        if !self.send(frame) {
            self.pending().remove(&request_id);
            return Err(PeerError::ChannelClosed);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(PeerError::ChannelClosed),
            Err(_) => {
                self.pending().remove(&request_id);
                warn!(%request_id, peer_id, "peer request timed out");
                Err(PeerError::Timeout(self.request_timeout.as_millis() as u64))
            }
        }
    }

    async fn connect(&self, peer_id: &str, port_name: &str) -> Result<PeerPort, PeerError> {
        let port_id = Uuid::new_v4().to_string();
        let (tx, inbound) = mpsc::unbounded_channel();
        self.ports().insert(port_id.clone(), tx);

        let frame = HostFrame::PortOpen {
            port_id: port_id.clone(),
            peer_id: peer_id.to_string(),
            name: port_name.to_string(),
        };
        if !self.send(frame) {
            self.ports().remove(&port_id);
            return Err(PeerError::ChannelClosed);
        }
        Ok(PeerPort { port_id, inbound })
    }
}

/// Drains outbound frames onto the relay. An oversized frame is dropped;
/// an I/O failure ends the task.
pub fn spawn_writer<W>(
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<HostFrame>,
) -> JoinHandle<Result<(), FrameError>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            match write_message(&mut writer, &frame).await {
                Ok(()) => {}
                Err(err @ FrameError::TooLarge { .. }) => {
                    error!(error = %err, "dropping outbound frame");
                }
                Err(err) => {
                    error!(error = %err, "relay output failed");
                    return Err(err);
                }
            }
        }
        Ok(())
    })
}
