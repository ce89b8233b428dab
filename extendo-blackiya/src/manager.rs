use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use extendo_core_models::TriggerReason;
use extendo_storage::{ExtensionSettings, StoreError};
use tokio::sync::{oneshot, watch, OnceCell};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::dedupe::{from_entries, remember_hash, to_entries};
use crate::scheduler::{Alarm, SyncScheduler, TimerId, TimerTask};
use crate::state::SharedSyncState;

/// An established event listener. Resolves once the peer closes the port.
pub struct SyncLink {
    port_id: String,
    closed: oneshot::Receiver<Option<String>>,
}

/// Signals closure of the matching [`SyncLink`]. Dropping it counts as a clean
/// close.
pub struct LinkCloser {
    tx: oneshot::Sender<Option<String>>,
}

impl SyncLink {
    pub fn pair(port_id: impl Into<String>) -> (SyncLink, LinkCloser) {
        let (tx, closed) = oneshot::channel();
        let link = SyncLink {
            port_id: port_id.into(),
            closed,
        };
        (link, LinkCloser { tx })
    }

    pub fn port_id(&self) -> &str {
        &self.port_id
    }

    /// Waits for the close notification, yielding the peer's error message if
    /// it gave one.
    pub async fn closed(self) -> Option<String> {
        self.closed.await.unwrap_or(None)
    }
}

impl LinkCloser {
    pub fn close(self, error: Option<String>) {
        let _ = self.tx.send(error);
    }
}

/// Connection and reconciliation as seen by the orchestrator.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn connect(&self, peer_id: &str, reason: TriggerReason) -> Option<SyncLink>;
    async fn reconcile(&self, peer_id: &str, reason: TriggerReason);
}

struct PendingTimer {
    token: u64,
    id: TimerId,
}

#[derive(Default)]
struct Lifecycle {
    active_link: Option<u64>,
    link_generation: u64,
    connecting: Option<watch::Receiver<Option<bool>>>,
    reconnect_timer: Option<PendingTimer>,
    timer_seq: u64,
    warned_missing_peer: bool,
}

struct ManagerInner {
    config: SyncConfig,
    settings: Arc<dyn ExtensionSettings>,
    transport: Arc<dyn SyncTransport>,
    scheduler: Arc<dyn SyncScheduler>,
    state: SharedSyncState,
    hydrated: OnceCell<()>,
    lifecycle: Mutex<Lifecycle>,
}

impl ManagerInner {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum ConnectAttempt {
    Connected,
    Join(watch::Receiver<Option<bool>>),
    Lead(watch::Sender<Option<bool>>),
}

/// Clears the in-progress connect slot when the leading attempt finishes or is
/// dropped.
struct ConnectSlot<'a> {
    inner: &'a ManagerInner,
}

impl Drop for ConnectSlot<'_> {
    fn drop(&mut self) {
        self.inner.lifecycle().connecting = None;
    }
}

/// Top-level orchestrator. Every lifecycle hook funnels into
/// [`SyncManager::ensure_connected_and_reconciled`].
///
/// Cheap to clone; clones share one connection, timer and dedupe state.
#[derive(Clone)]
pub struct SyncManager {
    inner: Arc<ManagerInner>,
}

impl SyncManager {
    pub fn new(
        config: SyncConfig,
        settings: Arc<dyn ExtensionSettings>,
        transport: Arc<dyn SyncTransport>,
        scheduler: Arc<dyn SyncScheduler>,
        state: SharedSyncState,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                settings,
                transport,
                scheduler,
                state,
                hydrated: OnceCell::new(),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    fn from_weak(weak: &Weak<ManagerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn state(&self) -> &SharedSyncState {
        &self.inner.state
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lifecycle().active_link.is_some()
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.inner.lifecycle().reconnect_timer.is_some()
    }

    /// Schedules the heartbeat alarm and runs the bootstrap trigger.
    pub async fn init(&self) {
        info!("starting event sync bootstrap");
        let config = &self.inner.config;
        self.inner
            .scheduler
            .create_alarm(&config.heartbeat_alarm_name, config.heartbeat_period_minutes);
        info!(
            alarm = %config.heartbeat_alarm_name,
            period_minutes = config.heartbeat_period_minutes,
            "scheduled sync heartbeat alarm"
        );
        self.ensure_connected_and_reconciled(TriggerReason::Bootstrap)
            .await;
    }

    pub async fn handle_alarm(&self, alarm: &Alarm) {
        if alarm.name != self.inner.config.heartbeat_alarm_name {
            return;
        }
        self.ensure_connected_and_reconciled(TriggerReason::AlarmHeartbeat)
            .await;
    }

    pub async fn ensure_connected_and_reconciled(&self, reason: TriggerReason) {
        if let Err(err) = self.hydrate().await {
            error!(%reason, error = %err, "failed to load persisted hash dedupe cache");
            self.schedule_reconnect(reason);
            return;
        }

        let peer_id = match self.inner.settings.blackiya_extension_id().await {
            Ok(peer_id) => peer_id,
            Err(err) => {
                error!(%reason, error = %err, "failed to read peer extension id");
                String::new()
            }
        };
        if peer_id.is_empty() {
            let first_warning = {
                let mut lifecycle = self.inner.lifecycle();
                !std::mem::replace(&mut lifecycle.warned_missing_peer, true)
            };
            if first_warning {
                warn!(%reason, "missing Blackiya extension id in settings; skipping sync");
            }
            self.schedule_reconnect(reason);
            return;
        }
        self.inner.lifecycle().warned_missing_peer = false;

        if !self.connect(&peer_id, reason).await {
            info!(peer_id = %peer_id, %reason, "skipping reconcile; listener is not connected");
            return;
        }

        self.inner.transport.reconcile(&peer_id, reason).await;
    }

    /// Loads the persisted hash cache once per process. A failed read leaves
    /// the cell empty so the next trigger tries again.
    async fn hydrate(&self) -> Result<(), StoreError> {
        let inner = &self.inner;
        inner
            .hydrated
            .get_or_try_init(move || async move {
                let persisted = inner.settings.saved_conversation_hashes().await?;
                let max = inner.config.max_saved_payload_hashes;
                let conversations = {
                    let mut state = inner.state.lock();
                    let mut merged = from_entries(&persisted, max);
                    for (conversation_id, hash) in to_entries(&state.last_saved_hash_by_conversation_id) {
                        remember_hash(&mut merged, &conversation_id, &hash, max);
                    }
                    state.last_saved_hash_by_conversation_id = merged;
                    state.last_saved_hash_by_conversation_id.len()
                };
                info!(conversations, "loaded persisted hash dedupe cache");
                Ok::<(), StoreError>(())
            })
            .await
            .map(|_| ())
    }

    /// Reuses the active link, joins an attempt already in flight, or leads a
    /// new one.
    async fn connect(&self, peer_id: &str, reason: TriggerReason) -> bool {
        let attempt = {
            let mut lifecycle = self.inner.lifecycle();
            if lifecycle.active_link.is_some() {
                ConnectAttempt::Connected
            } else if let Some(pending) = lifecycle.connecting.clone() {
                ConnectAttempt::Join(pending)
            } else {
                let (tx, rx) = watch::channel(None);
                lifecycle.connecting = Some(rx);
                ConnectAttempt::Lead(tx)
            }
        };

        match attempt {
            ConnectAttempt::Connected => true,
            ConnectAttempt::Join(mut pending) => {
                debug!(peer_id, %reason, "joining in-flight connect attempt");
                pending
                    .wait_for(Option::is_some)
                    .await
                    .map(|result| *result == Some(true))
                    .unwrap_or(false)
            }
            ConnectAttempt::Lead(done) => {
                let slot = ConnectSlot { inner: &self.inner };
                let connected = self.establish(peer_id, reason).await;
                drop(slot);
                done.send_replace(Some(connected));
                connected
            }
        }
    }

    async fn establish(&self, peer_id: &str, reason: TriggerReason) -> bool {
        info!(peer_id, %reason, "listener connect start");
        let Some(link) = self.inner.transport.connect(peer_id, reason).await else {
            self.schedule_reconnect(reason);
            return false;
        };

        self.clear_reconnect_timer();
        let generation = {
            let mut lifecycle = self.inner.lifecycle();
            lifecycle.link_generation += 1;
            lifecycle.active_link = Some(lifecycle.link_generation);
            lifecycle.link_generation
        };
        info!(peer_id, %reason, port_id = link.port_id(), "listener connect success");

        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let error = link.closed().await;
            if let Some(manager) = SyncManager::from_weak(&weak) {
                manager.handle_disconnect(generation, error);
            }
        });
        true
    }

    fn handle_disconnect(&self, generation: u64, error: Option<String>) {
        let current = {
            let mut lifecycle = self.inner.lifecycle();
            let current = lifecycle.active_link == Some(generation);
            if current {
                lifecycle.active_link = None;
            }
            current
        };
        if !current {
            debug!(generation, "ignoring close of superseded link");
            return;
        }

        let reason = TriggerReason::DisconnectRetry;
        match error {
            Some(message) => warn!(%message, %reason, "disconnected from peer"),
            None => info!(%reason, "disconnected from peer"),
        }
        self.schedule_reconnect(reason);
    }

    /// Replaces any pending reconnect with a new one; the last caller wins.
    fn schedule_reconnect(&self, reason: TriggerReason) {
        let delay_ms = self.inner.config.reconnect_delay_ms;
        let mut lifecycle = self.inner.lifecycle();
        if let Some(previous) = lifecycle.reconnect_timer.take() {
            self.inner.scheduler.clear_timer(previous.id);
        }
        lifecycle.timer_seq += 1;
        let token = lifecycle.timer_seq;

        let weak = Arc::downgrade(&self.inner);
        let task: TimerTask = Box::pin(async move {
            let Some(manager) = SyncManager::from_weak(&weak) else {
                return;
            };
            manager.take_fired_timer(token);
            manager.ensure_connected_and_reconciled(reason).await;
        });
        let id = self
            .inner
            .scheduler
            .set_timer(Duration::from_millis(delay_ms), task);
        lifecycle.reconnect_timer = Some(PendingTimer { token, id });
        debug!(%reason, delay_ms, "scheduled reconnect");
    }

    fn take_fired_timer(&self, token: u64) {
        let mut lifecycle = self.inner.lifecycle();
        if lifecycle
            .reconnect_timer
            .as_ref()
            .is_some_and(|pending| pending.token == token)
        {
            lifecycle.reconnect_timer = None;
        }
    }

    fn clear_reconnect_timer(&self) {
        let pending = self.inner.lifecycle().reconnect_timer.take();
        if let Some(pending) = pending {
            self.inner.scheduler.clear_timer(pending.id);
        }
    }
}
