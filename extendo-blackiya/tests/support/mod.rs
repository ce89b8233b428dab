#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use extendo_blackiya::*;
use extendo_core_models::{ConversationPayload, PersistedConversationHashEntry, TriggerReason};
use extendo_storage::{ExtensionSettings, StoreError};
use serde_json::{json, Value};
use tokio::sync::Notify;

#[derive(Default)]
pub struct RecordingSettings {
    pub extension_id: Mutex<String>,
    pub api_instance: Mutex<String>,
    pub hashes: Mutex<Vec<PersistedConversationHashEntry>>,
    pub hash_reads: Mutex<usize>,
    pub failing_hash_reads: Mutex<usize>,
    pub saved_snapshots: Mutex<Vec<Vec<PersistedConversationHashEntry>>>,
    /// Stalls the next hash-cache write until notified.
    pub save_gate: Mutex<Option<Arc<Notify>>>,
}

impl RecordingSettings {
    pub fn with_peer(peer_id: &str) -> Arc<Self> {
        let settings = Self::default();
        *settings.extension_id.lock().unwrap() = peer_id.to_string();
        Arc::new(settings)
    }

    pub fn hash_reads(&self) -> usize {
        *self.hash_reads.lock().unwrap()
    }
}

#[async_trait]
impl ExtensionSettings for RecordingSettings {
    async fn translations_api_instance(&self) -> Result<String, StoreError> {
        Ok(self.api_instance.lock().unwrap().clone())
    }

    async fn blackiya_extension_id(&self) -> Result<String, StoreError> {
        Ok(self.extension_id.lock().unwrap().clone())
    }

    async fn saved_conversation_hashes(
        &self,
    ) -> Result<Vec<PersistedConversationHashEntry>, StoreError> {
        *self.hash_reads.lock().unwrap() += 1;
        let mut failing = self.failing_hash_reads.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(StoreError::Io("disk unavailable".into()));
        }
        Ok(self.hashes.lock().unwrap().clone())
    }

    async fn save_conversation_hashes(
        &self,
        entries: &[PersistedConversationHashEntry],
    ) -> Result<(), StoreError> {
        let gate = self.save_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        *self.hashes.lock().unwrap() = entries.to_vec();
        self.saved_snapshots.lock().unwrap().push(entries.to_vec());
        Ok(())
    }
}

/// Records `connect:{reason}` / `reconcile:{reason}` calls.
#[derive(Default)]
pub struct RecordingTransport {
    pub calls: Mutex<Vec<String>>,
    pub refuse_connect: Mutex<bool>,
    pub gate: Option<Arc<Notify>>,
    pub closers: Mutex<Vec<LinkCloser>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|entry| *entry == call).count()
    }

    pub fn refuse(&self, refuse: bool) {
        *self.refuse_connect.lock().unwrap() = refuse;
    }

    pub fn close_latest(&self, error: Option<&str>) {
        let closer = self.closers.lock().unwrap().pop().expect("open link");
        closer.close(error.map(str::to_string));
    }
}

#[async_trait]
impl SyncTransport for RecordingTransport {
    async fn connect(&self, _peer_id: &str, reason: TriggerReason) -> Option<SyncLink> {
        self.calls.lock().unwrap().push(format!("connect:{reason}"));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if *self.refuse_connect.lock().unwrap() {
            return None;
        }
        let (link, closer) = SyncLink::pair(format!("port-{reason}"));
        self.closers.lock().unwrap().push(closer);
        Some(link)
    }

    async fn reconcile(&self, _peer_id: &str, reason: TriggerReason) {
        self.calls.lock().unwrap().push(format!("reconcile:{reason}"));
    }
}

pub struct ScheduledTimer {
    pub id: TimerId,
    pub delay: Duration,
    pub task: Option<TimerTask>,
}

/// Scheduler that only records; tests fire timers by hand.
#[derive(Default)]
pub struct ManualScheduler {
    pub alarms: Mutex<Vec<(String, u32)>>,
    pub timers: Mutex<Vec<ScheduledTimer>>,
    pub cleared: Mutex<HashSet<TimerId>>,
    next_id: Mutex<u64>,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scheduled(&self) -> usize {
        self.timers.lock().unwrap().len()
    }

    pub fn live(&self) -> usize {
        let cleared = self.cleared.lock().unwrap();
        self.timers
            .lock()
            .unwrap()
            .iter()
            .filter(|timer| timer.task.is_some() && !cleared.contains(&timer.id))
            .count()
    }

    /// Takes the most recent timer that has not been cleared or fired.
    pub fn take_live(&self) -> Option<TimerTask> {
        let cleared = self.cleared.lock().unwrap().clone();
        let mut timers = self.timers.lock().unwrap();
        timers
            .iter_mut()
            .rev()
            .find(|timer| !cleared.contains(&timer.id) && timer.task.is_some())
            .and_then(|timer| timer.task.take())
    }

    pub async fn fire_live(&self) {
        let task = self.take_live().expect("a live timer");
        task.await;
    }
}

impl SyncScheduler for ManualScheduler {
    fn create_alarm(&self, name: &str, period_minutes: u32) {
        self.alarms
            .lock()
            .unwrap()
            .push((name.to_string(), period_minutes));
    }

    fn set_timer(&self, delay: Duration, task: TimerTask) -> TimerId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = TimerId(*next);
        self.timers.lock().unwrap().push(ScheduledTimer {
            id,
            delay,
            task: Some(task),
        });
        id
    }

    fn clear_timer(&self, id: TimerId) {
        self.cleared.lock().unwrap().insert(id);
    }
}

/// Sink that records saves and can be told to fail or stall.
#[derive(Default)]
pub struct RecordingSink {
    pub saved: Mutex<Vec<(String, ConversationPayload)>>,
    pub fail: Mutex<bool>,
    pub gate: Option<Arc<Notify>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Self::default()
        })
    }

    pub fn saves(&self) -> usize {
        self.saved.lock().unwrap().len()
    }
}

#[async_trait]
impl ConversationSink for RecordingSink {
    async fn save_conversation(
        &self,
        payload: &ConversationPayload,
        conversation_id: &str,
    ) -> Result<(), PersistenceError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if *self.fail.lock().unwrap() {
            return Err(PersistenceError::Transport {
                endpoint: "http://translations.test".into(),
                cause: "connection refused".into(),
            });
        }
        self.saved
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), payload.clone()));
        Ok(())
    }
}

pub fn ready_payload(answer: &str) -> ConversationPayload {
    payload(json!({
        "title": "Hadith grading",
        "mapping": {
            "u1": {"message": {"author": {"role": "user"}, "content": {"parts": ["Grade this narration"]}}},
            "a1": {"message": {"author": {"role": "assistant"}, "content": {"parts": [answer]}}},
        }
    }))
}

pub fn user_only_payload() -> ConversationPayload {
    payload(json!({
        "title": "Draft",
        "mapping": {
            "u1": {"message": {"author": {"role": "user"}, "content": {"parts": ["Hello?"]}}},
        }
    }))
}

pub fn payload(value: Value) -> ConversationPayload {
    value.as_object().cloned().expect("object payload")
}

/// Lets spawned tasks on the current-thread runtime run to their next await.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
