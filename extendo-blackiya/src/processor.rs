use std::sync::Arc;

use extendo_core_models::{ConversationEvent, EventSource};
use extendo_storage::ExtensionSettings;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::dedupe::{hash_payload, remember_event_id, remember_hash, to_entries};
use crate::persistence::ConversationSink;
use crate::quality::{evaluate_quality, is_canonical_capture_meta};
use crate::state::{Admission, InFlightReservation, SharedSyncState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    UnsupportedType,
    NonCanonical,
    QualityGate,
    DuplicateEventId,
    HashFailed,
    DuplicateHash,
    InFlight,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnsupportedType => "unsupported_type",
            SkipReason::NonCanonical => "non_canonical",
            SkipReason::QualityGate => "quality_gate",
            SkipReason::DuplicateEventId => "duplicate_event_id",
            SkipReason::HashFailed => "hash_failed",
            SkipReason::DuplicateHash => "duplicate_hash",
            SkipReason::InFlight => "in_flight",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    Persisted { payload_hash: String },
    Skipped(SkipReason),
    PersistFailed,
}

/// Runs one event through type, provenance, quality, event-id, hash and
/// in-flight checks, then persists it.
#[derive(Clone)]
pub struct EventProcessor {
    state: SharedSyncState,
    sink: Arc<dyn ConversationSink>,
    settings: Arc<dyn ExtensionSettings>,
    /// Snapshots of the hash cache are written in the order they are taken.
    cache_writes: Arc<Mutex<()>>,
    max_seen_event_ids: usize,
    max_saved_payload_hashes: usize,
}

impl EventProcessor {
    pub fn new(
        state: SharedSyncState,
        sink: Arc<dyn ConversationSink>,
        settings: Arc<dyn ExtensionSettings>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            state,
            sink,
            settings,
            cache_writes: Arc::new(Mutex::new(())),
            max_seen_event_ids: config.max_seen_event_ids,
            max_saved_payload_hashes: config.max_saved_payload_hashes,
        }
    }

    pub fn state(&self) -> &SharedSyncState {
        &self.state
    }

    pub async fn process(&self, event: &ConversationEvent, source: EventSource) -> ProcessOutcome {
        let event_id = event.event_id.as_str();
        let conversation_id = event.conversation_id.as_str();

        if !event.event_type.is_conversation() {
            info!(event_id, conversation_id, %source, event_type = event.event_type.as_str(), "skipping unsupported event type");
            return ProcessOutcome::Skipped(SkipReason::UnsupportedType);
        }

        if !is_canonical_capture_meta(event) {
            info!(event_id, conversation_id, %source, capture_meta = ?event.capture_meta, "skipping non-canonical payload");
            return ProcessOutcome::Skipped(SkipReason::NonCanonical);
        }

        let quality = evaluate_quality(&event.payload);
        if !quality.ready_for_persist {
            // The id still counts as seen so a redelivery is dropped early.
            remember_event_id(
                &mut self.state.lock().seen_event_ids,
                event_id,
                self.max_seen_event_ids,
            );
            info!(
                event_id,
                conversation_id,
                %source,
                has_user_prompt = quality.has_user_prompt,
                has_assistant_text = quality.has_assistant_text,
                generic_title = quality.generic_title,
                title = %quality.title,
                "skipping payload due to quality gate"
            );
            return ProcessOutcome::Skipped(SkipReason::QualityGate);
        }
        if quality.generic_title {
            info!(event_id, conversation_id, %source, title = %quality.title, "accepting payload with generic title");
        }

        let first_sighting = remember_event_id(
            &mut self.state.lock().seen_event_ids,
            event_id,
            self.max_seen_event_ids,
        );
        if !first_sighting {
            info!(event_id, conversation_id, %source, "skipping duplicate event id");
            return ProcessOutcome::Skipped(SkipReason::DuplicateEventId);
        }

        let payload_hash = match hash_payload(&event.payload) {
            Ok(hash) => hash,
            Err(err) => {
                error!(event_id, conversation_id, %source, error = %err, "failed to hash payload for dedupe");
                return ProcessOutcome::Skipped(SkipReason::HashFailed);
            }
        };

        let _reservation = match InFlightReservation::admit(&self.state, conversation_id, &payload_hash) {
            Admission::Reserved(reservation) => reservation,
            Admission::AlreadySaved => {
                info!(event_id, conversation_id, %source, %payload_hash, "payload skipped by hash dedupe");
                return ProcessOutcome::Skipped(SkipReason::DuplicateHash);
            }
            Admission::InFlight => {
                info!(event_id, conversation_id, %source, %payload_hash, "payload skipped by in-flight dedupe");
                return ProcessOutcome::Skipped(SkipReason::InFlight);
            }
        };

        info!(
            event_id,
            conversation_id,
            %source,
            %payload_hash,
            event_type = event.event_type.as_str(),
            payload_keys = event.payload.len(),
            "persisting conversation event"
        );
        if let Err(err) = self.sink.save_conversation(&event.payload, conversation_id).await {
            error!(conversation_id, error = %err, "failed to save conversation payload");
            return ProcessOutcome::PersistFailed;
        }

        let _write_turn = self.cache_writes.lock().await;
        let entries = {
            let mut state = self.state.lock();
            remember_hash(
                &mut state.last_saved_hash_by_conversation_id,
                conversation_id,
                &payload_hash,
                self.max_saved_payload_hashes,
            );
            to_entries(&state.last_saved_hash_by_conversation_id)
        };
        if let Err(err) = self.settings.save_conversation_hashes(&entries).await {
            warn!(error = %err, "failed to persist saved hash cache");
        }

        ProcessOutcome::Persisted { payload_hash }
    }
}
