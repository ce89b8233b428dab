use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dedupe::{
    fingerprint_key, is_hash_duplicate, release, reserve, SavedHashes, SeenEventIds,
};

/// Dedupe state shared by the push listener, reconciliation and the manager.
#[derive(Debug, Default)]
pub struct SyncState {
    pub seen_event_ids: SeenEventIds,
    pub last_saved_hash_by_conversation_id: SavedHashes,
    pub in_flight_payload_keys: HashSet<String>,
}

/// Guards are only held for synchronous bookkeeping, never across an await.
#[derive(Clone, Debug, Default)]
pub struct SharedSyncState {
    inner: Arc<Mutex<SyncState>>,
}

impl SharedSyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of asking to persist one conversation payload.
pub enum Admission {
    /// The same hash was already saved for this conversation.
    AlreadySaved,
    /// Another task is persisting the same fingerprint.
    InFlight,
    Reserved(InFlightReservation),
}

/// Holds one in-flight fingerprint and releases it when dropped, whichever way
/// persistence ends.
#[must_use = "the reservation is released as soon as it is dropped"]
pub struct InFlightReservation {
    state: SharedSyncState,
    key: String,
}

impl InFlightReservation {
    /// Checks the saved hash and reserves the fingerprint under one lock, so
    /// no other task can save and release in between.
    pub fn admit(state: &SharedSyncState, conversation_id: &str, payload_hash: &str) -> Admission {
        let mut guard = state.lock();
        if is_hash_duplicate(
            &guard.last_saved_hash_by_conversation_id,
            conversation_id,
            payload_hash,
        ) {
            return Admission::AlreadySaved;
        }
        let key = fingerprint_key(conversation_id, payload_hash);
        if !reserve(&mut guard.in_flight_payload_keys, &key) {
            return Admission::InFlight;
        }
        drop(guard);
        Admission::Reserved(Self {
            state: state.clone(),
            key,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightReservation {
    fn drop(&mut self) {
        release(&mut self.state.lock().in_flight_payload_keys, &self.key);
    }
}
