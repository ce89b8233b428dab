//! Idempotence helpers shared by push and pull processing.
//!
//! Both bounded containers evict by insertion order (FIFO), never by access.

use std::collections::{BTreeMap, HashMap, HashSet};

use extendo_core_models::{ConversationPayload, PersistedConversationHashEntry};
use serde_json::Value;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Map keyed by string that remembers the order keys were first inserted.
#[derive(Clone, Debug)]
pub struct InsertionOrdered<V> {
    entries: HashMap<String, (u64, V)>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl<V> Default for InsertionOrdered<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<V> InsertionOrdered<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|(_, value)| value)
    }

    /// Inserts or overwrites. An existing key keeps its position.
    pub fn insert(&mut self, key: String, value: V) {
        if let Some((_, slot)) = self.entries.get_mut(&key) {
            *slot = value;
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.entries.insert(key, (seq, value));
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let (seq, value) = self.entries.remove(key)?;
        self.order.remove(&seq);
        Some(value)
    }

    pub fn pop_oldest(&mut self) -> Option<(String, V)> {
        let (_, key) = self.order.pop_first()?;
        let (_, value) = self.entries.remove(&key)?;
        Some((key, value))
    }

    /// Iterates oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.order.values().filter_map(move |key| {
            self.entries
                .get(key)
                .map(|(_, value)| (key.as_str(), value))
        })
    }

    fn evict_to(&mut self, max_size: usize) {
        while self.entries.len() > max_size {
            if self.pop_oldest().is_none() {
                break;
            }
        }
    }
}

pub type SeenEventIds = InsertionOrdered<()>;
pub type SavedHashes = InsertionOrdered<String>;

/// Deterministic JSON text: object keys sorted, arrays in order, `null` for
/// absent values.
pub fn stable_serialize(value: &Value) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    write_stable(value, &mut out)?;
    Ok(out)
}

fn write_stable(value: &Value, out: &mut String) -> Result<(), serde_json::Error> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_stable(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (index, key) in keys.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_stable(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

/// 32-bit FNV-1a over the UTF-16 code units of the stable serialization,
/// rendered as an unsigned decimal string.
pub fn hash_payload(payload: &ConversationPayload) -> Result<String, serde_json::Error> {
    let mut serialized = String::new();
    write_stable(&Value::Object(payload.clone()), &mut serialized)?;
    Ok(fnv1a_utf16(&serialized).to_string())
}

fn fnv1a_utf16(text: &str) -> u32 {
    text.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

pub fn fingerprint_key(conversation_id: &str, payload_hash: &str) -> String {
    format!("{conversation_id}:{payload_hash}")
}

/// Check-and-set: `true` if the key was absent and is now held.
pub fn reserve(keys: &mut HashSet<String>, key: &str) -> bool {
    if keys.contains(key) {
        return false;
    }
    keys.insert(key.to_string())
}

pub fn release(keys: &mut HashSet<String>, key: &str) {
    keys.remove(key);
}

/// `true` the first time an id is seen.
pub fn remember_event_id(seen: &mut SeenEventIds, event_id: &str, max_size: usize) -> bool {
    if seen.contains(event_id) {
        return false;
    }
    seen.insert(event_id.to_string(), ());
    seen.evict_to(max_size);
    true
}

pub fn is_hash_duplicate(saved: &SavedHashes, conversation_id: &str, payload_hash: &str) -> bool {
    saved
        .get(conversation_id)
        .is_some_and(|hash| hash == payload_hash)
}

/// Records the hash as the newest entry, evicting the oldest conversation when
/// the bound is exceeded.
pub fn remember_hash(
    saved: &mut SavedHashes,
    conversation_id: &str,
    payload_hash: &str,
    max_size: usize,
) {
    saved.remove(conversation_id);
    saved.insert(conversation_id.to_string(), payload_hash.to_string());
    saved.evict_to(max_size);
}

pub fn to_entries(saved: &SavedHashes) -> Vec<PersistedConversationHashEntry> {
    saved
        .iter()
        .map(|(conversation_id, hash)| (conversation_id.to_string(), hash.clone()))
        .collect()
}

pub fn from_entries(entries: &[PersistedConversationHashEntry], max_size: usize) -> SavedHashes {
    let mut saved = SavedHashes::new();
    for (conversation_id, hash) in entries {
        saved.insert(conversation_id.clone(), hash.clone());
    }
    saved.evict_to(max_size);
    saved
}
