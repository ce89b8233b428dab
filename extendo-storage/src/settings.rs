use std::sync::Arc;

use async_trait::async_trait;
use extendo_core_models::PersistedConversationHashEntry;
use serde_json::Value;
use tracing::warn;

use crate::errors::StoreError;
use crate::store::KeyValueStore;

pub const TRANSLATIONS_API_INSTANCE_KEY: &str = "translations_api_instance";
pub const BLACKIYA_EXTENSION_ID_KEY: &str = "blackiya_extension_id";
pub const BLACKIYA_SAVED_CONVERSATION_HASHES_KEY: &str = "blackiya_saved_conversation_hashes";

/// Settings the background services read at call time. An empty string means
/// "not configured".
#[async_trait]
pub trait ExtensionSettings: Send + Sync {
    async fn translations_api_instance(&self) -> Result<String, StoreError>;
    async fn blackiya_extension_id(&self) -> Result<String, StoreError>;
    async fn saved_conversation_hashes(
        &self,
    ) -> Result<Vec<PersistedConversationHashEntry>, StoreError>;
    async fn save_conversation_hashes(
        &self,
        entries: &[PersistedConversationHashEntry],
    ) -> Result<(), StoreError>;
}

pub fn normalize_api_instance(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

pub fn normalize_extension_id(value: &str) -> String {
    value.trim().to_string()
}

#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn save_translations_api_instance(&self, value: &str) -> Result<(), StoreError> {
        self.store
            .set(
                TRANSLATIONS_API_INSTANCE_KEY,
                Value::String(normalize_api_instance(value)),
            )
            .await
    }

    pub async fn save_blackiya_extension_id(&self, value: &str) -> Result<(), StoreError> {
        self.store
            .set(
                BLACKIYA_EXTENSION_ID_KEY,
                Value::String(normalize_extension_id(value)),
            )
            .await
    }

    pub async fn clear_blackiya_extension_id(&self) -> Result<(), StoreError> {
        self.store.remove(BLACKIYA_EXTENSION_ID_KEY).await
    }

    async fn string_value(&self, key: &str) -> Result<String, StoreError> {
        Ok(match self.store.get(key).await? {
            Some(Value::String(value)) => value,
            _ => String::new(),
        })
    }
}

#[async_trait]
impl ExtensionSettings for SettingsStore {
    async fn translations_api_instance(&self) -> Result<String, StoreError> {
        self.string_value(TRANSLATIONS_API_INSTANCE_KEY).await
    }

    async fn blackiya_extension_id(&self) -> Result<String, StoreError> {
        self.string_value(BLACKIYA_EXTENSION_ID_KEY).await
    }

    async fn saved_conversation_hashes(
        &self,
    ) -> Result<Vec<PersistedConversationHashEntry>, StoreError> {
        let stored = self.store.get(BLACKIYA_SAVED_CONVERSATION_HASHES_KEY).await?;
        Ok(stored.map(parse_hash_entries).unwrap_or_default())
    }

    async fn save_conversation_hashes(
        &self,
        entries: &[PersistedConversationHashEntry],
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(entries)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        self.store
            .set(BLACKIYA_SAVED_CONVERSATION_HASHES_KEY, value)
            .await
    }
}

/// Keeps every well-formed `[conversationId, hash]` pair and drops the rest.
fn parse_hash_entries(value: Value) -> Vec<PersistedConversationHashEntry> {
    let Value::Array(items) = value else {
        warn!("persisted hash cache is not an array; ignoring");
        return Vec::new();
    };

    let total = items.len();
    let entries: Vec<_> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Array(pair) => match pair.as_slice() {
                [Value::String(conversation_id), Value::String(hash)] => {
                    Some((conversation_id.clone(), hash.clone()))
                }
                _ => None,
            },
            _ => None,
        })
        .collect();

    if entries.len() != total {
        warn!(
            dropped = total - entries.len(),
            "dropped malformed persisted hash entries"
        );
    }
    entries
}
