use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;

/// Durable string-keyed storage. Each call is atomic on its own; there are no
/// multi-key transactions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
