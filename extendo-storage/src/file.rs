use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::StoreError;
use crate::store::KeyValueStore;

/// Key-value store backed by a single JSON object document on disk.
///
/// Every mutation rewrites the whole document to a sibling temp file and
/// renames it over the original, so readers never observe a torn write.
pub struct JsonFileStore {
    path: PathBuf,
    document: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(StoreError::Corrupt(format!(
                        "{} does not hold a JSON object",
                        path.display()
                    )))
                }
                Err(err) => return Err(StoreError::Corrupt(format!("{}: {err}", path.display()))),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), keys = document.len(), "opened json store");
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.document.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut document = self.document.lock().await;
        let previous = document.insert(key.to_string(), value);
        if let Err(err) = self.flush(&document).await {
            // Keep memory in line with what is on disk.
            match previous {
                Some(previous) => document.insert(key.to_string(), previous),
                None => document.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut document = self.document.lock().await;
        let Some(previous) = document.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.flush(&document).await {
            document.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }
}
