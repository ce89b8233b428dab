use std::path::PathBuf;
use std::time::Duration;

use extendo_blackiya::SyncConfig;

use crate::errors::HostError;

pub const DEFAULT_STORE_PATH: &str = "extendo-store.json";
pub const DEFAULT_PEER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;

#[derive(Clone, Debug)]
pub struct HostConfig {
    pub store_path: PathBuf,
    pub peer_timeout: Duration,
    pub http_timeout: Duration,
    /// Written through the settings store at boot when present.
    pub blackiya_extension_id: Option<String>,
    pub translations_api: Option<String>,
    pub sync: SyncConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            peer_timeout: Duration::from_millis(DEFAULT_PEER_TIMEOUT_MS),
            http_timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            blackiya_extension_id: None,
            translations_api: None,
            sync: SyncConfig::default(),
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Result<Self, HostError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, HostError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            sync: SyncConfig::from_lookup(&lookup)?,
            ..Self::default()
        };
        if let Some(path) = non_empty(&lookup, "EXTENDO_STORE_PATH") {
            config.store_path = PathBuf::from(path);
        }
        if let Some(timeout) = millis_var(&lookup, "EXTENDO_PEER_TIMEOUT_MS")? {
            config.peer_timeout = timeout;
        }
        if let Some(timeout) = millis_var(&lookup, "EXTENDO_HTTP_TIMEOUT_MS")? {
            config.http_timeout = timeout;
        }
        config.blackiya_extension_id = non_empty(&lookup, "EXTENDO_BLACKIYA_EXTENSION_ID");
        config.translations_api = non_empty(&lookup, "EXTENDO_TRANSLATIONS_API");
        Ok(config)
    }
}

fn non_empty<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn millis_var<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, HostError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
        _ => Err(HostError::InvalidEnv { var, value: raw }),
    }
}
