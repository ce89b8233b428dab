use serde::{Deserialize, Serialize};

use extendo_core_models::{
    BLACKIYA_CONNECT_RETRY_MS, BLACKIYA_EVENTS_PORT_NAME, BLACKIYA_SYNC_HEARTBEAT_ALARM,
    BLACKIYA_SYNC_HEARTBEAT_MINUTES, MAX_SAVED_BLACKIYA_HASHES, MAX_SEEN_EVENT_IDS,
};

use crate::errors::ConfigError;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    pub heartbeat_alarm_name: String,
    pub heartbeat_period_minutes: u32,
    pub reconnect_delay_ms: u64,
    pub max_seen_event_ids: usize,
    pub max_saved_payload_hashes: usize,
    pub port_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            heartbeat_alarm_name: BLACKIYA_SYNC_HEARTBEAT_ALARM.into(),
            heartbeat_period_minutes: BLACKIYA_SYNC_HEARTBEAT_MINUTES,
            reconnect_delay_ms: BLACKIYA_CONNECT_RETRY_MS,
            max_seen_event_ids: MAX_SEEN_EVENT_IDS,
            max_saved_payload_hashes: MAX_SAVED_BLACKIYA_HASHES,
            port_name: BLACKIYA_EVENTS_PORT_NAME.into(),
        }
    }
}

impl SyncConfig {
    /// Defaults overlaid with `EXTENDO_*` environment overrides, then validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = parse_var(&lookup, "EXTENDO_HEARTBEAT_MINUTES")? {
            config.heartbeat_period_minutes = value;
        }
        if let Some(value) = parse_var(&lookup, "EXTENDO_RECONNECT_DELAY_MS")? {
            config.reconnect_delay_ms = value;
        }
        if let Some(value) = parse_var(&lookup, "EXTENDO_MAX_SEEN_EVENT_IDS")? {
            config.max_seen_event_ids = value;
        }
        if let Some(value) = parse_var(&lookup, "EXTENDO_MAX_SAVED_HASHES")? {
            config.max_saved_payload_hashes = value;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_alarm_name.trim().is_empty() {
            return Err(ConfigError::InvalidField("heartbeat_alarm_name".into()));
        }
        if self.heartbeat_period_minutes == 0 {
            return Err(ConfigError::InvalidField("heartbeat_period_minutes".into()));
        }
        if self.max_seen_event_ids == 0 {
            return Err(ConfigError::InvalidField("max_seen_event_ids".into()));
        }
        if self.max_saved_payload_hashes == 0 {
            return Err(ConfigError::InvalidField("max_saved_payload_hashes".into()));
        }
        if self.port_name.is_empty() {
            return Err(ConfigError::InvalidField("port_name".into()));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { var, value: raw })
}
