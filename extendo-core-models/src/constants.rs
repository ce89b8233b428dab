/// Version tag carried by every Blackiya request, response and event.
pub const BLACKIYA_API_VERSION: &str = "blackiya.events.v1";
/// Name of the long-lived port the peer streams conversation events on.
pub const BLACKIYA_EVENTS_PORT_NAME: &str = BLACKIYA_API_VERSION;

pub const BLACKIYA_CONNECT_RETRY_MS: u64 = 3_000;
pub const BLACKIYA_SYNC_HEARTBEAT_ALARM: &str = "BLACKIYA_SYNC_HEARTBEAT";
pub const BLACKIYA_SYNC_HEARTBEAT_MINUTES: u32 = 1;
pub const MAX_SEEN_EVENT_IDS: usize = 200;
pub const MAX_SAVED_BLACKIYA_HASHES: usize = 200;

pub const TRANSLATIONS_API_PATH: &str = "/translations";
pub const COMPILATION_API_PATH: &str = "/compilation/excerpts/shift";

/// Prefix the peer uses when it re-delivers a previously pulled conversation.
pub const REPLAY_EVENT_ID_PREFIX: &str = "replay:";
/// Prefix of event ids synthesized from a `conversation.getLatest` pull.
pub const PULL_EVENT_ID_PREFIX: &str = "pull:";

pub const HEALTH_PING_TYPE: &str = "health.ping";
pub const GET_LATEST_TYPE: &str = "conversation.getLatest";
pub const ORIGINAL_FORMAT: &str = "original";
