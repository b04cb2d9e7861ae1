use thiserror::Error;

const DEFAULT_BROADCAST_CAPACITY: usize = 256;
const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Tunables read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomConfig {
    /// Pending notifications a slow connection may fall behind by before it skips ahead.
    pub broadcast_capacity: usize,
    /// Largest inbound WebSocket frame accepted.
    pub max_message_bytes: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl RoomConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            broadcast_capacity: read_usize(
                &lookup,
                "GAME_ROOM_BROADCAST_CAPACITY",
                defaults.broadcast_capacity,
            )?,
            max_message_bytes: read_usize(
                &lookup,
                "GAME_ROOM_MAX_MESSAGE_BYTES",
                defaults.max_message_bytes,
            )?,
        })
    }
}

fn read_usize(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    fallback: usize,
) -> Result<usize, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(fallback);
    };
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}
