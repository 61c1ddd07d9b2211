//! Environment-driven server configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sketchroom_room::RoomConfig;

/// A setting in the environment could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Settings for the `sketchroom` binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Template for every new room.
    pub room: RoomConfig,
    /// Directory of `<category>.txt` word lists; built-in lists if unset.
    pub words_dir: Option<PathBuf>,
    /// How long a connection may stay silent before it is dropped.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            room: RoomConfig::default(),
            words_dir: None,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    /// Reads `SKETCHROOM_*` variables, falling back to defaults for any
    /// that are unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut room = defaults.room.clone();
        room.settings.round_duration_secs = parse_or(
            &lookup,
            "SKETCHROOM_ROUND_SECONDS",
            room.settings.round_duration_secs,
        )?;
        room.settings.max_rounds = parse_or(&lookup, "SKETCHROOM_MAX_ROUNDS", room.settings.max_rounds)?;
        room.max_players = parse_or(&lookup, "SKETCHROOM_MAX_PLAYERS", room.max_players)?;

        Ok(Self {
            host: lookup("SKETCHROOM_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "SKETCHROOM_PORT", defaults.port)?,
            room: room.validated(),
            words_dir: lookup("SKETCHROOM_WORDS_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            idle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SKETCHROOM_IDLE_TIMEOUT_SECONDS",
                defaults.idle_timeout.as_secs(),
            )?),
        })
    }

    /// `host:port`, ready for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}
