//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::util::time::{
    DEFAULT_FPS, DEFAULT_KEY_HOLD_MS, DEFAULT_MAX_TICKS_PER_INVOCATION,
    DEFAULT_SCHEDULER_INTERVAL_MS,
};

/// Client configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Username, hashed into the registration id
    pub player_name: String,
    /// Base URL of the game server's HTTP API
    pub server_url: Url,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log file; the terminal is busy drawing the map
    pub log_file: String,

    /// Simulation ticks per second
    pub fps: u32,
    /// Catch-up bound per scheduler invocation
    pub max_ticks_per_invocation: u32,
    /// How often the scheduler is invoked
    pub scheduler_interval: Duration,
    /// Synthesized key-up timeout for terminals without release events.
    /// Keep it above the keyboard's auto-repeat delay.
    pub key_hold: Duration,

    /// First reconnect delay
    pub reconnect_base: Duration,
    /// Reconnect delay cap
    pub reconnect_max: Duration,

    /// Route player updates by user id instead of taking the first record
    pub track_peers: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let player_name = lookup("PLAYER_NAME")
            .filter(|name| !name.trim().is_empty())
            .ok_or(ConfigError::Missing("PLAYER_NAME"))?;

        let server_url = lookup("SERVER_URL").unwrap_or_else(|| "http://127.0.0.1:8000".to_string());
        let server_url = Url::parse(&server_url).map_err(|_| ConfigError::Invalid {
            var: "SERVER_URL",
            value: server_url.clone(),
        })?;

        let fps = parse_or("FPS", &lookup, DEFAULT_FPS)?;
        if !(1..=1000).contains(&fps) {
            return Err(ConfigError::Invalid {
                var: "FPS",
                value: fps.to_string(),
            });
        }

        let max_ticks_per_invocation =
            parse_or("MAX_TICKS_PER_INVOCATION", &lookup, DEFAULT_MAX_TICKS_PER_INVOCATION)?;
        if max_ticks_per_invocation == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_TICKS_PER_INVOCATION",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            player_name,
            server_url,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_file: lookup("LOG_FILE").unwrap_or_else(|| "garden_client.log".to_string()),

            fps,
            max_ticks_per_invocation,
            scheduler_interval: Duration::from_millis(
                parse_or("SCHEDULER_INTERVAL_MS", &lookup, DEFAULT_SCHEDULER_INTERVAL_MS)?.max(1),
            ),
            key_hold: Duration::from_millis(parse_or("KEY_HOLD_MS", &lookup, DEFAULT_KEY_HOLD_MS)?),

            reconnect_base: Duration::from_millis(parse_or("RECONNECT_BASE_MS", &lookup, 500)?),
            reconnect_max: Duration::from_millis(parse_or("RECONNECT_MAX_MS", &lookup, 8000)?),

            track_peers: parse_or("TRACK_PEERS", &lookup, false)?,
        })
    }
}

fn parse_or<T, F>(var: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_with_only_a_name() {
        let config = load(&[("PLAYER_NAME", "alice")]).unwrap();

        assert_eq!(config.player_name, "alice");
        assert_eq!(config.server_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.fps, 30);
        assert_eq!(config.max_ticks_per_invocation, 10);
        assert_eq!(config.scheduler_interval, Duration::from_millis(1));
        assert_eq!(config.key_hold, Duration::from_millis(500));
        assert!(!config.track_peers);
    }

    #[test]
    fn name_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("PLAYER_NAME"))));
        assert!(matches!(
            load(&[("PLAYER_NAME", "   ")]),
            Err(ConfigError::Missing("PLAYER_NAME"))
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("PLAYER_NAME", "bob"),
            ("SERVER_URL", "http://game.example:9000"),
            ("FPS", "60"),
            ("MAX_TICKS_PER_INVOCATION", "4"),
            ("TRACK_PEERS", "true"),
            ("RECONNECT_MAX_MS", "2000"),
        ])
        .unwrap();

        assert_eq!(config.server_url.port(), Some(9000));
        assert_eq!(config.fps, 60);
        assert_eq!(config.max_ticks_per_invocation, 4);
        assert!(config.track_peers);
        assert_eq!(config.reconnect_max, Duration::from_secs(2));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            load(&[("PLAYER_NAME", "a"), ("FPS", "0")]),
            Err(ConfigError::Invalid { var: "FPS", .. })
        ));
        assert!(matches!(
            load(&[("PLAYER_NAME", "a"), ("FPS", "fast")]),
            Err(ConfigError::Invalid { var: "FPS", .. })
        ));
        assert!(matches!(
            load(&[("PLAYER_NAME", "a"), ("MAX_TICKS_PER_INVOCATION", "0")]),
            Err(ConfigError::Invalid { var: "MAX_TICKS_PER_INVOCATION", .. })
        ));
        assert!(matches!(
            load(&[("PLAYER_NAME", "a"), ("SERVER_URL", "not a url")]),
            Err(ConfigError::Invalid { var: "SERVER_URL", .. })
        ));
    }
}
