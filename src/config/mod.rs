//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::util::rate_limit::INPUT_RATE_LIMIT;
use crate::util::time::DEFAULT_TICK_INTERVAL_MS;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of the compact format
    pub log_json: bool,
    /// Optional append-only file receiving gameplay events
    pub game_log_path: Option<PathBuf>,

    /// Allowed client origin(s) for CORS, `*` for any
    pub client_origin: String,
    /// Directory served as static assets, if any
    pub static_dir: Option<PathBuf>,

    /// Fixed simulation tick interval
    pub tick_interval: Duration,
    /// Max inbound messages per second per session
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms often provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let tick_ms = parse_positive(&lookup, "TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS)?;
        let input_rate_limit =
            parse_positive(&lookup, "INPUT_RATE_LIMIT", u64::from(INPUT_RATE_LIMIT))?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: matches!(lookup("LOG_FORMAT").as_deref(), Some("json")),
            game_log_path: lookup("GAME_LOG_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),
            static_dir: lookup("STATIC_DIR")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            tick_interval: Duration::from_millis(tick_ms),
            input_rate_limit: u32::try_from(input_rate_limit)
                .map_err(|_| ConfigError::Invalid("INPUT_RATE_LIMIT"))?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_json: false,
            game_log_path: None,
            client_origin: "*".to_string(),
            static_dir: None,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            input_rate_limit: INPUT_RATE_LIMIT,
        }
    }
}

fn parse_positive<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::Invalid(key)),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
