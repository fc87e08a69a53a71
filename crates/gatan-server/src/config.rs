//! Environment-driven configuration for the relay server and its peers.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_PLAYERS: usize = 4;
pub const DEFAULT_DISCONNECT_GRACE_SECS: u64 = 300;
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8080";
pub const DEFAULT_AUTO_ROLL_DELAY_MS: u64 = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

/// Relay server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Seats per room, clamped to 2..=4
    pub max_players: usize,
    /// How long a disconnected player keeps their seat
    pub disconnect_grace: Duration,
}

impl ServerConfig {
    /// Read `SERVER_ADDR`, `GATAN_MAX_PLAYERS` and
    /// `GATAN_DISCONNECT_GRACE_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_players: usize = parse_var(&lookup, "GATAN_MAX_PLAYERS", DEFAULT_MAX_PLAYERS)?;
        Ok(Self {
            addr: parse_var(&lookup, "SERVER_ADDR", defaults.addr)?,
            max_players: max_players.clamp(2, 4),
            disconnect_grace: Duration::from_secs(parse_var(
                &lookup,
                "GATAN_DISCONNECT_GRACE_SECS",
                DEFAULT_DISCONNECT_GRACE_SECS,
            )?),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_players: DEFAULT_MAX_PLAYERS,
            disconnect_grace: Duration::from_secs(DEFAULT_DISCONNECT_GRACE_SECS),
        }
    }
}

/// Client-side settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    pub server_url: String,
    /// Delay before a scheduled automatic roll fires
    pub auto_roll_delay: Duration,
}

impl PeerConfig {
    /// Read `GATAN_SERVER_URL` and `GATAN_AUTO_ROLL_DELAY_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            server_url: lookup("GATAN_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            auto_roll_delay: Duration::from_millis(parse_var(
                &lookup,
                "GATAN_AUTO_ROLL_DELAY_MS",
                DEFAULT_AUTO_ROLL_DELAY_MS,
            )?),
        })
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            auto_roll_delay: Duration::from_millis(DEFAULT_AUTO_ROLL_DELAY_MS),
        }
    }
}
