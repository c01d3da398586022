//! Deployment configuration.

use crate::{persistence::default_data_dir, RecentGames, RetryPolicy, RpcClient};
use serde::{Deserialize, Serialize};
use solsgame_types::{
    parse_pubkey, AddressError, ProgramAddresses, BALANCE_REFRESH_INTERVAL, DEFAULT_RPC_URL,
    HISTORY_RETENTION, PROGRAM_ID, RECENT_GAMES_LIMIT,
};
use std::{path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::Level;
use url::Url;

/// Configuration as read from YAML. Every field has a default.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_program_id")]
    pub program_id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for local state. The platform data directory when unset.
    #[serde(default)]
    pub data_dir: Option<String>,

    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,
    #[serde(default = "default_balance_refresh_ms")]
    pub balance_refresh_ms: u64,
    /// Simulate plays before asking the wallet to sign.
    #[serde(default = "default_preflight")]
    pub preflight: bool,

    #[serde(default = "default_history_retention")]
    pub history_retention: usize,
    #[serde(default = "default_recent_games_limit")]
    pub recent_games_limit: usize,

    #[serde(default = "default_rpc_max_attempts")]
    pub rpc_max_attempts: usize,
    #[serde(default = "default_rpc_initial_backoff_ms")]
    pub rpc_initial_backoff_ms: u64,
    #[serde(default = "default_rpc_max_backoff_ms")]
    pub rpc_max_backoff_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("{field} must be a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("{field} URL scheme must be http or https: {value}")]
    InvalidUrlScheme { field: &'static str, value: String },
    #[error("program_id is invalid: {0}")]
    InvalidProgram(#[from] AddressError),
    #[error("rpc_initial_backoff_ms ({initial}) exceeds rpc_max_backoff_ms ({max})")]
    BackoffOrder { initial: u64, max: u64 },
}

/// Validated configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub rpc_url: Url,
    pub addresses: ProgramAddresses,
    pub log_level: Level,
    pub data_dir: Option<PathBuf>,
    pub confirm_timeout: Duration,
    pub confirm_poll_interval: Duration,
    pub balance_refresh: Duration,
    pub preflight: bool,
    pub history_retention: usize,
    pub recent_games_limit: usize,
    pub retry_policy: RetryPolicy,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_program_id() -> String {
    PROGRAM_ID.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_confirm_timeout_ms() -> u64 {
    60_000
}

fn default_confirm_poll_interval_ms() -> u64 {
    500
}

fn default_balance_refresh_ms() -> u64 {
    BALANCE_REFRESH_INTERVAL.as_millis() as u64
}

fn default_preflight() -> bool {
    true
}

fn default_history_retention() -> usize {
    HISTORY_RETENTION
}

fn default_recent_games_limit() -> usize {
    RECENT_GAMES_LIMIT
}

fn default_rpc_max_attempts() -> usize {
    RetryPolicy::default().max_attempts
}

fn default_rpc_initial_backoff_ms() -> u64 {
    RetryPolicy::default().initial_backoff.as_millis() as u64
}

fn default_rpc_max_backoff_ms() -> u64 {
    RetryPolicy::default().max_backoff.as_millis() as u64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            program_id: default_program_id(),
            log_level: default_log_level(),
            data_dir: None,
            confirm_timeout_ms: default_confirm_timeout_ms(),
            confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
            balance_refresh_ms: default_balance_refresh_ms(),
            preflight: default_preflight(),
            history_retention: default_history_retention(),
            recent_games_limit: default_recent_games_limit(),
            rpc_max_attempts: default_rpc_max_attempts(),
            rpc_initial_backoff_ms: default_rpc_initial_backoff_ms(),
            rpc_max_backoff_ms: default_rpc_max_backoff_ms(),
        }
    }
}

fn ensure_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(())
}

fn validate_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(ConfigError::InvalidUrlScheme {
                field,
                value: value.to_string(),
            })
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
    Ok(url)
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn validate(self) -> Result<ClientConfig, ConfigError> {
        ensure_nonzero("confirm_timeout_ms", self.confirm_timeout_ms)?;
        ensure_nonzero("confirm_poll_interval_ms", self.confirm_poll_interval_ms)?;
        ensure_nonzero("balance_refresh_ms", self.balance_refresh_ms)?;
        ensure_nonzero("history_retention", self.history_retention as u64)?;
        ensure_nonzero("recent_games_limit", self.recent_games_limit as u64)?;
        ensure_nonzero("rpc_max_attempts", self.rpc_max_attempts as u64)?;
        if self.rpc_initial_backoff_ms > self.rpc_max_backoff_ms {
            return Err(ConfigError::BackoffOrder {
                initial: self.rpc_initial_backoff_ms,
                max: self.rpc_max_backoff_ms,
            });
        }

        let rpc_url = validate_http_url("rpc_url", &self.rpc_url)?;
        let program_id = parse_pubkey(&self.program_id)?;
        let addresses = ProgramAddresses::derive(program_id)?;
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        Ok(ClientConfig {
            rpc_url,
            addresses,
            log_level,
            data_dir: self.data_dir.map(PathBuf::from),
            confirm_timeout: Duration::from_millis(self.confirm_timeout_ms),
            confirm_poll_interval: Duration::from_millis(self.confirm_poll_interval_ms),
            balance_refresh: Duration::from_millis(self.balance_refresh_ms),
            preflight: self.preflight,
            history_retention: self.history_retention,
            recent_games_limit: self.recent_games_limit,
            retry_policy: RetryPolicy {
                max_attempts: self.rpc_max_attempts,
                initial_backoff: Duration::from_millis(self.rpc_initial_backoff_ms),
                max_backoff: Duration::from_millis(self.rpc_max_backoff_ms),
                retry_non_idempotent: false,
            },
        })
    }
}

impl ClientConfig {
    pub fn rpc_client(&self) -> crate::Result<RpcClient> {
        Ok(RpcClient::new(self.rpc_url.as_str())?
            .with_retry_policy(self.retry_policy.clone())
            .with_confirmation(self.confirm_poll_interval, self.confirm_timeout))
    }

    /// Local store for resolved games, `None` if no data directory is known.
    pub fn recent_games(&self) -> Option<RecentGames> {
        let dir = self.data_dir.clone().or_else(default_data_dir)?;
        Some(RecentGames::new(dir).with_limit(self.recent_games_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap().validate().unwrap();
        assert_eq!(config.rpc_url.as_str(), "https://api.devnet.solana.com/");
        assert_eq!(config.addresses, ProgramAddresses::deployed().unwrap());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.balance_refresh, Duration::from_secs(15));
        assert!(config.preflight);
        assert_eq!(config.history_retention, 100);
        assert_eq!(config.recent_games_limit, 50);
        assert!(!config.retry_policy.retry_non_idempotent);
    }

    #[test]
    fn test_overrides() {
        let yaml = r#"
rpc_url: "http://127.0.0.1:8899"
log_level: debug
data_dir: /tmp/solsgame
history_retention: 20
confirm_poll_interval_ms: 250
balance_refresh_ms: 5000
preflight: false
"#;
        let config = Config::from_yaml(yaml).unwrap().validate().unwrap();
        assert_eq!(config.rpc_url.host_str(), Some("127.0.0.1"));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.history_retention, 20);
        assert_eq!(config.confirm_poll_interval, Duration::from_millis(250));
        assert_eq!(config.balance_refresh, Duration::from_secs(5));
        assert!(!config.preflight);
        let recent = config.recent_games().unwrap();
        assert!(recent.path().starts_with("/tmp/solsgame"));
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = Config {
            rpc_url: "ws://localhost".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrlScheme { field: "rpc_url", .. })
        ));

        let config = Config {
            history_retention: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNonZero {
                field: "history_retention",
                ..
            })
        ));

        let config = Config {
            program_id: "not-a-key".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProgram(_))
        ));

        let config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel { .. })
        ));

        let config = Config {
            rpc_initial_backoff_ms: 5_000,
            rpc_max_backoff_ms: 1_000,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BackoffOrder { .. })
        ));
    }
}
