use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// On-disk/CLI configuration for one shard of the accounting authority.
/// Loaded once at startup (`Config::load`) and handed by
/// reference into the engine, the flusher, and the scanner loop. No
/// process-wide mutable singleton.
///
/// Every field has a default matching suggested policy value
/// where one is given; `toml`-file values override the defaults, and the
/// handful of infrastructure endpoints (`database_url`, `amqp_url`,
/// `fetch_base_url`) have no sensible default and must come from the file
/// or the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub amqp_url: String,
    pub fetch_base_url: String,

    pub database_max_connections: u32,
    pub fetch_cache_ttl_seconds: u64,

    /// Concurrent in-flight messages per shard.
    pub prefetch: usize,
    /// Outbox flusher batch size and poll interval.
    pub outbox_batch_size: i64,
    pub outbox_poll_interval_seconds: u64,

    /// Which accounts this node owns: this shard handles `(debtor_id, creditor_id)`
    /// pairs whose top bits of `shard_key` equal `shard_key_prefix` after
    /// masking with `shard_key_mask`.
    pub shard_key_mask: u32,
    pub shard_key_prefix: u32,

    pub min_interest_rate_allowed: f64,
    pub max_interest_rate_allowed: f64,
    pub heartbeat_interval_seconds: u64,
    pub finalization_reminder_interval_seconds: u64,
    pub minimum_account_lifetime_seconds: u64,
    pub stale_config_horizon_seconds: u64,
    /// `None` (the default) disables `RegisteredBalanceChange` GC.
    pub registered_balance_change_retention_seconds: Option<u64>,
    pub account_ttl_seconds: u64,
    pub commit_period_seconds: u64,
    pub demurrage_rate: f64,
    pub interest_capitalization_threshold: f64,
    pub scanner_batch_size: i64,
    /// How often the scanner loop sweeps all four periodic jobs.
    pub scanner_interval_seconds: u64,

    /// `"json"` or `"compact"`, the `tracing-subscriber` formatter used.
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            amqp_url: String::new(),
            fetch_base_url: String::new(),
            database_max_connections: 10,
            fetch_cache_ttl_seconds: 30,
            prefetch: 32,
            outbox_batch_size: 100,
            outbox_poll_interval_seconds: 1,
            shard_key_mask: 0,
            shard_key_prefix: 0,
            min_interest_rate_allowed: accounts_constants::MIN_INTEREST_RATE_ALLOWED,
            max_interest_rate_allowed: accounts_constants::MAX_INTEREST_RATE_ALLOWED,
            heartbeat_interval_seconds: accounts_constants::DEFAULT_HEARTBEAT_INTERVAL.as_secs(),
            finalization_reminder_interval_seconds: accounts_constants::DEFAULT_FINALIZATION_REMINDER_INTERVAL
                .as_secs(),
            minimum_account_lifetime_seconds: accounts_constants::DEFAULT_MINIMUM_ACCOUNT_LIFETIME.as_secs(),
            stale_config_horizon_seconds: accounts_constants::DEFAULT_STALE_CONFIG_HORIZON.as_secs(),
            registered_balance_change_retention_seconds: None,
            account_ttl_seconds: accounts_constants::DEFAULT_ACCOUNT_TTL.as_secs(),
            commit_period_seconds: accounts_constants::DEFAULT_COMMIT_PERIOD.as_secs(),
            demurrage_rate: accounts_constants::DEFAULT_DEMURRAGE_RATE,
            interest_capitalization_threshold: accounts_constants::DEFAULT_INTEREST_CAPITALIZATION_THRESHOLD,
            scanner_batch_size: accounts_constants::DEFAULT_SCANNER_BATCH_SIZE,
            scanner_interval_seconds: 3600,
            log_format: "compact".to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Loads defaults, then overlays the TOML file at `path` if one was
    /// given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    pub fn finalization_reminder_interval(&self) -> Duration {
        Duration::from_secs(self.finalization_reminder_interval_seconds)
    }

    pub fn minimum_account_lifetime(&self) -> Duration {
        Duration::from_secs(self.minimum_account_lifetime_seconds)
    }

    pub fn stale_config_horizon(&self) -> Duration {
        Duration::from_secs(self.stale_config_horizon_seconds)
    }

    pub fn registered_balance_change_retention(&self) -> Option<Duration> {
        self.registered_balance_change_retention_seconds.map(Duration::from_secs)
    }

    pub fn account_ttl(&self) -> Duration {
        Duration::from_secs(self.account_ttl_seconds)
    }

    pub fn commit_period(&self) -> Duration {
        Duration::from_secs(self.commit_period_seconds)
    }

    pub fn to_policy(&self) -> accounts_ledger::Policy {
        accounts_ledger::Policy {
            min_interest_rate_allowed: self.min_interest_rate_allowed,
            max_interest_rate_allowed: self.max_interest_rate_allowed,
            heartbeat_interval: self.heartbeat_interval(),
            finalization_reminder_interval: self.finalization_reminder_interval(),
            minimum_account_lifetime: self.minimum_account_lifetime(),
            stale_config_horizon: self.stale_config_horizon(),
            registered_balance_change_retention: self.registered_balance_change_retention(),
            account_ttl: self.account_ttl(),
            commit_period: self.commit_period(),
            demurrage_rate: self.demurrage_rate,
            interest_capitalization_threshold: self.interest_capitalization_threshold,
            scanner_batch_size: self.scanner_batch_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_defaults() {
        let config = Config::default();
        assert_eq!(config.to_policy(), accounts_ledger::Policy::default());
    }

    #[test]
    fn missing_path_yields_defaults() {
        assert_eq!(Config::load(None).unwrap().log_format, "compact");
    }

    #[test]
    fn parses_a_minimal_toml_file() {
        let dir = std::env::temp_dir().join(format!("accounts-server-test-{:p}", &dir_marker()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
            database_url = "postgres://localhost/accounts"
            amqp_url = "amqp://localhost"
            fetch_base_url = "http://localhost:8080"
            shard_key_prefix = 7
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/accounts");
        assert_eq!(config.shard_key_prefix, 7);
        assert_eq!(config.prefetch, 32, "unset fields keep their defaults");

        std::fs::remove_dir_all(&dir).ok();
    }

    fn dir_marker() -> u8 {
        0
    }
}
