use std::env;

use agromatch_engine::matching::MatchingConfig;
use chrono::Duration;
use log::*;

const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 2;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::seconds(5);
const DEFAULT_MAX_ATTEMPTS: i64 = 3;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// How often the consumer polls the queue when it is empty.
    pub poll_interval_seconds: u64,
    /// Base delay of the exponential retry backoff.
    pub retry_backoff: Duration,
    /// Attempts per job before it is parked as failed.
    pub max_attempts: i64,
    pub event_buffer_size: usize,
    pub matching: MatchingConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            matching: MatchingConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = agromatch_engine::sqlite::db::db_url();
        let max_connections = parse_var("AGM_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let poll_interval_seconds = parse_var("AGM_POLL_INTERVAL_SECONDS", DEFAULT_POLL_INTERVAL_SECONDS);
        let retry_backoff = Duration::seconds(parse_var(
            "AGM_RETRY_BACKOFF_SECONDS",
            DEFAULT_RETRY_BACKOFF.num_seconds(),
        ));
        let max_attempts = parse_var("AGM_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS);
        let event_buffer_size = parse_var("AGM_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let defaults = MatchingConfig::default();
        let matching = MatchingConfig {
            commission_rate: parse_var("AGM_COMMISSION_RATE", defaults.commission_rate),
            promoted_bonus: parse_var("AGM_PROMOTED_BONUS", defaults.promoted_bonus),
            batch_size: parse_var("AGM_SCORING_BATCH_SIZE", defaults.batch_size),
            table_rate_discount: parse_var("AGM_TRANSPORT_DISCOUNT", defaults.table_rate_discount),
        }
        .validated();
        Self {
            database_url,
            max_connections,
            poll_interval_seconds,
            retry_backoff,
            max_attempts,
            event_buffer_size,
            matching,
        }
    }
}

/// Reads and parses one environment variable, falling back to the given default with a log line on absence or
/// a parse failure.
fn parse_var<T>(var: &str, default: T) -> T
where T: std::str::FromStr + std::fmt::Display, T::Err: std::fmt::Display {
    match env::var(var) {
        Ok(s) => s.parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {var}. {e}. Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {var} is not set. Using the default, {default}.");
            default
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_backoff, Duration::seconds(5));
        assert_eq!(config.matching.batch_size, 10);
    }
}
