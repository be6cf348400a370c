//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use saga::CallPolicy;

/// Default listen port of the resource owner.
pub const RESOURCE_OWNER_PORT: u16 = 3001;

/// Default listen port of the booking orchestrator.
pub const BOOKING_PORT: u16 = 3000;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default depends on the binary)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL connection string; in-memory stores when unset
/// - `RESOURCE_OWNER_URL`: base URL of the resource owner (default: `"http://localhost:3001"`)
/// - `RESOURCE_OWNER_TIMEOUT_MS`: per-call timeout (default: `3000`)
/// - `RESOURCE_OWNER_RETRIES`: retries after the first attempt (default: `3`)
/// - `RESOURCE_OWNER_BACKOFF_MS`: pause between attempts (default: `300`)
///
/// Values that fail to parse fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub resource_owner_url: String,
    pub resource_owner_timeout_ms: u64,
    pub resource_owner_retries: usize,
    pub resource_owner_backoff_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env(default_port: u16) -> Self {
        Self::from_lookup(default_port, |key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(default_port: u16, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::with_port(default_port);

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            resource_owner_url: lookup("RESOURCE_OWNER_URL").unwrap_or(defaults.resource_owner_url),
            resource_owner_timeout_ms: parsed(&lookup, "RESOURCE_OWNER_TIMEOUT_MS")
                .unwrap_or(defaults.resource_owner_timeout_ms),
            resource_owner_retries: parsed(&lookup, "RESOURCE_OWNER_RETRIES")
                .unwrap_or(defaults.resource_owner_retries),
            resource_owner_backoff_ms: parsed(&lookup, "RESOURCE_OWNER_BACKOFF_MS")
                .unwrap_or(defaults.resource_owner_backoff_ms),
        }
    }

    fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Outbound call policy for the resource owner client.
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(
            Duration::from_millis(self.resource_owner_timeout_ms),
            self.resource_owner_retries,
            Duration::from_millis(self.resource_owner_backoff_ms),
        )
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: BOOKING_PORT,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            resource_owner_url: "http://localhost:3001".to_string(),
            resource_owner_timeout_ms: 3000,
            resource_owner_retries: 3,
            resource_owner_backoff_ms: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serial_test::serial;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(RESOURCE_OWNER_PORT, |_| None);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.resource_owner_url, "http://localhost:3001");
        assert_eq!(config.call_policy(), CallPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(
            BOOKING_PORT,
            lookup_from(&[
                ("PORT", "8080"),
                ("LOG_FORMAT", "JSON"),
                ("DATABASE_URL", "postgres://localhost/bookings"),
                ("RESOURCE_OWNER_URL", "http://hotel:3001"),
                ("RESOURCE_OWNER_TIMEOUT_MS", "250"),
                ("RESOURCE_OWNER_RETRIES", "0"),
                ("RESOURCE_OWNER_BACKOFF_MS", "5"),
            ]),
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/bookings"));
        assert_eq!(config.resource_owner_url, "http://hotel:3001");

        let policy = config.call_policy();
        assert_eq!(policy.timeout, Duration::from_millis(250));
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.backoff, Duration::from_millis(5));
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = Config::from_lookup(
            BOOKING_PORT,
            lookup_from(&[("PORT", "http"), ("RESOURCE_OWNER_RETRIES", "-1")]),
        );
        assert_eq!(config.port, 3000);
        assert_eq!(config.resource_owner_retries, 3);
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = Config::from_lookup(BOOKING_PORT, lookup_from(&[("DATABASE_URL", "  ")]));
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            std::env::set_var("RESOURCE_OWNER_TIMEOUT_MS", "1234");
            std::env::remove_var("PORT");
        }

        let config = Config::from_env(RESOURCE_OWNER_PORT);
        assert_eq!(config.port, RESOURCE_OWNER_PORT);
        assert_eq!(config.resource_owner_timeout_ms, 1234);

        unsafe {
            std::env::remove_var("RESOURCE_OWNER_TIMEOUT_MS");
        }
    }
}
