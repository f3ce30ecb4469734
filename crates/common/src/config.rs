//! Application configuration.

use serde::Deserialize;
use validator::Validate;

use crate::AppResult;

/// Application configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Config {
    /// Database configuration.
    #[validate(nested)]
    pub database: DatabaseConfig,
    /// Poll lifecycle scheduler configuration.
    #[serde(default)]
    #[validate(nested)]
    pub scheduler: SchedulerSettings,
    /// Live results configuration.
    #[serde(default)]
    #[validate(nested)]
    pub results: ResultsSettings,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    #[validate(range(min = 1, max = 1000))]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a new connection.
    #[serde(default = "default_connect_timeout_secs")]
    #[validate(range(min = 1))]
    pub connect_timeout_secs: u64,
    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_acquire_timeout_secs")]
    #[validate(range(min = 1))]
    pub acquire_timeout_secs: u64,
    /// Seconds before an idle connection is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Seconds before any connection is recycled.
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
    /// Log every SQL statement at debug level.
    #[serde(default)]
    pub log_statements: bool,
}

/// Poll lifecycle scheduler settings.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SchedulerSettings {
    /// Whether the reconciliation loop runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between reconciliation ticks.
    #[serde(default = "default_check_interval_secs")]
    #[validate(range(min = 1, max = 86400))]
    pub check_interval_secs: u64,
    /// Look-ahead window, in minutes, for reporting upcoming changes.
    #[serde(default = "default_upcoming_window_minutes")]
    #[validate(range(min = 0, max = 10080))]
    pub upcoming_window_minutes: i64,
}

/// Live results settings.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResultsSettings {
    /// Milliseconds between automatic result refreshes.
    #[serde(default = "default_refresh_interval_ms")]
    #[validate(range(min = 100))]
    pub refresh_interval_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            check_interval_secs: default_check_interval_secs(),
            upcoming_window_minutes: default_upcoming_window_minutes(),
        }
    }
}

impl Default for ResultsSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_acquire_timeout_secs() -> u64 {
    10
}

const fn default_idle_timeout_secs() -> u64 {
    600
}

const fn default_max_lifetime_secs() -> u64 {
    1800
}

const fn default_true() -> bool {
    true
}

const fn default_check_interval_secs() -> u64 {
    60
}

const fn default_upcoming_window_minutes() -> i64 {
    60
}

const fn default_refresh_interval_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `EVENTPOLL_ENV`)
    /// 4. Environment variables with `EVENTPOLL__` prefix
    ///
    /// The merged result is validated; out-of-range values are rejected here
    /// so a bad deployment fails at startup.
    pub fn load() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        let env = std::env::var("EVENTPOLL_ENV").unwrap_or_else(|_| "development".to_string());

        let config: Self = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("EVENTPOLL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> AppResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::AppError;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml_str(
            r#"
            [database]
            url = "postgres://localhost/eventpoll"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.max_connections, 20);
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.check_interval_secs, 60);
        assert_eq!(config.scheduler.upcoming_window_minutes, 60);
        assert_eq!(config.results.refresh_interval_ms, 5000);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_toml_str(
            r#"
            [database]
            url = "postgres://localhost/eventpoll"

            [scheduler]
            enabled = false
            check_interval_secs = 15

            [results]
            refresh_interval_ms = 1000
            "#,
        )
        .unwrap();

        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.check_interval_secs, 15);
        assert_eq!(config.results.refresh_interval_ms, 1000);
    }

    #[test]
    fn test_missing_database_is_error() {
        let result = Config::from_toml_str("[scheduler]\nenabled = true\n");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_database_timeouts() {
        let config = Config::from_toml_str(
            r#"
            [database]
            url = "postgres://localhost/eventpoll"
            acquire_timeout_secs = 3
            log_statements = true
            "#,
        )
        .unwrap();

        assert_eq!(config.database.connect_timeout_secs, 10);
        assert_eq!(config.database.acquire_timeout_secs, 3);
        assert_eq!(config.database.idle_timeout_secs, 600);
        assert_eq!(config.database.max_lifetime_secs, 1800);
        assert!(config.database.log_statements);
    }

    #[test]
    fn test_zero_check_interval_rejected() {
        let result = Config::from_toml_str(
            r#"
            [database]
            url = "postgres://localhost/eventpoll"

            [scheduler]
            check_interval_secs = 0
            "#,
        );

        assert!(matches!(
            result,
            Err(AppError::Validation(ref message)) if message.contains("check_interval_secs")
        ));
    }

    #[test]
    fn test_empty_database_url_rejected() {
        let result = Config::from_toml_str("[database]\nurl = \"\"\n");
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_tiny_refresh_interval_rejected() {
        let result = Config::from_toml_str(
            r#"
            [database]
            url = "postgres://localhost/eventpoll"

            [results]
            refresh_interval_ms = 0
            "#,
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
