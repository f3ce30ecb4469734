//! Database layer for eventpoll-rs.
//!
//! Entities, migrations and repositories for polls, their options and the
//! responses cast on them.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use std::time::Duration;

use eventpoll_common::{AppError, AppResult, Config, config::DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::log::LevelFilter;

/// Pool options for the configured database.
#[must_use]
pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.url);

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .sqlx_logging(config.log_statements)
        .sqlx_logging_level(LevelFilter::Debug);

    opt
}

/// Connect to the configured database.
pub async fn init(config: &Config) -> AppResult<DatabaseConnection> {
    tracing::debug!(
        max_connections = config.database.max_connections,
        "Connecting to database"
    );

    Database::connect(connect_options(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_follow_config() {
        let config = Config::from_toml_str(
            r#"
            [database]
            url = "postgres://localhost/eventpoll"
            max_connections = 8
            min_connections = 12
            acquire_timeout_secs = 4
            idle_timeout_secs = 30
            "#,
        )
        .unwrap();

        let opt = connect_options(&config.database);

        assert_eq!(opt.get_url(), "postgres://localhost/eventpoll");
        assert_eq!(opt.get_max_connections(), Some(8));
        // Never more idle connections than the pool may hold
        assert_eq!(opt.get_min_connections(), Some(8));
        assert_eq!(opt.get_acquire_timeout(), Some(Duration::from_secs(4)));
        assert_eq!(opt.get_connect_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(opt.get_idle_timeout(), Some(Duration::from_secs(30)));
    }
}
