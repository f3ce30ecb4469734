//! Test utilities for database operations.
//!
//! Provides helpers for setting up and tearing down test databases.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Set,
    Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{poll, poll_option, poll_response};
use crate::migrations::Migrator;

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER")
                .unwrap_or_else(|_| "eventpoll_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "eventpoll_test".to_string()),
            database: std::env::var("TEST_DB_NAME")
                .unwrap_or_else(|_| "eventpoll_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated test database.
pub struct TestDatabase {
    /// Shared database connection, ready for the repositories.
    pub conn: Arc<DatabaseConnection>,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect with the default configuration and run migrations.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with a custom configuration and run migrations.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Connected to test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
        })
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.conn.as_ref()
    }

    /// Remove every poll, option and response.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        self.conn
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                "TRUNCATE TABLE event_poll_response, event_poll_option, event_poll RESTART IDENTITY CASCADE"
                    .to_string(),
            ))
            .await?;

        info!("Cleaned up test database");
        Ok(())
    }

    /// Insert a poll with the given window and flag.
    pub async fn seed_poll(
        &self,
        title: &str,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
        is_active: bool,
    ) -> Result<poll::Model, DbErr> {
        poll::ActiveModel {
            title: Set(title.to_string()),
            description: Set(None),
            start_date: Set(start_date.into()),
            end_date: Set(end_date.map(Into::into)),
            is_active: Set(is_active),
            max_responses_per_user: Set(1),
            allow_multiple_choices: Set(false),
            is_anonymous: Set(false),
            results_visible_to: Set(poll::ResultsVisibility::All),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert an option for a poll.
    pub async fn seed_option(
        &self,
        poll_id: i64,
        option_text: &str,
        display_order: i32,
    ) -> Result<poll_option::Model, DbErr> {
        poll_option::ActiveModel {
            poll_id: Set(poll_id),
            option_text: Set(option_text.to_string()),
            display_order: Set(display_order),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a response for an option.
    pub async fn seed_response(
        &self,
        poll_id: i64,
        poll_option_id: i64,
        user_id: Option<&str>,
    ) -> Result<poll_response::Model, DbErr> {
        poll_response::ActiveModel {
            poll_id: Set(poll_id),
            poll_option_id: Set(poll_option_id),
            user_id: Set(user_id.map(str::to_string)),
            comment: Set(None),
            response_value: Set(None),
            is_anonymous: Set(user_id.is_none()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(self.conn.as_ref())
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_url() {
        let config = TestDbConfig {
            host: "db".to_string(),
            port: 5432,
            username: "u".to_string(),
            password: "p".to_string(),
            database: "polls".to_string(),
        };
        assert_eq!(config.database_url(), "postgres://u:p@db:5432/polls");
    }
}
