//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_event_poll_table;
mod m20250601_000002_create_event_poll_option_table;
mod m20250601_000003_create_event_poll_response_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_event_poll_table::Migration),
            Box::new(m20250601_000002_create_event_poll_option_table::Migration),
            Box::new(m20250601_000003_create_event_poll_response_table::Migration),
        ]
    }
}
