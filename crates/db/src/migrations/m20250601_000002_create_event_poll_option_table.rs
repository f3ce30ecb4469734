//! Create `event_poll_option` table.

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_event_poll_table::EventPoll;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventPollOption::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventPollOption::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventPollOption::PollId).big_integer().not_null())
                    .col(
                        ColumnDef::new(EventPollOption::OptionText)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventPollOption::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EventPollOption::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(EventPollOption::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_poll_option_poll")
                            .from(EventPollOption::Table, EventPollOption::PollId)
                            .to(EventPoll::Table, EventPoll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_event_poll_option_poll_id")
                    .table(EventPollOption::Table)
                    .col(EventPollOption::PollId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventPollOption::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum EventPollOption {
    Table,
    Id,
    PollId,
    OptionText,
    DisplayOrder,
    IsActive,
    CreatedAt,
}
