//! Create `event_poll_response` table.

use sea_orm_migration::prelude::*;

use super::m20250601_000001_create_event_poll_table::EventPoll;
use super::m20250601_000002_create_event_poll_option_table::EventPollOption;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventPollResponse::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventPollResponse::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EventPollResponse::PollId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EventPollResponse::PollOptionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EventPollResponse::UserId).string_len(64))
                    .col(ColumnDef::new(EventPollResponse::Comment).text())
                    .col(ColumnDef::new(EventPollResponse::ResponseValue).string_len(1000))
                    .col(
                        ColumnDef::new(EventPollResponse::IsAnonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EventPollResponse::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_poll_response_poll")
                            .from(EventPollResponse::Table, EventPollResponse::PollId)
                            .to(EventPoll::Table, EventPoll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_poll_response_option")
                            .from(EventPollResponse::Table, EventPollResponse::PollOptionId)
                            .to(EventPollOption::Table, EventPollOption::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Live results read every response of one poll on each refresh
        manager
            .create_index(
                Index::create()
                    .name("idx_event_poll_response_poll_id")
                    .table(EventPollResponse::Table)
                    .col(EventPollResponse::PollId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventPollResponse::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EventPollResponse {
    Table,
    Id,
    PollId,
    PollOptionId,
    UserId,
    Comment,
    ResponseValue,
    IsAnonymous,
    CreatedAt,
}
