//! Create `event_poll` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EventPoll::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EventPoll::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EventPoll::Title).string_len(255).not_null())
                    .col(ColumnDef::new(EventPoll::Description).text())
                    .col(
                        ColumnDef::new(EventPoll::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EventPoll::EndDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(EventPoll::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EventPoll::MaxResponsesPerUser)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(EventPoll::AllowMultipleChoices)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EventPoll::IsAnonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(EventPoll::ResultsVisibleTo)
                            .string_len(16)
                            .not_null()
                            .default("all"),
                    )
                    .col(
                        ColumnDef::new(EventPoll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EventPoll::UpdatedAt).timestamp_with_time_zone())
                    .check(
                        Expr::col(EventPoll::EndDate)
                            .is_null()
                            .or(Expr::col(EventPoll::EndDate).gte(Expr::col(EventPoll::StartDate))),
                    )
                    .check(Expr::col(EventPoll::MaxResponsesPerUser).gte(1))
                    .to_owned(),
            )
            .await?;

        // The reconciliation query filters on both columns
        manager
            .create_index(
                Index::create()
                    .name("idx_event_poll_is_active_start_date")
                    .table(EventPoll::Table)
                    .col(EventPoll::IsActive)
                    .col(EventPoll::StartDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EventPoll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum EventPoll {
    Table,
    Id,
    Title,
    Description,
    StartDate,
    EndDate,
    IsActive,
    MaxResponsesPerUser,
    AllowMultipleChoices,
    IsAnonymous,
    ResultsVisibleTo,
    CreatedAt,
    UpdatedAt,
}
