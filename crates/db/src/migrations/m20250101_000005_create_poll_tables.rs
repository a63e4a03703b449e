//! Create poll and poll choice tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Poll::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Poll::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Poll::Description).text().not_null().default(""))
                    .col(ColumnDef::new(Poll::CreatedBy).string_len(32))
                    .col(ColumnDef::new(Poll::IsActive).boolean().not_null().default(true))
                    .col(
                        ColumnDef::new(Poll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Poll::ClosesAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_created_by")
                            .from(Poll::Table, Poll::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: created_at (default order)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_created_at")
                    .table(Poll::Table)
                    .col(Poll::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PollChoice::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PollChoice::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(PollChoice::PollId).string_len(32).not_null())
                    .col(ColumnDef::new(PollChoice::Text).string_len(200).not_null())
                    .col(ColumnDef::new(PollChoice::Description).text().not_null().default(""))
                    .col(ColumnDef::new(PollChoice::Position).integer().not_null().default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_choice_poll")
                            .from(PollChoice::Table, PollChoice::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_choice_poll_id")
                    .table(PollChoice::Table)
                    .col(PollChoice::PollId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollChoice::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    Title,
    Description,
    CreatedBy,
    IsActive,
    CreatedAt,
    ClosesAt,
}

#[derive(Iden)]
enum PollChoice {
    Table,
    Id,
    PollId,
    Text,
    Description,
    Position,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
