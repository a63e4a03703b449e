//! Create ride photo and ride comment tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RidePhoto::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RidePhoto::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(RidePhoto::RideId).string_len(32).not_null())
                    .col(ColumnDef::new(RidePhoto::Photo).string_len(255).not_null())
                    .col(ColumnDef::new(RidePhoto::Caption).string_len(200).not_null().default(""))
                    .col(ColumnDef::new(RidePhoto::UploadedBy).string_len(32).not_null())
                    .col(ColumnDef::new(RidePhoto::DisplayOrder).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(RidePhoto::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_photo_ride")
                            .from(RidePhoto::Table, RidePhoto::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_photo_uploaded_by")
                            .from(RidePhoto::Table, RidePhoto::UploadedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_photo_ride_id")
                    .table(RidePhoto::Table)
                    .col(RidePhoto::RideId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RideComment::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RideComment::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(RideComment::RideId).string_len(32).not_null())
                    .col(ColumnDef::new(RideComment::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(RideComment::Message).text().not_null())
                    .col(
                        ColumnDef::new(RideComment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RideComment::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_comment_ride")
                            .from(RideComment::Table, RideComment::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_comment_user")
                            .from(RideComment::Table, RideComment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_comment_ride_id")
                    .table(RideComment::Table)
                    .col(RideComment::RideId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RideComment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RidePhoto::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RidePhoto {
    Table,
    Id,
    RideId,
    Photo,
    Caption,
    UploadedBy,
    DisplayOrder,
    CreatedAt,
}

#[derive(Iden)]
enum RideComment {
    Table,
    Id,
    RideId,
    UserId,
    Message,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Ride {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
