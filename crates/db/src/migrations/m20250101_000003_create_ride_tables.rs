//! Create ride and ride participation tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ride::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Ride::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Ride::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Ride::Description).text().not_null())
                    .col(ColumnDef::new(Ride::DateTime).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Ride::StartPoint).string_len(300).not_null())
                    .col(ColumnDef::new(Ride::EndPoint).string_len(300).not_null())
                    .col(ColumnDef::new(Ride::HeaderPhoto).string_len(255))
                    .col(ColumnDef::new(Ride::GpxFile).string_len(255))
                    .col(ColumnDef::new(Ride::CalimotoUrl).string_len(500).not_null().default(""))
                    .col(ColumnDef::new(Ride::ReliveUrl).string_len(500).not_null().default(""))
                    .col(ColumnDef::new(Ride::Completed).boolean().not_null().default(false))
                    .col(ColumnDef::new(Ride::CreatedBy).string_len(32))
                    .col(
                        ColumnDef::new(Ride::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Ride::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_created_by")
                            .from(Ride::Table, Ride::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: date_time (listing order and upcoming lookup)
        manager
            .create_index(
                Index::create()
                    .name("idx_ride_date_time")
                    .table(Ride::Table)
                    .col(Ride::DateTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RideRider::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RideRider::RideId).string_len(32).not_null())
                    .col(ColumnDef::new(RideRider::UserId).string_len(32).not_null())
                    .primary_key(
                        Index::create()
                            .col(RideRider::RideId)
                            .col(RideRider::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_rider_ride")
                            .from(RideRider::Table, RideRider::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_rider_user")
                            .from(RideRider::Table, RideRider::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id (rides a member joined)
        manager
            .create_index(
                Index::create()
                    .name("idx_ride_rider_user_id")
                    .table(RideRider::Table)
                    .col(RideRider::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RideRider::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ride::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Ride {
    Table,
    Id,
    Title,
    Description,
    DateTime,
    StartPoint,
    EndPoint,
    HeaderPhoto,
    GpxFile,
    CalimotoUrl,
    ReliveUrl,
    Completed,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum RideRider {
    Table,
    RideId,
    UserId,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
