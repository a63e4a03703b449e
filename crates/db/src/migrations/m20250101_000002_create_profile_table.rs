//! Create profile table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profile::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profile::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Profile::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Profile::Avatar).string_len(255))
                    .col(ColumnDef::new(Profile::BikePhoto1).string_len(255))
                    .col(ColumnDef::new(Profile::BikePhoto2).string_len(255))
                    .col(ColumnDef::new(Profile::BikePhoto3).string_len(255))
                    .col(ColumnDef::new(Profile::Bio).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Profile::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Profile::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profile_user")
                            .from(Profile::Table, Profile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: user_id (one profile per member)
        manager
            .create_index(
                Index::create()
                    .name("idx_profile_user_id")
                    .table(Profile::Table)
                    .col(Profile::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profile::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Profile {
    Table,
    Id,
    UserId,
    Avatar,
    #[iden = "bike_photo_1"]
    BikePhoto1,
    #[iden = "bike_photo_2"]
    BikePhoto2,
    #[iden = "bike_photo_3"]
    BikePhoto3,
    Bio,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
