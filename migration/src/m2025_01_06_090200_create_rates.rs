//! Migration to create the rates table.
//!
//! A rate is the nightly price of a room type, plus the badge colours the
//! admin frontend uses to render it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rates::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Rates::RoomType)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Rates::PriceCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(Rates::BadgeColor)
                            .text()
                            .not_null()
                            .default("#e5e7eb"),
                    )
                    .col(
                        ColumnDef::new(Rates::BadgeTextColor)
                            .text()
                            .not_null()
                            .default("#111827"),
                    )
                    .col(ColumnDef::new(Rates::Description).text().null())
                    .col(
                        ColumnDef::new(Rates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Rates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Rates::CreatedBy).text().null())
                    .col(ColumnDef::new(Rates::UpdatedBy).text().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Rates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Rates {
    Table,
    Id,
    RoomType,
    PriceCents,
    BadgeColor,
    BadgeTextColor,
    Description,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}
