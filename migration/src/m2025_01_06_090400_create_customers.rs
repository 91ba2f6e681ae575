//! Migration to create the customers table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::FirstName).text().not_null())
                    .col(ColumnDef::new(Customers::LastName).text().not_null())
                    .col(ColumnDef::new(Customers::Email).text().null())
                    .col(ColumnDef::new(Customers::Phone).text().not_null())
                    .col(ColumnDef::new(Customers::Address).text().null())
                    .col(ColumnDef::new(Customers::Nationality).text().null())
                    .col(ColumnDef::new(Customers::IdNumber).text().null())
                    .col(ColumnDef::new(Customers::DateOfBirth).date().null())
                    .col(
                        ColumnDef::new(Customers::MarriageStatus)
                            .text()
                            .not_null()
                            .default("Single"),
                    )
                    .col(ColumnDef::new(Customers::SpouseId).uuid().null())
                    .col(ColumnDef::new(Customers::Status).text().null())
                    .col(
                        ColumnDef::new(Customers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Customers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Customers::CreatedBy).text().null())
                    .col(ColumnDef::new(Customers::UpdatedBy).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customers_spouse_id")
                            .from(Customers::Table, Customers::SpouseId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customers_last_name")
                    .table(Customers::Table)
                    .col(Customers::LastName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_customers_last_name").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    Address,
    Nationality,
    IdNumber,
    DateOfBirth,
    MarriageStatus,
    SpouseId,
    Status,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
}
