//! Database migrations for the hotel front-office API.
//!
//! Migrations run in declaration order; tables that others reference come
//! first.

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_090000_create_users;
mod m2025_01_06_090100_create_refresh_tokens;
mod m2025_01_06_090200_create_rates;
mod m2025_01_06_090300_create_rooms;
mod m2025_01_06_090400_create_customers;
mod m2025_01_06_090500_create_reservations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_090000_create_users::Migration),
            Box::new(m2025_01_06_090100_create_refresh_tokens::Migration),
            Box::new(m2025_01_06_090200_create_rates::Migration),
            Box::new(m2025_01_06_090300_create_rooms::Migration),
            Box::new(m2025_01_06_090400_create_customers::Migration),
            Box::new(m2025_01_06_090500_create_reservations::Migration),
        ]
    }
}
