//! Database seeding
//!
//! Bootstrap data applied at startup: the first administrator account and a
//! starter set of rates. Both are idempotent.

use anyhow::Result;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

pub mod admin;
pub mod rate;

pub use admin::seed_bootstrap_admin;
pub use rate::seed_default_rates;

/// Applies every seed enabled by the configuration.
pub async fn run(db: &DatabaseConnection, config: &AppConfig) -> Result<()> {
    seed_bootstrap_admin(db, config).await?;
    if config.seed_default_rates {
        seed_default_rates(db).await?;
    }
    Ok(())
}
