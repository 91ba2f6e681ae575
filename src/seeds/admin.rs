//! First administrator account.

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::crypto::hash_password;
use crate::models::user::Role;
use crate::repositories::{UserRepository, user::NewUser};

const SEED_ACTOR: &str = "bootstrap";

/// Creates the configured admin when the users table is empty.
///
/// Returns `true` when an account was created.
pub async fn seed_bootstrap_admin(db: &DatabaseConnection, config: &AppConfig) -> Result<bool> {
    let (Some(username), Some(password)) = (
        config.bootstrap_admin_username.as_deref(),
        config.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(false);
    };

    let users = UserRepository::new(db);
    if users.count().await? > 0 {
        log::debug!("Users already exist, skipping bootstrap admin");
        return Ok(false);
    }

    let password_hash = hash_password(password, config.password_hash_cost)
        .await
        .context("hashing bootstrap admin password")?;

    let admin = users
        .create(
            NewUser {
                username: username.to_string(),
                password_hash,
                full_name: Some("Administrator".to_string()),
                role: Role::Admin,
                discount_limit_percent: 100,
            },
            Some(SEED_ACTOR),
        )
        .await
        .context("creating bootstrap admin")?;

    log::info!("Created bootstrap admin '{}'", admin.username);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_password;
    use crate::repositories::tests_support::setup_db;

    fn config() -> AppConfig {
        AppConfig {
            bootstrap_admin_username: Some("owner".to_string()),
            bootstrap_admin_password: Some("correct horse".to_string()),
            password_hash_cost: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creates_admin_once() {
        let db = setup_db().await;

        assert!(seed_bootstrap_admin(&db, &config()).await.unwrap());
        assert!(!seed_bootstrap_admin(&db, &config()).await.unwrap());

        let users = UserRepository::new(&db);
        assert_eq!(users.count().await.unwrap(), 1);
        let admin = users.find_by_username("owner").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password("correct horse", &admin.password_hash).await);
    }

    #[tokio::test]
    async fn skipped_without_credentials() {
        let db = setup_db().await;
        let config = AppConfig::default();

        assert!(!seed_bootstrap_admin(&db, &config).await.unwrap());
        assert_eq!(UserRepository::new(&db).count().await.unwrap(), 0);
    }
}
