//! # User Repository
//!
//! CRUD for staff accounts. Password hashing happens before calls reach
//! this layer; only hashes are stored.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::{Page, PageRequest, clean_optional, fetch_page};
use crate::error::RepositoryError;
use crate::models::user::{self, ActiveModel as UserActiveModel, Entity as User, Model as UserModel, Role};

/// Data for a new staff account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub discount_limit_percent: i32,
}

/// Partial update of a staff account; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub discount_limit_percent: Option<i32>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

pub struct UserRepository<'a, C: ConnectionTrait = DatabaseConnection> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, request: NewUser, actor: Option<&str>) -> Result<UserModel, RepositoryError> {
        let username = validate_username(&request.username)?;
        validate_discount_limit(request.discount_limit_percent)?;

        if self.find_by_username(&username).await?.is_some() {
            return Err(RepositoryError::conflict(format!(
                "Username '{username}' is already taken"
            )));
        }

        let now = Utc::now();
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            password_hash: Set(request.password_hash),
            full_name: Set(clean_optional(request.full_name)),
            role: Set(request.role),
            discount_limit_percent: Set(request.discount_limit_percent),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            created_by: Set(actor.map(str::to_string)),
            updated_by: Set(actor.map(str::to_string)),
        };

        user.insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<UserModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User not found"))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, RepositoryError> {
        User::find()
            .filter(user::Column::Username.eq(username.trim()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(&self, request: PageRequest) -> Result<Page<UserModel>, RepositoryError> {
        let select = User::find().order_by_asc(user::Column::Username);
        fetch_page(self.db, select, request).await
    }

    pub async fn count(&self) -> Result<u64, RepositoryError> {
        User::find()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn count_active_admins(&self) -> Result<u64, RepositoryError> {
        User::find()
            .filter(user::Column::Role.eq(Role::Admin))
            .filter(user::Column::IsActive.eq(true))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
        actor: &str,
    ) -> Result<UserModel, RepositoryError> {
        let existing = self.get(id).await?;

        if let Some(limit) = changes.discount_limit_percent {
            validate_discount_limit(limit)?;
        }

        let loses_admin = existing.role == Role::Admin
            && existing.is_active
            && (changes.role.is_some_and(|role| role != Role::Admin)
                || changes.is_active == Some(false));
        if loses_admin && self.count_active_admins().await? <= 1 {
            return Err(RepositoryError::conflict(
                "Cannot demote or deactivate the last active admin",
            ));
        }

        let mut active = existing.into_active_model();
        if let Some(full_name) = changes.full_name {
            active.full_name = Set(clean_optional(Some(full_name)));
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if let Some(limit) = changes.discount_limit_percent {
            active.discount_limit_percent = Set(limit);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(password_hash) = changes.password_hash {
            active.password_hash = Set(password_hash);
        }
        active.updated_at = Set(Utc::now().into());
        active.updated_by = Set(Some(actor.to_string()));

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn record_login(&self, user: UserModel) -> Result<UserModel, RepositoryError> {
        let mut active = user.into_active_model();
        active.last_login_at = Set(Some(Utc::now().into()));
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let existing = self.get(id).await?;

        if existing.role == Role::Admin && existing.is_active && self.count_active_admins().await? <= 1
        {
            return Err(RepositoryError::conflict("Cannot delete the last active admin"));
        }

        User::delete_by_id(existing.id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(())
    }
}

fn validate_username(username: &str) -> Result<String, RepositoryError> {
    let username = username.trim();
    if username.len() < 3 || username.len() > 64 {
        return Err(RepositoryError::validation_error(
            "Username must be between 3 and 64 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
    {
        return Err(RepositoryError::validation_error(
            "Username can only contain letters, numbers, '.', '_', '-' and '@'",
        ));
    }
    Ok(username.to_string())
}

fn validate_discount_limit(limit: i32) -> Result<(), RepositoryError> {
    if !(0..=100).contains(&limit) {
        return Err(RepositoryError::validation_error(
            "Discount limit must be between 0 and 100 percent",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tests_support::setup_db;

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$2b$04$notarealhash".to_string(),
            full_name: Some("  Front Desk  ".to_string()),
            role,
            discount_limit_percent: 10,
        }
    }

    #[tokio::test]
    async fn create_and_find_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);

        let created = repo
            .create(new_user("frontdesk", Role::Receptionist), Some("admin"))
            .await
            .unwrap();
        assert_eq!(created.full_name.as_deref(), Some("Front Desk"));
        assert_eq!(created.created_by.as_deref(), Some("admin"));
        assert!(created.is_active);

        let found = repo.find_by_username("frontdesk").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);

        repo.create(new_user("frontdesk", Role::Receptionist), None)
            .await
            .unwrap();
        let err = repo
            .create(new_user("frontdesk", Role::Admin), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn rejects_invalid_fields() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);

        assert!(matches!(
            repo.create(new_user("ab", Role::Admin), None).await,
            Err(RepositoryError::Validation(_))
        ));

        let mut request = new_user("valid.name", Role::Receptionist);
        request.discount_limit_percent = 101;
        assert!(matches!(
            repo.create(request, None).await,
            Err(RepositoryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn last_admin_is_protected() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);

        let admin = repo.create(new_user("admin", Role::Admin), None).await.unwrap();

        let demote = UserChanges {
            role: Some(Role::Receptionist),
            ..Default::default()
        };
        assert!(matches!(
            repo.update(admin.id, demote.clone(), "admin").await,
            Err(RepositoryError::Conflict(_))
        ));
        assert!(matches!(
            repo.delete(admin.id).await,
            Err(RepositoryError::Conflict(_))
        ));

        repo.create(new_user("second-admin", Role::Admin), None)
            .await
            .unwrap();
        let demoted = repo.update(admin.id, demote, "second-admin").await.unwrap();
        assert_eq!(demoted.role, Role::Receptionist);
        assert_eq!(demoted.updated_by.as_deref(), Some("second-admin"));
    }

    #[tokio::test]
    async fn list_is_paginated() {
        let db = setup_db().await;
        let repo = UserRepository::new(&db);
        for name in ["alice", "bob", "carol"] {
            repo.create(new_user(name, Role::Receptionist), None)
                .await
                .unwrap();
        }

        let page = repo.list(PageRequest::new(Some(2), Some(2))).await.unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].username, "carol");
    }
}
