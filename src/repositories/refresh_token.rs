//! # Refresh Token Repository

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use uuid::Uuid;

use crate::crypto::constant_time_eq;
use crate::error::RepositoryError;
use crate::models::refresh_token::{
    self, ActiveModel as RefreshTokenActiveModel, Entity as RefreshToken,
    Model as RefreshTokenModel,
};

pub struct RefreshTokenRepository<'a, C: ConnectionTrait = DatabaseConnection> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> RefreshTokenRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenModel, RepositoryError> {
        let token = RefreshTokenActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_hash: Set(token_hash),
            expires_at: Set(expires_at.into()),
            revoked_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        token
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Looks up an unrevoked, unexpired token by digest.
    pub async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenModel>, RepositoryError> {
        let token = RefreshToken::find()
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(token.filter(|t| {
            constant_time_eq(&t.token_hash, token_hash) && t.is_active_at(now.into())
        }))
    }

    /// Marks the token revoked. Returns whether a live token was revoked.
    pub async fn revoke(&self, token_hash: &str) -> Result<bool, RepositoryError> {
        let result = RefreshToken::update_many()
            .col_expr(
                refresh_token::Column::RevokedAt,
                Expr::value(DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected > 0)
    }

    /// Revokes every live token of a user (deactivation, password change).
    pub async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let result = RefreshToken::update_many()
            .col_expr(
                refresh_token::Column::RevokedAt,
                Expr::value(DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }
}
