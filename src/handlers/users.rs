//! # Staff user management
//!
//! Admin-only listing, editing and removal of staff accounts. Accounts are
//! created through `POST /api/auth/register`.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AdminOnly;
use crate::crypto::hash_password;
use crate::error::ApiError;
use crate::handlers::auth::validate_password;
use crate::handlers::types::{ListQuery, PaginatedResponse};
use crate::models::user::{Model as UserModel, Role};
use crate::repositories::{RefreshTokenRepository, UserRepository, user::UserChanges};
use crate::server::AppState;

/// Staff account as returned by the API (never includes the password hash)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub role: Role,
    /// Largest discount the user may grant, in percent of the total
    pub discount_limit_percent: i32,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            discount_limit_percent: user.discount_limit_percent,
            is_active: user.is_active,
            last_login_at: user.last_login_at.map(|at| at.with_timezone(&Utc)),
            created_at: user.created_at.with_timezone(&Utc),
        }
    }
}

/// Fields an admin may change on a staff account
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub discount_limit_percent: Option<i32>,
    pub is_active: Option<bool>,
    /// New password; existing sessions are revoked when set
    pub password: Option<String>,
}

#[utoipa::path(
    get,
    path = "/admin/users",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Staff accounts", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminOnly,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let page = UserRepository::new(&state.db)
        .list(query.page_request())
        .await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
        (status = 409, description = "Would leave no active admin", body = ApiError)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(request) = payload?;

    let password_hash = match request.password.as_deref() {
        Some(password) => {
            validate_password(password)?;
            let hash = hash_password(password, state.config.password_hash_cost)
                .await
                .map_err(anyhow::Error::from)?;
            Some(hash)
        }
        None => None,
    };
    let revoke_sessions = password_hash.is_some() || request.is_active == Some(false);

    let user = UserRepository::new(&state.db)
        .update(
            id,
            UserChanges {
                full_name: request.full_name,
                role: request.role,
                discount_limit_percent: request.discount_limit_percent,
                is_active: request.is_active,
                password_hash,
            },
            &admin.username,
        )
        .await?;

    if revoke_sessions {
        let revoked = RefreshTokenRepository::new(&state.db)
            .revoke_all_for_user(user.id)
            .await?;
        tracing::info!(user = %user.username, revoked, "Refresh tokens revoked");
    }

    tracing::info!(user = %user.username, actor = %admin.username, "User updated");
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
        (status = 409, description = "Last active admin", body = ApiError)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if id == admin.id {
        return Err(crate::error::conflict("You cannot delete your own account"));
    }

    UserRepository::new(&state.db).delete(id).await?;
    tracing::info!(user_id = %id, actor = %admin.username, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
