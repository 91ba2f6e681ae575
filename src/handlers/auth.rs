//! # Authentication API Handlers
//!
//! Login, token refresh, logout, the current-user profile and admin-driven
//! account registration.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AdminOnly, CurrentUser, clear_session_cookie, session_cookie};
use crate::crypto::{
    AccessToken, generate_refresh_token, hash_password, hash_refresh_token, verify_password,
};
use crate::error::{ApiError, unauthorized, validation_error};
use crate::handlers::types::MessageResponse;
use crate::handlers::users::UserResponse;
use crate::models::user::{Model as UserModel, Role};
use crate::repositories::{RefreshTokenRepository, UserRepository, user::NewUser};
use crate::server::AppState;

const MIN_PASSWORD_LEN: usize = 8;
/// bcrypt ignores input past 72 bytes
const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Percent of a reservation total the user may discount (0-100)
    #[serde(default)]
    pub discount_limit_percent: i32,
}

/// Access token issued by login or refresh
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

impl From<AccessToken> for TokenResponse {
    fn from(token: AccessToken) -> Self {
        Self {
            access_token: token.token,
            token_type: "Bearer".to_string(),
            expires_in: token.expires_in,
            expires_at: token.expires_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: TokenResponse,
    /// Opaque token for `POST /api/auth/refresh`
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN || password.len() > MAX_PASSWORD_BYTES {
        return Err(validation_error(
            "Invalid password",
            serde_json::json!({
                "password": format!("must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_BYTES} bytes long")
            }),
        ));
    }
    Ok(())
}

fn cookie_headers(state: &AppState, token: &AccessToken) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(cookie) = session_cookie(&state.config, &token.token, token.expires_in) {
        headers.insert(SET_COOKIE, cookie);
    }
    headers
}

fn issue_access(state: &AppState, user: &UserModel) -> Result<AccessToken, ApiError> {
    state
        .tokens
        .issue(user.id, &user.username, user.role)
        .map_err(|err| ApiError::from(anyhow::Error::from(err)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; the access token is also set as a cookie", body = LoginResponse),
        (status = 400, description = "Malformed request", body = ApiError),
        (status = 401, description = "Wrong credentials or disabled account", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<LoginResponse>), ApiError> {
    let Json(request) = payload?;
    let users = UserRepository::new(&state.db);

    let user = users.find_by_username(&request.username).await?;
    let verified = password_matches(
        user.as_ref(),
        &request.password,
        state.config.password_hash_cost,
    )
    .await;
    let user = match user {
        Some(user) if verified && user.is_active => user,
        _ => {
            tracing::info!(username = %request.username.trim(), "Login refused");
            return Err(unauthorized(Some("Invalid username or password")));
        }
    };

    let access = issue_access(&state, &user)?;
    let refresh_token = generate_refresh_token();
    let refresh_expires_at = Utc::now() + Duration::days(state.config.refresh_token_ttl_days);
    RefreshTokenRepository::new(&state.db)
        .create(user.id, hash_refresh_token(&refresh_token), refresh_expires_at)
        .await?;

    let user = users.record_login(user).await?;
    tracing::info!(user = %user.username, role = %user.role, "User signed in");

    let headers = cookie_headers(&state, &access);
    Ok((
        headers,
        Json(LoginResponse {
            token: TokenResponse::from(access),
            refresh_token,
            refresh_expires_at,
            user: UserResponse::from(user),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 401, description = "Refresh token unknown, expired or revoked", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<TokenResponse>), ApiError> {
    let Json(request) = payload?;
    let invalid = || unauthorized(Some("Invalid or expired refresh token"));

    let stored = RefreshTokenRepository::new(&state.db)
        .find_active(&hash_refresh_token(request.refresh_token.trim()), Utc::now())
        .await?
        .ok_or_else(invalid)?;

    let user = UserRepository::new(&state.db)
        .find_by_id(stored.user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;

    let access = issue_access(&state, &user)?;
    tracing::debug!(user = %user.username, "Access token refreshed");

    let headers = cookie_headers(&state, &access);
    Ok((headers, Json(TokenResponse::from(access))))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Signed out and cookie cleared", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    payload: Option<Json<LogoutRequest>>,
) -> Result<(HeaderMap, Json<MessageResponse>), ApiError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    if let Some(token) = request.refresh_token.as_deref().map(str::trim)
        && !token.is_empty()
    {
        let revoked = RefreshTokenRepository::new(&state.db)
            .revoke(&hash_refresh_token(token))
            .await?;
        tracing::debug!(revoked, "Logout");
    }

    let mut headers = HeaderMap::new();
    if let Some(cookie) = clear_session_cookie(&state.config) {
        headers.insert(SET_COOKIE, cookie);
    }
    Ok((headers, Json(MessageResponse::new("Signed out"))))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile of the signed-in user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(&state.db).get(user.id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    security(("bearer_auth" = [])),
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 409, description = "Username taken", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(request) = payload?;
    validate_password(&request.password)?;

    let password_hash = hash_password(&request.password, state.config.password_hash_cost)
        .await
        .map_err(anyhow::Error::from)?;

    let user = UserRepository::new(&state.db)
        .create(
            NewUser {
                username: request.username,
                password_hash,
                full_name: request.full_name,
                role: request.role,
                discount_limit_percent: request.discount_limit_percent,
            },
            Some(&admin.username),
        )
        .await?;

    tracing::info!(user = %user.username, role = %user.role, actor = %admin.username, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Unknown usernames still cost one bcrypt round at the configured cost,
/// so both refusal paths take the same time.
async fn password_matches(user: Option<&UserModel>, password: &str, cost: u32) -> bool {
    match user {
        Some(user) => verify_password(password, &user.password_hash).await,
        None => {
            let _ = hash_password(password, cost).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_never_matches() {
        assert!(!password_matches(None, "long-enough", 4).await);
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
        assert!(validate_password(&"x".repeat(73)).is_err());
    }
}
