//! # Authentication and Authorization
//!
//! Staff authenticate with an HS256 access token sent as
//! `Authorization: Bearer <token>` or, for the browser frontend, in the auth
//! cookie. The middleware verifies the token, reloads the user so disabled
//! accounts lose access immediately, and stores a [`CurrentUser`] in the
//! request extensions for the extractors below.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized};
use crate::front_desk::Actor;
use crate::models::user::{Model as UserModel, Role};
use crate::repositories::UserRepository;
use crate::server::AppState;

/// The authenticated staff member of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub discount_limit_percent: i32,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            username: self.username.clone(),
            role: self.role,
            discount_limit_percent: self.discount_limit_percent,
        }
    }
}

impl From<&UserModel> for CurrentUser {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            discount_limit_percent: user.discount_limit_percent,
        }
    }
}

/// Extractor that only admits users with the `Admin` role.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub CurrentUser);

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Authentication middleware for staff routes.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers(), &state.config.auth_cookie_name)
        .ok_or_else(|| unauthorized(Some("Missing access token")))?;

    let claims = state.tokens.verify(&token).map_err(|err| {
        tracing::debug!(error = %err, "Rejected access token");
        unauthorized(Some("Invalid or expired access token"))
    })?;

    let user = UserRepository::new(&state.db)
        .find_by_id(claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| unauthorized(Some("Account is disabled or no longer exists")))?;

    let current = CurrentUser::from(&user);
    tracing::debug!(user = %current.username, role = %current.role, "Authenticated staff request");

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Bearer header first, then the auth cookie.
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying the access token.
pub fn session_cookie(config: &AppConfig, token: &str, max_age_seconds: i64) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.auth_cookie_name, token, max_age_seconds
    );
    if secure_cookies(config) {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` value that removes the auth cookie.
pub fn clear_session_cookie(config: &AppConfig) -> Option<HeaderValue> {
    session_cookie(config, "", 0)
}

fn secure_cookies(config: &AppConfig) -> bool {
    !matches!(config.profile.as_str(), "local" | "test")
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(None))
    }
}

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::info!(user = %user.username, "Admin-only route refused");
            return Err(forbidden(Some("Administrator role required")));
        }
        Ok(AdminOnly(user))
    }
}
