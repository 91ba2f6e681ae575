//! # Rate API Handlers
//!
//! Everyone on staff can read rates; only admins change prices.

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AdminOnly, CurrentUser};
use crate::error::ApiError;
use crate::handlers::types::{ListQuery, PaginatedResponse};
use crate::models::rate::Model as RateModel;
use crate::repositories::{
    RateRepository,
    rate::{NewRate, RateChanges},
};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RateResponse {
    pub id: Uuid,
    /// Room type label, e.g. `Single`
    pub room_type: String,
    /// Nightly price in cents
    pub price_cents: i64,
    pub badge_color: String,
    pub badge_text_color: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<RateModel> for RateResponse {
    fn from(rate: RateModel) -> Self {
        Self {
            id: rate.id,
            room_type: rate.room_type,
            price_cents: rate.price_cents,
            badge_color: rate.badge_color,
            badge_text_color: rate.badge_text_color,
            description: rate.description,
            updated_at: rate.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRateRequest {
    pub room_type: String,
    pub price_cents: i64,
    /// Hex colour, defaults to a neutral grey
    pub badge_color: Option<String>,
    pub badge_text_color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRateRequest {
    pub room_type: Option<String>,
    pub price_cents: Option<i64>,
    pub badge_color: Option<String>,
    pub badge_text_color: Option<String>,
    pub description: Option<String>,
}

#[utoipa::path(
    get,
    path = "/admin/rates",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Rates ordered by price", body = PaginatedResponse<RateResponse>),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "rates"
)]
pub async fn list_rates(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResponse<RateResponse>>, ApiError> {
    let page = RateRepository::new(&state.db)
        .list(query.page_request())
        .await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

#[utoipa::path(
    get,
    path = "/admin/rates/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Rate id")),
    responses(
        (status = 200, description = "Rate", body = RateResponse),
        (status = 404, description = "Rate not found", body = ApiError)
    ),
    tag = "rates"
)]
pub async fn get_rate(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RateResponse>, ApiError> {
    let rate = RateRepository::new(&state.db).get(id).await?;
    Ok(Json(RateResponse::from(rate)))
}

#[utoipa::path(
    post,
    path = "/admin/rates",
    security(("bearer_auth" = [])),
    request_body = CreateRateRequest,
    responses(
        (status = 201, description = "Rate created", body = RateResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 409, description = "Room type already priced", body = ApiError)
    ),
    tag = "rates"
)]
pub async fn create_rate(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    payload: Result<Json<CreateRateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RateResponse>), ApiError> {
    let Json(request) = payload?;

    let rate = RateRepository::new(&state.db)
        .create(
            NewRate {
                room_type: request.room_type,
                price_cents: request.price_cents,
                badge_color: request.badge_color,
                badge_text_color: request.badge_text_color,
                description: request.description,
            },
            Some(&admin.username),
        )
        .await?;

    tracing::info!(room_type = %rate.room_type, price_cents = rate.price_cents, actor = %admin.username, "Rate created");
    Ok((StatusCode::CREATED, Json(RateResponse::from(rate))))
}

#[utoipa::path(
    put,
    path = "/admin/rates/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Rate id")),
    request_body = UpdateRateRequest,
    responses(
        (status = 200, description = "Updated rate", body = RateResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Rate not found", body = ApiError)
    ),
    tag = "rates"
)]
pub async fn update_rate(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateRateRequest>, JsonRejection>,
) -> Result<Json<RateResponse>, ApiError> {
    let Json(request) = payload?;

    let rate = RateRepository::new(&state.db)
        .update(
            id,
            RateChanges {
                room_type: request.room_type,
                price_cents: request.price_cents,
                badge_color: request.badge_color,
                badge_text_color: request.badge_text_color,
                description: request.description,
            },
            &admin.username,
        )
        .await?;

    tracing::info!(room_type = %rate.room_type, price_cents = rate.price_cents, actor = %admin.username, "Rate updated");
    Ok(Json(RateResponse::from(rate)))
}

#[utoipa::path(
    delete,
    path = "/admin/rates/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Rate id")),
    responses(
        (status = 204, description = "Rate deleted"),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Rate not found", body = ApiError),
        (status = 409, description = "Rate still used by rooms", body = ApiError)
    ),
    tag = "rates"
)]
pub async fn delete_rate(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    RateRepository::new(&state.db).delete(id).await?;
    tracing::info!(rate_id = %id, actor = %admin.username, "Rate deleted");
    Ok(StatusCode::NO_CONTENT)
}
