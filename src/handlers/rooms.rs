//! # Room API Handlers
//!
//! Room inventory and room photos. Responses embed the room's rate so the
//! frontend can show type, price and badge without a second call.

use std::collections::HashMap;

use axum::{
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{AdminOnly, CurrentUser};
use crate::error::{ApiError, bad_request};
use crate::handlers::types::PaginatedResponse;
use crate::handlers::uploads::UploadForm;
use crate::models::{rate::Model as RateModel, room::Model as RoomModel};
use crate::repositories::{
    PageRequest, RateRepository, RoomRepository,
    room::{NewRoom, RoomChanges, RoomFilter},
};
use crate::server::AppState;
use crate::storage::upload_all;

/// Multipart field carrying room photos
pub const ROOM_IMAGES_FIELD: &str = "images";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoomResponse {
    pub id: Uuid,
    pub number: String,
    pub floor: i32,
    pub capacity: i32,
    pub rate_id: Uuid,
    pub room_type: String,
    /// Nightly price in cents, from the room's rate
    pub price_cents: i64,
    pub badge_color: String,
    pub badge_text_color: String,
    pub is_available: bool,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl RoomResponse {
    pub fn new(room: RoomModel, rate: &RateModel) -> Self {
        Self {
            images: room.image_urls(),
            id: room.id,
            number: room.number,
            floor: room.floor,
            capacity: room.capacity,
            rate_id: room.rate_id,
            room_type: rate.room_type.clone(),
            price_cents: rate.price_cents,
            badge_color: rate.badge_color.clone(),
            badge_text_color: rate.badge_text_color.clone(),
            is_available: room.is_available,
            description: room.description,
            updated_at: room.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    pub number: String,
    pub floor: i32,
    pub capacity: i32,
    pub rate_id: Uuid,
    #[serde(default = "default_true")]
    pub is_available: bool,
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoomRequest {
    pub number: Option<String>,
    pub floor: Option<i32>,
    pub capacity: Option<i32>,
    pub rate_id: Option<Uuid>,
    pub is_available: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoomListQuery {
    pub rate_id: Option<Uuid>,
    pub is_available: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoomImagesResponse {
    pub room: RoomResponse,
    /// Files that could not be uploaded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

async fn with_rate(state: &AppState, room: RoomModel) -> Result<RoomResponse, ApiError> {
    let rate = RateRepository::new(&state.db).get(room.rate_id).await?;
    Ok(RoomResponse::new(room, &rate))
}

#[utoipa::path(
    get,
    path = "/admin/rooms",
    security(("bearer_auth" = [])),
    params(RoomListQuery),
    responses(
        (status = 200, description = "Rooms ordered by number", body = PaginatedResponse<RoomResponse>),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "rooms"
)]
pub async fn list_rooms(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<RoomListQuery>,
) -> Result<Json<PaginatedResponse<RoomResponse>>, ApiError> {
    let page = RoomRepository::new(&state.db)
        .list(
            RoomFilter {
                rate_id: query.rate_id,
                is_available: query.is_available,
            },
            PageRequest::new(query.page, query.per_page),
        )
        .await?;

    let rates: HashMap<Uuid, RateModel> = RateRepository::new(&state.db)
        .list_all()
        .await?
        .into_iter()
        .map(|rate| (rate.id, rate))
        .collect();

    let mut data = Vec::with_capacity(page.items.len());
    for room in page.items {
        let rate = rates
            .get(&room.rate_id)
            .ok_or_else(|| anyhow::anyhow!("room {} points at missing rate {}", room.id, room.rate_id))?;
        data.push(RoomResponse::new(room, rate));
    }

    Ok(Json(PaginatedResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total_items: page.total_items,
        total_pages: page.total_pages,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/rooms/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room", body = RoomResponse),
        (status = 404, description = "Room not found", body = ApiError)
    ),
    tag = "rooms"
)]
pub async fn get_room(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = RoomRepository::new(&state.db).get(id).await?;
    Ok(Json(with_rate(&state, room).await?))
}

#[utoipa::path(
    post,
    path = "/admin/rooms",
    security(("bearer_auth" = [])),
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = RoomResponse),
        (status = 400, description = "Validation error or unknown rate", body = ApiError),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 409, description = "Room number taken", body = ApiError)
    ),
    tag = "rooms"
)]
pub async fn create_room(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    let Json(request) = payload?;

    let room = RoomRepository::new(&state.db)
        .create(
            NewRoom {
                number: request.number,
                floor: request.floor,
                capacity: request.capacity,
                rate_id: request.rate_id,
                is_available: request.is_available,
                description: request.description,
            },
            Some(&admin.username),
        )
        .await?;

    tracing::info!(room = %room.number, actor = %admin.username, "Room created");
    Ok((StatusCode::CREATED, Json(with_rate(&state, room).await?)))
}

#[utoipa::path(
    put,
    path = "/admin/rooms/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Room id")),
    request_body = UpdateRoomRequest,
    responses(
        (status = 200, description = "Updated room", body = RoomResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Room not found", body = ApiError)
    ),
    tag = "rooms"
)]
pub async fn update_room(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateRoomRequest>, JsonRejection>,
) -> Result<Json<RoomResponse>, ApiError> {
    let Json(request) = payload?;

    let room = RoomRepository::new(&state.db)
        .update(
            id,
            RoomChanges {
                number: request.number,
                floor: request.floor,
                capacity: request.capacity,
                rate_id: request.rate_id,
                is_available: request.is_available,
                description: request.description,
            },
            &user.username,
        )
        .await?;

    Ok(Json(with_rate(&state, room).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/rooms/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Room id")),
    responses(
        (status = 204, description = "Room deleted"),
        (status = 403, description = "Admin role required", body = ApiError),
        (status = 404, description = "Room not found", body = ApiError),
        (status = 409, description = "Room has reservations", body = ApiError)
    ),
    tag = "rooms"
)]
pub async fn delete_room(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    RoomRepository::new(&state.db).delete(id).await?;
    tracing::info!(room_id = %id, actor = %admin.username, "Room deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Uploads photos (multipart field `images`) and appends them to the room.
#[utoipa::path(
    post,
    path = "/admin/rooms/{id}/images",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Room id")),
    request_body(content_type = "multipart/form-data", description = "One or more `images` files"),
    responses(
        (status = 200, description = "Room with its images; failed files listed as warnings", body = RoomImagesResponse),
        (status = 400, description = "No files sent", body = ApiError),
        (status = 404, description = "Room not found", body = ApiError)
    ),
    tag = "rooms"
)]
pub async fn upload_room_images(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RoomImagesResponse>, ApiError> {
    let multipart = multipart?;
    let rooms = RoomRepository::new(&state.db);
    let room = rooms.get(id).await?;

    let form = UploadForm::read(multipart, ROOM_IMAGES_FIELD).await?;
    if form.files.is_empty() {
        return Err(bad_request("No images were sent"));
    }

    let folder = format!(
        "{}/rooms/{}",
        state.config.storage.folder.trim_end_matches('/'),
        room.id
    );
    let report = upload_all(state.images.as_ref(), &folder, form.files).await;

    let room = if report.urls.is_empty() {
        room
    } else {
        rooms.append_images(room.id, report.urls, &user.username).await?
    };

    Ok(Json(RoomImagesResponse {
        room: with_rate(&state, room).await?,
        warnings: report.warnings,
    }))
}
