//! # Reservation API Handlers
//!
//! Availability search, booking CRUD and the check-in / check-out
//! endpoints. The reservation lifecycle itself lives in
//! [`crate::front_desk`].

use axum::{
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::front_desk::{
    AmendRequest, AvailabilityQuery, BookingRequest, FrontDesk, Outcome, Settlement,
};
use crate::handlers::rooms::RoomResponse;
use crate::handlers::types::PaginatedResponse;
use crate::handlers::uploads::UploadForm;
use crate::models::reservation::{Model as ReservationModel, ReservationStatus};
use crate::repositories::{
    PageRequest, ReservationRepository, reservation::ReservationFilter,
};
use crate::server::AppState;

/// Multipart field carrying proof-of-payment images
pub const PROOF_FIELD: &str = "proof_of_payment";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    pub guests: i32,
    /// Amounts in cents
    pub total_cents: i64,
    pub paid_cents: i64,
    pub discount_cents: i64,
    pub dues_cents: i64,
    pub proof_of_payment: Vec<String>,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReservationModel> for ReservationResponse {
    fn from(reservation: ReservationModel) -> Self {
        Self {
            proof_of_payment: reservation.proof_urls(),
            nights: (reservation.check_out - reservation.check_in).num_days(),
            id: reservation.id,
            customer_id: reservation.customer_id,
            room_id: reservation.room_id,
            check_in: reservation.check_in,
            check_out: reservation.check_out,
            guests: reservation.guests,
            total_cents: reservation.total_cents,
            paid_cents: reservation.paid_cents,
            discount_cents: reservation.discount_cents,
            dues_cents: reservation.dues_cents,
            status: reservation.status,
            notes: reservation.notes,
            checked_in_at: reservation.checked_in_at.map(|at| at.with_timezone(&Utc)),
            checked_out_at: reservation.checked_out_at.map(|at| at.with_timezone(&Utc)),
            created_by: reservation.created_by,
            created_at: reservation.created_at.with_timezone(&Utc),
            updated_at: reservation.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityParams {
    /// First night, `YYYY-MM-DD`
    pub check_in: NaiveDate,
    /// Departure day, `YYYY-MM-DD`
    pub check_out: NaiveDate,
    /// Room type of a rate, e.g. `Single`
    pub room_type: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    pub room_type: String,
    pub rate_id: Uuid,
    pub price_cents: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: i64,
    /// Quoted price of the stay in cents
    pub total_cents: i64,
    pub rooms: Vec<RoomResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationListQuery {
    pub status: Option<ReservationStatus>,
    pub customer_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    pub customer_id: Uuid,
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default = "default_guests")]
    pub guests: i32,
    /// Deposit in cents
    #[serde(default)]
    pub amount_paid: i64,
    pub notes: Option<String>,
}

fn default_guests() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReservationRequest {
    pub room_id: Option<Uuid>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<i32>,
    pub notes: Option<String>,
}

/// Result of a check-in or check-out
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusChangeResponse {
    pub message: String,
    pub reservation: ReservationResponse,
    /// Proof images that could not be uploaded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl StatusChangeResponse {
    fn new(message: &str, outcome: Outcome<ReservationModel>) -> Self {
        Self {
            message: message.to_string(),
            reservation: ReservationResponse::from(outcome.value),
            warnings: outcome.warnings,
        }
    }
}

fn front_desk(state: &AppState) -> FrontDesk<'_> {
    FrontDesk::new(&state.db, state.images.as_ref(), &state.config.storage.folder)
}

async fn read_settlement(multipart: Multipart, with_discount: bool) -> Result<Settlement, ApiError> {
    let form = UploadForm::read(multipart, PROOF_FIELD).await?;
    let discount = if with_discount {
        form.amount("discount")?
    } else {
        None
    };

    Ok(Settlement {
        amount_paid: form.amount("amount_paid")?.unwrap_or(0),
        discount,
        notes: form.text("notes"),
        proofs: form.files,
    })
}

#[utoipa::path(
    get,
    path = "/admin/reservations/availability",
    security(("bearer_auth" = [])),
    params(AvailabilityParams),
    responses(
        (status = 200, description = "Rooms of the type free for the whole stay", body = AvailabilityResponse),
        (status = 400, description = "Invalid date range", body = ApiError),
        (status = 404, description = "Unknown room type", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn search_availability(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<AvailabilityParams>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let Query(params) = query?;

    let availability = front_desk(&state)
        .search_availability(AvailabilityQuery {
            check_in: params.check_in,
            check_out: params.check_out,
            room_type: params.room_type,
        })
        .await?;

    let rate = availability.rate;
    Ok(Json(AvailabilityResponse {
        room_type: rate.room_type.clone(),
        rate_id: rate.id,
        price_cents: rate.price_cents,
        check_in: availability.stay.check_in(),
        check_out: availability.stay.check_out(),
        nights: availability.nights,
        total_cents: availability.total_cents,
        rooms: availability
            .rooms
            .into_iter()
            .map(|room| RoomResponse::new(room, &rate))
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/admin/reservations",
    security(("bearer_auth" = [])),
    params(ReservationListQuery),
    responses(
        (status = 200, description = "Reservations, latest stays first", body = PaginatedResponse<ReservationResponse>),
        (status = 400, description = "Invalid filter", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    _user: CurrentUser,
    query: Result<Query<ReservationListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<ReservationResponse>>, ApiError> {
    let Query(query) = query?;

    let page = ReservationRepository::new(&state.db)
        .list(
            ReservationFilter {
                status: query.status,
                customer_id: query.customer_id,
                room_id: query.room_id,
            },
            PageRequest::new(query.page, query.per_page),
        )
        .await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

#[utoipa::path(
    post,
    path = "/admin/reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = ReservationResponse),
        (status = 400, description = "Invalid dates, guests or amount", body = ApiError),
        (status = 404, description = "Customer or room not found", body = ApiError),
        (status = 409, description = "Room already booked for those dates", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let Json(request) = payload?;

    let reservation = front_desk(&state)
        .book(
            &user.actor(),
            BookingRequest {
                customer_id: request.customer_id,
                room_id: request.room_id,
                check_in: request.check_in,
                check_out: request.check_out,
                guests: request.guests,
                amount_paid: request.amount_paid,
                notes: request.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ReservationResponse::from(reservation))))
}

#[utoipa::path(
    get,
    path = "/admin/reservations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation", body = ReservationResponse),
        (status = 404, description = "Reservation not found", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = ReservationRepository::new(&state.db).get(id).await?;
    Ok(Json(ReservationResponse::from(reservation)))
}

#[utoipa::path(
    put,
    path = "/admin/reservations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation id")),
    request_body = UpdateReservationRequest,
    responses(
        (status = 200, description = "Amended and re-priced reservation", body = ReservationResponse),
        (status = 400, description = "Not Reserved, or invalid dates", body = ApiError),
        (status = 404, description = "Reservation not found", body = ApiError),
        (status = 409, description = "Room already booked for those dates", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn update_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateReservationRequest>, JsonRejection>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let Json(request) = payload?;

    let reservation = front_desk(&state)
        .amend(
            &user.actor(),
            id,
            AmendRequest {
                room_id: request.room_id,
                check_in: request.check_in,
                check_out: request.check_out,
                guests: request.guests,
                notes: request.notes,
            },
        )
        .await?;

    Ok(Json(ReservationResponse::from(reservation)))
}

#[utoipa::path(
    delete,
    path = "/admin/reservations/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation id")),
    responses(
        (status = 204, description = "Reservation removed"),
        (status = 404, description = "Reservation not found", body = ApiError),
        (status = 409, description = "Guest is checked in", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn delete_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    front_desk(&state).remove(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Checks the guest in. Multipart fields: `amount_paid` and optional
/// `discount` (cents), `notes`, and any number of `proof_of_payment` images.
#[utoipa::path(
    post,
    path = "/admin/reservations/{id}/check-in",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation id")),
    request_body(content_type = "multipart/form-data", description = "amount_paid, discount, notes, proof_of_payment files"),
    responses(
        (status = 200, description = "Checked in; failed uploads listed as warnings", body = StatusChangeResponse),
        (status = 400, description = "Already Checked-In / Checked-Out, or invalid amounts", body = ApiError),
        (status = 403, description = "Discount above the user's limit", body = ApiError),
        (status = 404, description = "Reservation not found", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn check_in(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StatusChangeResponse>, ApiError> {
    let settlement = read_settlement(multipart?, true).await?;
    let outcome = front_desk(&state)
        .check_in(&user.actor(), id, settlement)
        .await?;
    Ok(Json(StatusChangeResponse::new("Checked in", outcome)))
}

/// Checks the guest out. Multipart fields: `amount_paid` (cents), `notes`
/// and any number of `proof_of_payment` images.
#[utoipa::path(
    post,
    path = "/admin/reservations/{id}/check-out",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation id")),
    request_body(content_type = "multipart/form-data", description = "amount_paid, notes, proof_of_payment files"),
    responses(
        (status = 200, description = "Checked out; failed uploads listed as warnings", body = StatusChangeResponse),
        (status = 400, description = "Not Checked-In or already Checked-Out, or invalid amount", body = ApiError),
        (status = 404, description = "Reservation not found", body = ApiError)
    ),
    tag = "reservations"
)]
pub async fn check_out(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StatusChangeResponse>, ApiError> {
    let settlement = read_settlement(multipart?, false).await?;
    let outcome = front_desk(&state)
        .check_out(&user.actor(), id, settlement)
        .await?;
    Ok(Json(StatusChangeResponse::new("Checked out", outcome)))
}
