//! # Front desk service
//!
//! Orchestrates the reservation lifecycle: availability search, booking,
//! amending, removal, check-in and check-out. Rules come from
//! [`crate::booking`]; rows are read and written through the repositories.
//!
//! Writes that touch both a reservation and its customer run in one
//! database transaction. Image uploads happen before that transaction and
//! are not undone if it fails.

use chrono::NaiveDate;
use metrics::counter;
use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};
use thiserror::Error;
use uuid::Uuid;

use crate::booking::{self, Balance, BookingError, DateRange, TransitionError};
use crate::error::{self, ApiError, RepositoryError};
use crate::models::{
    rate::Model as RateModel,
    reservation::{Model as ReservationModel, ReservationStatus},
    room::Model as RoomModel,
    user::Role,
};
use crate::repositories::{
    CustomerRepository, RateRepository, ReservationRepository, RoomRepository,
    reservation::{NewReservation, ReservationUpdate},
};
use crate::storage::{ImageStore, ImageUpload, upload_all};

/// The staff member performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub discount_limit_percent: i32,
}

#[derive(Debug, Error)]
pub enum FrontDeskError {
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("No rate found for room type '{0}'")]
    UnknownRoomType(String),
    #[error("Room {number} is out of service")]
    RoomOutOfService { number: String },
    #[error("Room {number} is already booked between {check_in} and {check_out}")]
    RoomTaken {
        number: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    #[error("Only Reserved reservations can be changed (status is {0})")]
    NotAmendable(ReservationStatus),
    #[error("A Checked-In reservation cannot be removed; check the guest out first")]
    GuestInHouse,
}

impl From<FrontDeskError> for ApiError {
    fn from(err: FrontDeskError) -> Self {
        match err {
            FrontDeskError::Booking(BookingError::DiscountAboveLimit { .. }) => {
                error::forbidden(Some(&err.to_string()))
            }
            FrontDeskError::Booking(inner) => error::bad_request(&inner.to_string()),
            FrontDeskError::Transition(inner) => error::bad_request(&inner.to_string()),
            FrontDeskError::Repository(inner) => inner.into(),
            FrontDeskError::Database(inner) => inner.into(),
            FrontDeskError::UnknownRoomType(_) => error::not_found(&err.to_string()),
            FrontDeskError::NotAmendable(_) => error::bad_request(&err.to_string()),
            FrontDeskError::RoomOutOfService { .. }
            | FrontDeskError::RoomTaken { .. }
            | FrontDeskError::GuestInHouse => error::conflict(&err.to_string()),
        }
    }
}

/// A completed operation plus non-fatal upload warnings.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AvailabilityQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_type: String,
}

/// Rooms free for a stay, priced at their rate.
#[derive(Debug, Clone)]
pub struct Availability {
    pub rate: RateModel,
    pub stay: DateRange,
    pub nights: i64,
    pub total_cents: i64,
    pub rooms: Vec<RoomModel>,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub customer_id: Uuid,
    pub room_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    /// Deposit taken at booking time
    pub amount_paid: i64,
    pub notes: Option<String>,
}

/// Changes to a Reserved booking; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct AmendRequest {
    pub room_id: Option<Uuid>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<i32>,
    pub notes: Option<String>,
}

/// Payment recorded at check-in or check-out.
#[derive(Debug, Clone, Default)]
pub struct Settlement {
    pub amount_paid: i64,
    /// Replaces the current discount; ignored at check-out
    pub discount: Option<i64>,
    pub notes: Option<String>,
    pub proofs: Vec<ImageUpload>,
}

pub struct FrontDesk<'a> {
    db: &'a DatabaseConnection,
    images: &'a dyn ImageStore,
    folder: &'a str,
}

impl<'a> FrontDesk<'a> {
    /// `folder` is the image store root; proofs go to `{folder}/proofs/{id}`.
    pub fn new(db: &'a DatabaseConnection, images: &'a dyn ImageStore, folder: &'a str) -> Self {
        Self { db, images, folder }
    }

    pub async fn search_availability(
        &self,
        query: AvailabilityQuery,
    ) -> Result<Availability, FrontDeskError> {
        let stay = DateRange::new(query.check_in, query.check_out)?;

        let rate = RateRepository::new(self.db)
            .find_by_room_type(&query.room_type)
            .await?
            .ok_or_else(|| FrontDeskError::UnknownRoomType(query.room_type.trim().to_string()))?;

        let candidates = RoomRepository::new(self.db)
            .list_bookable_by_rate(rate.id)
            .await?;
        let room_ids: Vec<Uuid> = candidates.iter().map(|room| room.id).collect();
        let existing = ReservationRepository::new(self.db)
            .blocking_for_rooms(&room_ids, &stay)
            .await?;

        let rooms = booking::available_rooms(candidates, &stay, &existing);
        let total_cents = booking::quote(rate.price_cents, &stay)?;

        tracing::debug!(
            room_type = %rate.room_type,
            check_in = %stay.check_in(),
            check_out = %stay.check_out(),
            available = rooms.len(),
            "Availability searched"
        );

        Ok(Availability {
            nights: stay.nights(),
            total_cents,
            rate,
            stay,
            rooms,
        })
    }

    pub async fn book(
        &self,
        actor: &Actor,
        request: BookingRequest,
    ) -> Result<ReservationModel, FrontDeskError> {
        let stay = DateRange::new(request.check_in, request.check_out)?;

        let txn = self.db.begin().await?;

        let customer = CustomerRepository::new(&txn).get(request.customer_id).await?;
        let room = RoomRepository::new(&txn).get(request.room_id).await?;
        if !room.is_available {
            return Err(FrontDeskError::RoomOutOfService {
                number: room.number,
            });
        }
        booking::check_guests(request.guests, room.capacity)?;

        let reservations = ReservationRepository::new(&txn);
        ensure_room_free(&reservations, &room, &stay, None).await?;

        let rate = RateRepository::new(&txn).get(room.rate_id).await?;
        let total = booking::quote(rate.price_cents, &stay)?;
        let balance = Balance::new(total, request.amount_paid, 0)?;

        let reservation = reservations
            .create(
                NewReservation {
                    customer_id: customer.id,
                    room_id: room.id,
                    stay,
                    guests: request.guests,
                    balance,
                    proof_urls: Vec::new(),
                    notes: request.notes,
                },
                &actor.username,
            )
            .await?;
        CustomerRepository::new(&txn)
            .set_status(customer.id, Some(ReservationStatus::Reserved), &actor.username)
            .await?;

        txn.commit().await?;

        counter!("reservations_created_total").increment(1);
        tracing::info!(
            reservation_id = %reservation.id,
            room = %room.number,
            customer_id = %customer.id,
            actor = %actor.username,
            "Reservation created"
        );

        Ok(reservation)
    }

    /// Moves or resizes a Reserved booking and re-prices it.
    pub async fn amend(
        &self,
        actor: &Actor,
        id: Uuid,
        request: AmendRequest,
    ) -> Result<ReservationModel, FrontDeskError> {
        let txn = self.db.begin().await?;
        let reservations = ReservationRepository::new(&txn);

        let existing = reservations.get(id).await?;
        if existing.status != ReservationStatus::Reserved {
            return Err(FrontDeskError::NotAmendable(existing.status));
        }

        let stay = DateRange::new(
            request.check_in.unwrap_or(existing.check_in),
            request.check_out.unwrap_or(existing.check_out),
        )?;
        let room = RoomRepository::new(&txn)
            .get(request.room_id.unwrap_or(existing.room_id))
            .await?;
        if room.id != existing.room_id && !room.is_available {
            return Err(FrontDeskError::RoomOutOfService {
                number: room.number,
            });
        }
        let guests = request.guests.unwrap_or(existing.guests);
        booking::check_guests(guests, room.capacity)?;

        ensure_room_free(&reservations, &room, &stay, Some(existing.id)).await?;

        let rate = RateRepository::new(&txn).get(room.rate_id).await?;
        let total = booking::quote(rate.price_cents, &stay)?;
        let balance = Balance::new(total, existing.paid_cents, existing.discount_cents)?;

        let updated = reservations
            .update(
                existing,
                ReservationUpdate {
                    room_id: Some(room.id),
                    stay: Some(stay),
                    guests: Some(guests),
                    balance: Some(balance),
                    notes: request.notes,
                    ..Default::default()
                },
                &actor.username,
            )
            .await?;

        txn.commit().await?;

        tracing::info!(reservation_id = %updated.id, actor = %actor.username, "Reservation amended");
        Ok(updated)
    }

    /// Deletes a reservation that is not in progress and re-mirrors the
    /// customer's status from their remaining reservations.
    pub async fn remove(&self, actor: &Actor, id: Uuid) -> Result<(), FrontDeskError> {
        let txn = self.db.begin().await?;
        let reservations = ReservationRepository::new(&txn);

        let existing = reservations.get(id).await?;
        if existing.status == ReservationStatus::CheckedIn {
            return Err(FrontDeskError::GuestInHouse);
        }

        reservations.delete(existing.id).await?;
        let latest = reservations
            .latest_for_customer(existing.customer_id)
            .await?
            .map(|r| r.status);
        CustomerRepository::new(&txn)
            .set_status(existing.customer_id, latest, &actor.username)
            .await?;

        txn.commit().await?;

        tracing::info!(reservation_id = %id, actor = %actor.username, "Reservation removed");
        Ok(())
    }

    /// `Reserved -> Checked-In`: prices the stay, applies the payment and
    /// discount, uploads proofs and mirrors the status onto the customer.
    pub async fn check_in(
        &self,
        actor: &Actor,
        id: Uuid,
        settlement: Settlement,
    ) -> Result<Outcome<ReservationModel>, FrontDeskError> {
        let existing = ReservationRepository::new(self.db).get(id).await?;
        let next = existing.status.check_in()?;

        let room = RoomRepository::new(self.db).get(existing.room_id).await?;
        let rate = RateRepository::new(self.db).get(room.rate_id).await?;
        let total = booking::quote(rate.price_cents, &DateRange::of(&existing)?)?;

        let balance =
            Balance::of(&existing).settle(total, settlement.amount_paid, settlement.discount)?;
        if settlement.discount.is_some() {
            booking::check_discount_limit(
                actor.role,
                actor.discount_limit_percent,
                balance.discount_cents,
                balance.total_cents,
            )?;
        }

        let uploads = upload_all(
            self.images,
            &self.proof_folder(existing.id),
            settlement.proofs,
        )
        .await;

        let updated = self
            .transition(actor, existing, next, balance, uploads.urls, settlement.notes)
            .await?;

        counter!("check_ins_total").increment(1);
        tracing::info!(
            reservation_id = %updated.id,
            dues_cents = updated.dues_cents,
            warnings = uploads.warnings.len(),
            actor = %actor.username,
            "Guest checked in"
        );

        Ok(Outcome {
            value: updated,
            warnings: uploads.warnings,
        })
    }

    /// `Checked-In -> Checked-Out`: records a final payment and proofs.
    pub async fn check_out(
        &self,
        actor: &Actor,
        id: Uuid,
        settlement: Settlement,
    ) -> Result<Outcome<ReservationModel>, FrontDeskError> {
        let existing = ReservationRepository::new(self.db).get(id).await?;
        let next = existing.status.check_out()?;

        let current = Balance::of(&existing);
        let balance = current.settle(current.total_cents, settlement.amount_paid, None)?;

        let uploads = upload_all(
            self.images,
            &self.proof_folder(existing.id),
            settlement.proofs,
        )
        .await;

        let updated = self
            .transition(actor, existing, next, balance, uploads.urls, settlement.notes)
            .await?;

        counter!("check_outs_total").increment(1);
        tracing::info!(
            reservation_id = %updated.id,
            dues_cents = updated.dues_cents,
            warnings = uploads.warnings.len(),
            actor = %actor.username,
            "Guest checked out"
        );

        Ok(Outcome {
            value: updated,
            warnings: uploads.warnings,
        })
    }

    async fn transition(
        &self,
        actor: &Actor,
        existing: ReservationModel,
        status: ReservationStatus,
        balance: Balance,
        proof_urls: Vec<String>,
        notes: Option<String>,
    ) -> Result<ReservationModel, FrontDeskError> {
        let customer_id = existing.customer_id;
        let txn = self.db.begin().await?;

        let updated = ReservationRepository::new(&txn)
            .update(
                existing,
                ReservationUpdate {
                    balance: Some(balance),
                    status: Some(status),
                    append_proofs: proof_urls,
                    notes,
                    ..Default::default()
                },
                &actor.username,
            )
            .await?;
        CustomerRepository::new(&txn)
            .set_status(customer_id, Some(status), &actor.username)
            .await?;

        txn.commit().await?;
        Ok(updated)
    }

    fn proof_folder(&self, reservation_id: Uuid) -> String {
        format!("{}/proofs/{}", self.folder.trim_end_matches('/'), reservation_id)
    }
}

async fn ensure_room_free<C: sea_orm::ConnectionTrait>(
    reservations: &ReservationRepository<'_, C>,
    room: &RoomModel,
    stay: &DateRange,
    ignore: Option<Uuid>,
) -> Result<(), FrontDeskError> {
    let existing = reservations.blocking_for_rooms(&[room.id], stay).await?;
    if let Some(clash) = booking::conflicts(stay, &existing, ignore).next() {
        return Err(FrontDeskError::RoomTaken {
            number: room.number.clone(),
            check_in: clash.check_in,
            check_out: clash.check_out,
        });
    }
    Ok(())
}
