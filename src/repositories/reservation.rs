//! # Reservation Repository
//!
//! Persistence for reservations. Pricing, overlap and status rules live in
//! [`crate::booking`]; this layer stores what the front desk decided.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{Page, PageRequest, clean_optional, fetch_page};
use crate::booking::{Balance, DateRange};
use crate::error::RepositoryError;
use crate::models::reservation::{
    self, ActiveModel as ReservationActiveModel, Entity as Reservation,
    Model as ReservationModel, ReservationStatus,
};

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub customer_id: Uuid,
    pub room_id: Uuid,
    pub stay: DateRange,
    pub guests: i32,
    pub balance: Balance,
    pub proof_urls: Vec<String>,
    pub notes: Option<String>,
}

/// Changes applied to a stored reservation. Proof URLs are appended.
#[derive(Debug, Clone, Default)]
pub struct ReservationUpdate {
    pub room_id: Option<Uuid>,
    pub stay: Option<DateRange>,
    pub guests: Option<i32>,
    pub balance: Option<Balance>,
    pub status: Option<ReservationStatus>,
    pub append_proofs: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub customer_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
}

pub struct ReservationRepository<'a, C: ConnectionTrait = DatabaseConnection> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ReservationRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        request: NewReservation,
        actor: &str,
    ) -> Result<ReservationModel, RepositoryError> {
        let now = Utc::now();
        let reservation = ReservationActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(request.customer_id),
            room_id: Set(request.room_id),
            check_in: Set(request.stay.check_in()),
            check_out: Set(request.stay.check_out()),
            guests: Set(request.guests),
            total_cents: Set(request.balance.total_cents),
            paid_cents: Set(request.balance.paid_cents),
            discount_cents: Set(request.balance.discount_cents),
            dues_cents: Set(request.balance.dues_cents),
            proof_of_payment: Set(JsonValue::from(request.proof_urls)),
            status: Set(ReservationStatus::Reserved),
            notes: Set(clean_optional(request.notes)),
            checked_in_at: Set(None),
            checked_out_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            created_by: Set(Some(actor.to_string())),
            updated_by: Set(Some(actor.to_string())),
        };

        reservation
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ReservationModel>, RepositoryError> {
        Reservation::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<ReservationModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Reservation not found"))
    }

    /// Newest stays first.
    pub async fn list(
        &self,
        filter: ReservationFilter,
        request: PageRequest,
    ) -> Result<Page<ReservationModel>, RepositoryError> {
        let mut select = Reservation::find()
            .order_by_desc(reservation::Column::CheckIn)
            .order_by_desc(reservation::Column::CreatedAt);
        if let Some(status) = filter.status {
            select = select.filter(reservation::Column::Status.eq(status));
        }
        if let Some(customer_id) = filter.customer_id {
            select = select.filter(reservation::Column::CustomerId.eq(customer_id));
        }
        if let Some(room_id) = filter.room_id {
            select = select.filter(reservation::Column::RoomId.eq(room_id));
        }
        fetch_page(self.db, select, request).await
    }

    /// Blocking reservations on `room_ids` that overlap `stay`.
    pub async fn blocking_for_rooms(
        &self,
        room_ids: &[Uuid],
        stay: &DateRange,
    ) -> Result<Vec<ReservationModel>, RepositoryError> {
        if room_ids.is_empty() {
            return Ok(Vec::new());
        }

        Reservation::find()
            .filter(reservation::Column::RoomId.is_in(room_ids.iter().copied()))
            .filter(reservation::Column::Status.is_in([
                ReservationStatus::Reserved,
                ReservationStatus::CheckedIn,
            ]))
            .filter(reservation::Column::CheckIn.lt(stay.check_out()))
            .filter(reservation::Column::CheckOut.gt(stay.check_in()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        existing: ReservationModel,
        update: ReservationUpdate,
        actor: &str,
    ) -> Result<ReservationModel, RepositoryError> {
        let mut proofs = existing.proof_urls();
        let mut active = existing.into_active_model();
        let now = Utc::now();

        if let Some(room_id) = update.room_id {
            active.room_id = Set(room_id);
        }
        if let Some(stay) = update.stay {
            active.check_in = Set(stay.check_in());
            active.check_out = Set(stay.check_out());
        }
        if let Some(guests) = update.guests {
            active.guests = Set(guests);
        }
        if let Some(balance) = update.balance {
            active.total_cents = Set(balance.total_cents);
            active.paid_cents = Set(balance.paid_cents);
            active.discount_cents = Set(balance.discount_cents);
            active.dues_cents = Set(balance.dues_cents);
        }
        if let Some(status) = update.status {
            active.status = Set(status);
            match status {
                ReservationStatus::CheckedIn => active.checked_in_at = Set(Some(now.into())),
                ReservationStatus::CheckedOut => active.checked_out_at = Set(Some(now.into())),
                ReservationStatus::Reserved => {}
            }
        }
        if !update.append_proofs.is_empty() {
            proofs.extend(update.append_proofs);
            active.proof_of_payment = Set(JsonValue::from(proofs));
        }
        if let Some(notes) = update.notes {
            active.notes = Set(clean_optional(Some(notes)));
        }
        active.updated_at = Set(now.into());
        active.updated_by = Set(Some(actor.to_string()));

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = Reservation::delete_by_id(id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Reservation not found"));
        }
        Ok(())
    }

    /// Most recent reservation of a customer, if any.
    pub async fn latest_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Option<ReservationModel>, RepositoryError> {
        Reservation::find()
            .filter(reservation::Column::CustomerId.eq(customer_id))
            .order_by_desc(reservation::Column::UpdatedAt)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
