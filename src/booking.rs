//! # Booking rules
//!
//! Pure reservation logic with no database access: stay date ranges and
//! their overlap test, availability filtering, pricing, balance
//! bookkeeping and the `Reserved -> Checked-In -> Checked-Out` state
//! machine. The front desk service loads rows, applies these rules and
//! persists the outcome.

use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{reservation, reservation::ReservationStatus, room, user::Role};

/// Rule violations detected while pricing or settling a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("check_out ({check_out}) must be after check_in ({check_in})")]
    InvalidRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    #[error("{field} cannot be negative")]
    NegativeAmount { field: &'static str },
    #[error("Discount ({discount}) cannot exceed the total ({total})")]
    DiscountExceedsTotal { discount: i64, total: i64 },
    #[error("Payment ({amount}) exceeds the remaining dues ({dues})")]
    Overpayment { amount: i64, dues: i64 },
    #[error("Discount exceeds your limit of {limit_percent}% of the total")]
    DiscountAboveLimit { limit_percent: i32 },
    #[error("Guests must be at least 1")]
    InvalidGuests,
    #[error("Room holds at most {capacity} guests, {guests} requested")]
    OverCapacity { capacity: i32, guests: i32 },
    #[error("Amount is too large")]
    AmountOverflow,
}

/// Rejected status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Already Checked-In")]
    AlreadyCheckedIn,
    #[error("Already Checked-Out")]
    AlreadyCheckedOut,
    #[error("Reservation is not Checked-In")]
    NotCheckedIn,
}

/// A stay from `check_in` (first night) to `check_out` (departure day).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl DateRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, BookingError> {
        if check_out <= check_in {
            return Err(BookingError::InvalidRange {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn of(reservation: &reservation::Model) -> Result<Self, BookingError> {
        Self::new(reservation.check_in, reservation.check_out)
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Two stays overlap unless one ends on or before the day the other
    /// begins. A departure day may be the next guest's arrival day.
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        let disjoint = self.check_out <= check_in || self.check_in >= check_out;
        !disjoint
    }
}

impl ReservationStatus {
    /// Whether a reservation in this status keeps its room occupied.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Reserved | ReservationStatus::CheckedIn
        )
    }

    pub fn check_in(self) -> Result<ReservationStatus, TransitionError> {
        match self {
            ReservationStatus::Reserved => Ok(ReservationStatus::CheckedIn),
            ReservationStatus::CheckedIn => Err(TransitionError::AlreadyCheckedIn),
            ReservationStatus::CheckedOut => Err(TransitionError::AlreadyCheckedOut),
        }
    }

    pub fn check_out(self) -> Result<ReservationStatus, TransitionError> {
        match self {
            ReservationStatus::CheckedIn => Ok(ReservationStatus::CheckedOut),
            ReservationStatus::CheckedOut => Err(TransitionError::AlreadyCheckedOut),
            ReservationStatus::Reserved => Err(TransitionError::NotCheckedIn),
        }
    }
}

/// Blocking reservations in `existing` that collide with `range`, skipping
/// the reservation `ignore` (the one being amended).
pub fn conflicts<'a>(
    range: &DateRange,
    existing: &'a [reservation::Model],
    ignore: Option<Uuid>,
) -> impl Iterator<Item = &'a reservation::Model> + use<'a> {
    let range = *range;
    existing.iter().filter(move |r| {
        Some(r.id) != ignore
            && r.status.is_blocking()
            && range.overlaps(r.check_in, r.check_out)
    })
}

/// Rooms of the requested type that are in service and have no blocking
/// reservation overlapping `range`.
///
/// `existing` may contain reservations of any room and status; only the
/// blocking ones that overlap take a room out of the result.
pub fn available_rooms(
    rooms: Vec<room::Model>,
    range: &DateRange,
    existing: &[reservation::Model],
) -> Vec<room::Model> {
    let taken: HashSet<Uuid> = conflicts(range, existing, None)
        .map(|r| r.room_id)
        .collect();

    rooms
        .into_iter()
        .filter(|room| room.is_available && !taken.contains(&room.id))
        .collect()
}

/// Price of a stay: nightly rate times nights.
pub fn quote(price_cents: i64, range: &DateRange) -> Result<i64, BookingError> {
    if price_cents < 0 {
        return Err(BookingError::NegativeAmount { field: "price" });
    }
    price_cents
        .checked_mul(range.nights())
        .ok_or(BookingError::AmountOverflow)
}

pub fn check_guests(guests: i32, capacity: i32) -> Result<(), BookingError> {
    if guests < 1 {
        return Err(BookingError::InvalidGuests);
    }
    if guests > capacity {
        return Err(BookingError::OverCapacity { capacity, guests });
    }
    Ok(())
}

/// Refuses discounts above the user's limit. Admins have no limit.
pub fn check_discount_limit(
    role: Role,
    limit_percent: i32,
    discount_cents: i64,
    total_cents: i64,
) -> Result<(), BookingError> {
    if role == Role::Admin || discount_cents == 0 {
        return Ok(());
    }

    // discount / total <= limit / 100, kept in integers
    let allowed = i128::from(total_cents) * i128::from(limit_percent.clamp(0, 100));
    if i128::from(discount_cents) * 100 > allowed {
        return Err(BookingError::DiscountAboveLimit { limit_percent });
    }
    Ok(())
}

/// Money owed on a reservation. `dues = total - discount - paid` and never
/// goes negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub total_cents: i64,
    pub paid_cents: i64,
    pub discount_cents: i64,
    pub dues_cents: i64,
}

impl Balance {
    pub fn new(total_cents: i64, paid_cents: i64, discount_cents: i64) -> Result<Self, BookingError> {
        if total_cents < 0 {
            return Err(BookingError::NegativeAmount { field: "total" });
        }
        if paid_cents < 0 {
            return Err(BookingError::NegativeAmount {
                field: "amount_paid",
            });
        }
        if discount_cents < 0 {
            return Err(BookingError::NegativeAmount { field: "discount" });
        }
        if discount_cents > total_cents {
            return Err(BookingError::DiscountExceedsTotal {
                discount: discount_cents,
                total: total_cents,
            });
        }

        let payable = total_cents - discount_cents;
        if paid_cents > payable {
            return Err(BookingError::Overpayment {
                amount: paid_cents,
                dues: payable,
            });
        }

        Ok(Self {
            total_cents,
            paid_cents,
            discount_cents,
            dues_cents: payable - paid_cents,
        })
    }

    pub fn of(reservation: &reservation::Model) -> Self {
        Self {
            total_cents: reservation.total_cents,
            paid_cents: reservation.paid_cents,
            discount_cents: reservation.discount_cents,
            dues_cents: reservation.dues_cents,
        }
    }

    /// Re-prices the stay at `total_cents`, optionally replaces the
    /// discount, and records a further payment of `amount_cents`.
    pub fn settle(
        &self,
        total_cents: i64,
        amount_cents: i64,
        discount_cents: Option<i64>,
    ) -> Result<Self, BookingError> {
        if amount_cents < 0 {
            return Err(BookingError::NegativeAmount {
                field: "amount_paid",
            });
        }

        let discount = discount_cents.unwrap_or(self.discount_cents);
        if discount < 0 {
            return Err(BookingError::NegativeAmount { field: "discount" });
        }
        if discount > total_cents {
            return Err(BookingError::DiscountExceedsTotal {
                discount,
                total: total_cents,
            });
        }

        let dues = total_cents - discount - self.paid_cents;
        if amount_cents > dues.max(0) || dues < 0 {
            return Err(BookingError::Overpayment {
                amount: amount_cents,
                dues: dues.max(0),
            });
        }

        let paid = self
            .paid_cents
            .checked_add(amount_cents)
            .ok_or(BookingError::AmountOverflow)?;

        Balance::new(total_cents, paid, discount)
    }
}
