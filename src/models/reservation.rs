//! Reservation entity model
//!
//! Amounts are in minor currency units. The service layer keeps
//! `dues_cents = total_cents - discount_cents - paid_cents`.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub customer_id: Uuid,
    pub room_id: Uuid,

    /// First night of the stay
    pub check_in: Date,

    /// Departure day; the room is free again on this date
    pub check_out: Date,

    pub guests: i32,

    pub total_cents: i64,
    pub paid_cents: i64,
    pub discount_cents: i64,
    pub dues_cents: i64,

    /// JSON array of proof-of-payment image URLs
    #[sea_orm(column_type = "JsonBinary")]
    pub proof_of_payment: JsonValue,

    pub status: ReservationStatus,

    pub notes: Option<String>,

    pub checked_in_at: Option<DateTimeWithTimeZone>,
    pub checked_out_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl Model {
    pub fn proof_urls(&self) -> Vec<String> {
        super::string_list(&self.proof_of_payment)
    }
}

/// Lifecycle of a stay: `Reserved -> Checked-In -> Checked-Out`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ReservationStatus {
    #[sea_orm(string_value = "Reserved")]
    #[serde(rename = "Reserved")]
    #[default]
    Reserved,

    #[sea_orm(string_value = "Checked-In")]
    #[serde(rename = "Checked-In")]
    CheckedIn,

    #[sea_orm(string_value = "Checked-Out")]
    #[serde(rename = "Checked-Out")]
    CheckedOut,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "Reserved",
            ReservationStatus::CheckedIn => "Checked-In",
            ReservationStatus::CheckedOut => "Checked-Out",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
