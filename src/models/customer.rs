//! Customer entity model
//!
//! Guests on record. A married customer may point at their spouse, and
//! `status` mirrors the status of the customer's latest reservation.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::reservation::ReservationStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub nationality: Option<String>,

    /// Passport or national id document number
    pub id_number: Option<String>,

    pub date_of_birth: Option<Date>,

    pub marriage_status: MarriageStatus,

    /// Another customer; only set when `marriage_status` is `Married`
    pub spouse_id: Option<Uuid>,

    pub status: Option<ReservationStatus>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum MarriageStatus {
    #[sea_orm(string_value = "Single")]
    #[default]
    Single,

    #[sea_orm(string_value = "Married")]
    Married,

    #[sea_orm(string_value = "Divorced")]
    Divorced,

    #[sea_orm(string_value = "Widowed")]
    Widowed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::SpouseId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Spouse,
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservation,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
