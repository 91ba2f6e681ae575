//! Rate entity model
//!
//! A rate names a room type and its nightly price. Rooms point at a rate,
//! so the rate is also the room type catalogue.

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Room type label, e.g. `Single`, `Double`, `Suite`
    #[sea_orm(unique)]
    pub room_type: String,

    /// Nightly price in minor currency units
    pub price_cents: i64,

    /// CSS colour of the badge shown in the admin UI
    pub badge_color: String,

    pub badge_text_color: String,

    pub description: Option<String>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::room::Entity")]
    Room,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
