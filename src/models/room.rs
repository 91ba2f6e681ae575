//! Room entity model

use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rooms")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Door number, unique within the hotel
    #[sea_orm(unique)]
    pub number: String,

    pub floor: i32,

    /// Maximum number of guests
    pub capacity: i32,

    /// Rate (room type and nightly price) of this room
    pub rate_id: Uuid,

    /// False while the room is out of service
    pub is_available: bool,

    pub description: Option<String>,

    /// JSON array of image URLs
    #[sea_orm(column_type = "JsonBinary")]
    pub images: JsonValue,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl Model {
    pub fn image_urls(&self) -> Vec<String> {
        super::string_list(&self.images)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rate::Entity",
        from = "Column::RateId",
        to = "super::rate::Column::Id"
    )]
    Rate,
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservation,
}

impl Related<super::rate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rate.def()
    }
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
