//! # Room Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{Page, PageRequest, clean_optional, fetch_page, required_text};
use crate::error::RepositoryError;
use crate::models::rate::Entity as Rate;
use crate::models::reservation::{self, Entity as Reservation};
use crate::models::room::{self, ActiveModel as RoomActiveModel, Entity as Room, Model as RoomModel};

pub const MAX_ROOM_CAPACITY: i32 = 20;

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub number: String,
    pub floor: i32,
    pub capacity: i32,
    pub rate_id: Uuid,
    pub is_available: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RoomChanges {
    pub number: Option<String>,
    pub floor: Option<i32>,
    pub capacity: Option<i32>,
    pub rate_id: Option<Uuid>,
    pub is_available: Option<bool>,
    pub description: Option<String>,
}

/// List filters; all optional.
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub rate_id: Option<Uuid>,
    pub is_available: Option<bool>,
}

pub struct RoomRepository<'a, C: ConnectionTrait = DatabaseConnection> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> RoomRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, request: NewRoom, actor: Option<&str>) -> Result<RoomModel, RepositoryError> {
        let number = required_text(&request.number, "number", 16)?;
        validate_layout(request.floor, request.capacity)?;
        self.ensure_rate_exists(request.rate_id).await?;

        if self.find_by_number(&number).await?.is_some() {
            return Err(RepositoryError::conflict(format!(
                "Room '{number}' already exists"
            )));
        }

        let now = Utc::now();
        let room = RoomActiveModel {
            id: Set(Uuid::new_v4()),
            number: Set(number),
            floor: Set(request.floor),
            capacity: Set(request.capacity),
            rate_id: Set(request.rate_id),
            is_available: Set(request.is_available),
            description: Set(clean_optional(request.description)),
            images: Set(JsonValue::Array(Vec::new())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            created_by: Set(actor.map(str::to_string)),
            updated_by: Set(actor.map(str::to_string)),
        };

        room.insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RoomModel>, RepositoryError> {
        Room::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<RoomModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Room not found"))
    }

    pub async fn find_by_number(&self, number: &str) -> Result<Option<RoomModel>, RepositoryError> {
        Room::find()
            .filter(room::Column::Number.eq(number.trim()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        filter: RoomFilter,
        request: PageRequest,
    ) -> Result<Page<RoomModel>, RepositoryError> {
        let mut select = Room::find().order_by_asc(room::Column::Number);
        if let Some(rate_id) = filter.rate_id {
            select = select.filter(room::Column::RateId.eq(rate_id));
        }
        if let Some(is_available) = filter.is_available {
            select = select.filter(room::Column::IsAvailable.eq(is_available));
        }
        fetch_page(self.db, select, request).await
    }

    /// In-service rooms of one rate, the candidates of an availability search.
    pub async fn list_bookable_by_rate(&self, rate_id: Uuid) -> Result<Vec<RoomModel>, RepositoryError> {
        Room::find()
            .filter(room::Column::RateId.eq(rate_id))
            .filter(room::Column::IsAvailable.eq(true))
            .order_by_asc(room::Column::Number)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: RoomChanges,
        actor: &str,
    ) -> Result<RoomModel, RepositoryError> {
        let existing = self.get(id).await?;

        validate_layout(
            changes.floor.unwrap_or(existing.floor),
            changes.capacity.unwrap_or(existing.capacity),
        )?;

        let mut active = existing.clone().into_active_model();
        if let Some(number) = changes.number {
            let number = required_text(&number, "number", 16)?;
            if number != existing.number && self.find_by_number(&number).await?.is_some() {
                return Err(RepositoryError::conflict(format!(
                    "Room '{number}' already exists"
                )));
            }
            active.number = Set(number);
        }
        if let Some(rate_id) = changes.rate_id {
            self.ensure_rate_exists(rate_id).await?;
            active.rate_id = Set(rate_id);
        }
        if let Some(floor) = changes.floor {
            active.floor = Set(floor);
        }
        if let Some(capacity) = changes.capacity {
            active.capacity = Set(capacity);
        }
        if let Some(is_available) = changes.is_available {
            active.is_available = Set(is_available);
        }
        if let Some(description) = changes.description {
            active.description = Set(clean_optional(Some(description)));
        }
        active.updated_at = Set(Utc::now().into());
        active.updated_by = Set(Some(actor.to_string()));

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Appends uploaded image URLs, keeping existing ones.
    pub async fn append_images(
        &self,
        id: Uuid,
        urls: Vec<String>,
        actor: &str,
    ) -> Result<RoomModel, RepositoryError> {
        let existing = self.get(id).await?;
        let mut images = existing.image_urls();
        images.extend(urls);

        let mut active = existing.into_active_model();
        active.images = Set(JsonValue::from(images));
        active.updated_at = Set(Utc::now().into());
        active.updated_by = Set(Some(actor.to_string()));

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Deletes a room without reservation history.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let existing = self.get(id).await?;

        let reservations = Reservation::find()
            .filter(reservation::Column::RoomId.eq(existing.id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if reservations > 0 {
            return Err(RepositoryError::conflict(format!(
                "Room has {reservations} reservation(s)"
            )));
        }

        Room::delete_by_id(existing.id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    async fn ensure_rate_exists(&self, rate_id: Uuid) -> Result<(), RepositoryError> {
        let exists = Rate::find_by_id(rate_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .is_some();
        if !exists {
            return Err(RepositoryError::validation_error("rate_id does not refer to a rate"));
        }
        Ok(())
    }
}

fn validate_layout(floor: i32, capacity: i32) -> Result<(), RepositoryError> {
    if floor < 0 {
        return Err(RepositoryError::validation_error("floor cannot be negative"));
    }
    if !(1..=MAX_ROOM_CAPACITY).contains(&capacity) {
        return Err(RepositoryError::validation_error(format!(
            "capacity must be between 1 and {MAX_ROOM_CAPACITY}"
        )));
    }
    Ok(())
}
