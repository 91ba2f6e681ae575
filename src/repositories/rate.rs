//! # Rate Repository
//!
//! Room types and their nightly prices.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::{Page, PageRequest, clean_optional, fetch_page, required_text};
use crate::error::RepositoryError;
use crate::models::rate::{self, ActiveModel as RateActiveModel, Entity as Rate, Model as RateModel};
use crate::models::room::{self, Entity as Room};

pub const DEFAULT_BADGE_COLOR: &str = "#e2e8f0";
pub const DEFAULT_BADGE_TEXT_COLOR: &str = "#1a202c";

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid colour pattern")
});

#[derive(Debug, Clone)]
pub struct NewRate {
    pub room_type: String,
    pub price_cents: i64,
    pub badge_color: Option<String>,
    pub badge_text_color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RateChanges {
    pub room_type: Option<String>,
    pub price_cents: Option<i64>,
    pub badge_color: Option<String>,
    pub badge_text_color: Option<String>,
    pub description: Option<String>,
}

pub struct RateRepository<'a, C: ConnectionTrait = DatabaseConnection> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> RateRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, request: NewRate, actor: Option<&str>) -> Result<RateModel, RepositoryError> {
        let room_type = required_text(&request.room_type, "room_type", 64)?;
        validate_price(request.price_cents)?;
        let badge_color = color_or_default(request.badge_color, DEFAULT_BADGE_COLOR, "badge_color")?;
        let badge_text_color =
            color_or_default(request.badge_text_color, DEFAULT_BADGE_TEXT_COLOR, "badge_text_color")?;

        if self.find_by_room_type(&room_type).await?.is_some() {
            return Err(RepositoryError::conflict(format!(
                "A rate for room type '{room_type}' already exists"
            )));
        }

        let now = Utc::now();
        let rate = RateActiveModel {
            id: Set(Uuid::new_v4()),
            room_type: Set(room_type),
            price_cents: Set(request.price_cents),
            badge_color: Set(badge_color),
            badge_text_color: Set(badge_text_color),
            description: Set(clean_optional(request.description)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            created_by: Set(actor.map(str::to_string)),
            updated_by: Set(actor.map(str::to_string)),
        };

        rate.insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RateModel>, RepositoryError> {
        Rate::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<RateModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Rate not found"))
    }

    /// Case-sensitive lookup by room type label.
    pub async fn find_by_room_type(&self, room_type: &str) -> Result<Option<RateModel>, RepositoryError> {
        Rate::find()
            .filter(rate::Column::RoomType.eq(room_type.trim()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(&self, request: PageRequest) -> Result<Page<RateModel>, RepositoryError> {
        let select = Rate::find().order_by_asc(rate::Column::PriceCents);
        fetch_page(self.db, select, request).await
    }

    pub async fn list_all(&self) -> Result<Vec<RateModel>, RepositoryError> {
        Rate::find()
            .order_by_asc(rate::Column::PriceCents)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: RateChanges,
        actor: &str,
    ) -> Result<RateModel, RepositoryError> {
        let existing = self.get(id).await?;
        let mut active = existing.clone().into_active_model();

        if let Some(room_type) = changes.room_type {
            let room_type = required_text(&room_type, "room_type", 64)?;
            if room_type != existing.room_type
                && self.find_by_room_type(&room_type).await?.is_some()
            {
                return Err(RepositoryError::conflict(format!(
                    "A rate for room type '{room_type}' already exists"
                )));
            }
            active.room_type = Set(room_type);
        }
        if let Some(price) = changes.price_cents {
            validate_price(price)?;
            active.price_cents = Set(price);
        }
        if let Some(color) = changes.badge_color {
            active.badge_color = Set(validate_color(&color, "badge_color")?);
        }
        if let Some(color) = changes.badge_text_color {
            active.badge_text_color = Set(validate_color(&color, "badge_text_color")?);
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

    /// Deletes a rate no room refers to.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let existing = self.get(id).await?;

        let rooms = Room::find()
            .filter(room::Column::RateId.eq(existing.id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if rooms > 0 {
            return Err(RepositoryError::conflict(format!(
                "Rate is used by {rooms} room(s)"
            )));
        }

        Rate::delete_by_id(existing.id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

fn validate_price(price_cents: i64) -> Result<(), RepositoryError> {
    if price_cents < 0 {
        return Err(RepositoryError::validation_error("price cannot be negative"));
    }
    Ok(())
}

fn validate_color(value: &str, field: &str) -> Result<String, RepositoryError> {
    let value = value.trim();
    if !HEX_COLOR.is_match(value) {
        return Err(RepositoryError::validation_error(format!(
            "{field} must be a hex colour such as #1a202c"
        )));
    }
    Ok(value.to_string())
}

fn color_or_default(
    value: Option<String>,
    default: &str,
    field: &str,
) -> Result<String, RepositoryError> {
    match clean_optional(value) {
        Some(color) => validate_color(&color, field),
        None => Ok(default.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tests_support::setup_db;

    fn new_rate(room_type: &str, price_cents: i64) -> NewRate {
        NewRate {
            room_type: room_type.to_string(),
            price_cents,
            badge_color: None,
            badge_text_color: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn create_applies_badge_defaults() {
        let db = setup_db().await;
        let repo = RateRepository::new(&db);

        let rate = repo.create(new_rate("Single", 8_000), Some("admin")).await.unwrap();
        assert_eq!(rate.badge_color, DEFAULT_BADGE_COLOR);
        assert_eq!(rate.badge_text_color, DEFAULT_BADGE_TEXT_COLOR);

        let found = repo.find_by_room_type("Single").await.unwrap().unwrap();
        assert_eq!(found.id, rate.id);
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let db = setup_db().await;
        let repo = RateRepository::new(&db);

        assert!(matches!(
            repo.create(new_rate("Single", -1), None).await,
            Err(RepositoryError::Validation(_))
        ));

        let mut request = new_rate("Double", 100);
        request.badge_color = Some("red".to_string());
        assert!(matches!(
            repo.create(request, None).await,
            Err(RepositoryError::Validation(_))
        ));

        repo.create(new_rate("Suite", 100), None).await.unwrap();
        assert!(matches!(
            repo.create(new_rate("Suite", 200), None).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn update_changes_price_and_colour() {
        let db = setup_db().await;
        let repo = RateRepository::new(&db);
        let rate = repo.create(new_rate("Double", 12_000), None).await.unwrap();

        let updated = repo
            .update(
                rate.id,
                RateChanges {
                    price_cents: Some(13_500),
                    badge_color: Some("#FFF".to_string()),
                    ..Default::default()
                },
                "admin",
            )
            .await
            .unwrap();

        assert_eq!(updated.price_cents, 13_500);
        assert_eq!(updated.badge_color, "#FFF");
        assert_eq!(updated.updated_by.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn list_orders_by_price() {
        let db = setup_db().await;
        let repo = RateRepository::new(&db);
        repo.create(new_rate("Suite", 30_000), None).await.unwrap();
        repo.create(new_rate("Single", 8_000), None).await.unwrap();

        let all = repo.list_all().await.unwrap();
        let types: Vec<_> = all.iter().map(|r| r.room_type.as_str()).collect();
        assert_eq!(types, vec!["Single", "Suite"]);
    }

    #[tokio::test]
    async fn delete_unused_rate() {
        let db = setup_db().await;
        let repo = RateRepository::new(&db);
        let rate = repo.create(new_rate("Single", 8_000), None).await.unwrap();

        repo.delete(rate.id).await.unwrap();
        assert!(repo.find_by_id(rate.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(rate.id).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
