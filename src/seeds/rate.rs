//! Starter rates so a fresh install can take bookings right away.

use anyhow::Result;
use sea_orm::DatabaseConnection;

use crate::repositories::{RateRepository, rate::NewRate};

const SEED_ACTOR: &str = "bootstrap";

struct DefaultRate {
    room_type: &'static str,
    price_cents: i64,
    badge_color: &'static str,
    description: &'static str,
}

const DEFAULT_RATES: &[DefaultRate] = &[
    DefaultRate {
        room_type: "Single",
        price_cents: 8_000,
        badge_color: "#bee3f8",
        description: "One single bed",
    },
    DefaultRate {
        room_type: "Double",
        price_cents: 12_000,
        badge_color: "#c6f6d5",
        description: "One double bed or two singles",
    },
    DefaultRate {
        room_type: "Suite",
        price_cents: 25_000,
        badge_color: "#fefcbf",
        description: "Bedroom with separate living area",
    },
];

/// Inserts the default rates that are missing. Returns how many were created.
pub async fn seed_default_rates(db: &DatabaseConnection) -> Result<usize> {
    let rates = RateRepository::new(db);
    let mut created = 0;

    for rate in DEFAULT_RATES {
        if rates.find_by_room_type(rate.room_type).await?.is_some() {
            log::debug!("Rate '{}' already exists, skipping", rate.room_type);
            continue;
        }

        rates
            .create(
                NewRate {
                    room_type: rate.room_type.to_string(),
                    price_cents: rate.price_cents,
                    badge_color: Some(rate.badge_color.to_string()),
                    badge_text_color: None,
                    description: Some(rate.description.to_string()),
                },
                Some(SEED_ACTOR),
            )
            .await?;
        log::info!("Created default rate: {}", rate.room_type);
        created += 1;
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tests_support::setup_db;

    #[tokio::test]
    async fn seeds_missing_rates_only() {
        let db = setup_db().await;
        let rates = RateRepository::new(&db);
        rates
            .create(
                NewRate {
                    room_type: "Suite".to_string(),
                    price_cents: 40_000,
                    badge_color: None,
                    badge_text_color: None,
                    description: None,
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(seed_default_rates(&db).await.unwrap(), 2);
        assert_eq!(seed_default_rates(&db).await.unwrap(), 0);

        let suite = rates.find_by_room_type("Suite").await.unwrap().unwrap();
        assert_eq!(suite.price_cents, 40_000);
        let single = rates.find_by_room_type("Single").await.unwrap().unwrap();
        assert_eq!(single.price_cents, 8_000);
    }
}
