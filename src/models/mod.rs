//! # Data Models
//!
//! SeaORM entities for the hotel schema plus small shared response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod customer;
pub mod rate;
pub mod refresh_token;
pub mod reservation;
pub mod room;
pub mod user;

pub use customer::Entity as Customer;
pub use rate::Entity as Rate;
pub use refresh_token::Entity as RefreshToken;
pub use reservation::Entity as Reservation;
pub use room::Entity as Room;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "hotel-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Reads a JSON array of strings (image URL columns), ignoring anything else.
pub(crate) fn string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_list_skips_non_strings() {
        let value = json!(["https://a/1.jpg", 7, null, "https://a/2.jpg"]);
        assert_eq!(
            string_list(&value),
            vec!["https://a/1.jpg".to_string(), "https://a/2.jpg".to_string()]
        );
        assert!(string_list(&json!({"url": "x"})).is_empty());
    }
}
