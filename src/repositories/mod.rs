//! # Repository Layer
//!
//! Repositories wrap SeaORM queries for one entity each. They borrow any
//! [`ConnectionTrait`] so the same code runs against the pool or inside a
//! transaction opened by the front desk service.

use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};

use crate::error::RepositoryError;

pub mod customer;
pub mod rate;
pub mod refresh_token;
pub mod reservation;
pub mod room;
pub mod user;

pub use customer::CustomerRepository;
pub use rate::RateRepository;
pub use refresh_token::RefreshTokenRepository;
pub use reservation::ReservationRepository;
pub use room::RoomRepository;
pub use user::UserRepository;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

/// 1-based page request, clamped to sane bounds.
///
/// `page` is capped so the row offset `(page - 1) * per_page` fits in an
/// `i64`; anything past that is an empty page anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let max_page = i64::MAX as u64 / per_page;
        Self {
            page: page.unwrap_or(1).clamp(1, max_page),
            per_page,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Runs `select` as a page query.
pub(crate) async fn fetch_page<C, E>(
    db: &C,
    select: Select<E>,
    request: PageRequest,
) -> Result<Page<E::Model>, RepositoryError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Send + Sync,
{
    let paginator = select.paginate(db, request.per_page);
    let totals = paginator
        .num_items_and_pages()
        .await
        .map_err(RepositoryError::database_error)?;
    let items = paginator
        .fetch_page(request.page - 1)
        .await
        .map_err(RepositoryError::database_error)?;

    Ok(Page {
        items,
        page: request.page,
        per_page: request.per_page,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Trims an optional text field, treating blank as absent.
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims a required text field, rejecting blank or overlong values.
pub(crate) fn required_text(
    value: &str,
    field: &str,
    max_len: usize,
) -> Result<String, RepositoryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::validation_error(format!(
            "{field} cannot be empty"
        )));
    }
    if trimmed.chars().count() > max_len {
        return Err(RepositoryError::validation_error(format!(
            "{field} cannot exceed {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults_and_clamps() {
        assert_eq!(
            PageRequest::new(None, None),
            PageRequest {
                page: 1,
                per_page: 20
            }
        );
        assert_eq!(
            PageRequest::new(Some(0), Some(1000)),
            PageRequest {
                page: 1,
                per_page: 100
            }
        );
        assert_eq!(PageRequest::new(Some(3), Some(0)).per_page, 1);
    }

    #[test]
    fn huge_page_keeps_offset_in_range() {
        for per_page in [1, 20, MAX_PER_PAGE] {
            let request = PageRequest::new(Some(u64::MAX), Some(per_page));
            let offset = (request.page - 1).checked_mul(request.per_page).unwrap();
            assert!(offset <= i64::MAX as u64);
        }
    }

    #[tokio::test]
    async fn fetching_a_page_past_the_end_is_empty() {
        let db = super::tests_support::setup_db().await;
        let page = fetch_page(
            &db,
            crate::models::Rate::find(),
            PageRequest::new(Some(u64::MAX), Some(MAX_PER_PAGE)),
        )
        .await
        .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 0);
    }

    #[test]
    fn text_helpers() {
        assert_eq!(clean_optional(Some("  ".to_string())), None);
        assert_eq!(
            clean_optional(Some(" Lisbon ".to_string())),
            Some("Lisbon".to_string())
        );
        assert_eq!(required_text(" 101 ", "number", 16).unwrap(), "101");
        assert!(required_text("", "number", 16).is_err());
        assert!(required_text("12345", "number", 4).is_err());
    }
}
