//! # Customer Repository

use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::{Page, PageRequest, clean_optional, fetch_page, required_text};
use crate::error::RepositoryError;
use crate::models::customer::{
    self, ActiveModel as CustomerActiveModel, Entity as Customer, MarriageStatus,
    Model as CustomerModel,
};
use crate::models::reservation::{self, Entity as Reservation, ReservationStatus};

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{5,24}$").expect("valid phone pattern"));

#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub nationality: Option<String>,
    pub id_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub marriage_status: MarriageStatus,
    pub spouse_id: Option<Uuid>,
}

/// Partial update. `spouse_id: Some(None)` clears the link.
#[derive(Debug, Clone, Default)]
pub struct CustomerChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub nationality: Option<String>,
    pub id_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub marriage_status: Option<MarriageStatus>,
    pub spouse_id: Option<Option<Uuid>>,
}

pub struct CustomerRepository<'a, C: ConnectionTrait = DatabaseConnection> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> CustomerRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        request: NewCustomer,
        actor: Option<&str>,
    ) -> Result<CustomerModel, RepositoryError> {
        let id = Uuid::new_v4();
        let first_name = required_text(&request.first_name, "first_name", 100)?;
        let last_name = required_text(&request.last_name, "last_name", 100)?;
        let phone = validate_phone(&request.phone)?;
        let email = validate_email(request.email)?;
        self.validate_spouse(id, request.marriage_status, request.spouse_id)
            .await?;

        let now = Utc::now();
        let customer = CustomerActiveModel {
            id: Set(id),
            first_name: Set(first_name),
            last_name: Set(last_name),
            email: Set(email),
            phone: Set(phone),
            address: Set(clean_optional(request.address)),
            nationality: Set(clean_optional(request.nationality)),
            id_number: Set(clean_optional(request.id_number)),
            date_of_birth: Set(request.date_of_birth),
            marriage_status: Set(request.marriage_status),
            spouse_id: Set(request.spouse_id),
            status: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            created_by: Set(actor.map(str::to_string)),
            updated_by: Set(actor.map(str::to_string)),
        };

        customer
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerModel>, RepositoryError> {
        Customer::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get(&self, id: Uuid) -> Result<CustomerModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Customer not found"))
    }

    /// Lists customers by last name; `search` matches name, phone or id number.
    pub async fn list(
        &self,
        search: Option<&str>,
        request: PageRequest,
    ) -> Result<Page<CustomerModel>, RepositoryError> {
        let mut select = Customer::find()
            .order_by_asc(customer::Column::LastName)
            .order_by_asc(customer::Column::FirstName);

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(customer::Column::FirstName.contains(term))
                    .add(customer::Column::LastName.contains(term))
                    .add(customer::Column::Phone.contains(term))
                    .add(customer::Column::IdNumber.contains(term)),
            );
        }

        fetch_page(self.db, select, request).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: CustomerChanges,
        actor: &str,
    ) -> Result<CustomerModel, RepositoryError> {
        let existing = self.get(id).await?;

        let marriage_status = changes.marriage_status.unwrap_or(existing.marriage_status);
        let spouse_id = match changes.spouse_id {
            Some(spouse_id) => spouse_id,
            // A customer who is no longer married keeps no spouse link.
            None if marriage_status != MarriageStatus::Married => None,
            None => existing.spouse_id,
        };
        self.validate_spouse(id, marriage_status, spouse_id).await?;

        let mut active = existing.into_active_model();
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(required_text(&first_name, "first_name", 100)?);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(required_text(&last_name, "last_name", 100)?);
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(validate_phone(&phone)?);
        }
        if changes.email.is_some() {
            active.email = Set(validate_email(changes.email)?);
        }
        if let Some(address) = changes.address {
            active.address = Set(clean_optional(Some(address)));
        }
        if let Some(nationality) = changes.nationality {
            active.nationality = Set(clean_optional(Some(nationality)));
        }
        if let Some(id_number) = changes.id_number {
            active.id_number = Set(clean_optional(Some(id_number)));
        }
        if let Some(date_of_birth) = changes.date_of_birth {
            active.date_of_birth = Set(Some(date_of_birth));
        }
        active.marriage_status = Set(marriage_status);
        active.spouse_id = Set(spouse_id);
        active.updated_at = Set(Utc::now().into());
        active.updated_by = Set(Some(actor.to_string()));

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Mirrors a reservation status onto the customer record.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: Option<ReservationStatus>,
        actor: &str,
    ) -> Result<CustomerModel, RepositoryError> {
        let mut active = self.get(id).await?.into_active_model();
        active.status = Set(status);
        active.updated_at = Set(Utc::now().into());
        active.updated_by = Set(Some(actor.to_string()));

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Deletes a customer without reservation history.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let existing = self.get(id).await?;

        let reservations = Reservation::find()
            .filter(reservation::Column::CustomerId.eq(existing.id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if reservations > 0 {
            return Err(RepositoryError::conflict(format!(
                "Customer has {reservations} reservation(s)"
            )));
        }

        Customer::delete_by_id(existing.id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    async fn validate_spouse(
        &self,
        id: Uuid,
        marriage_status: MarriageStatus,
        spouse_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let Some(spouse_id) = spouse_id else {
            return Ok(());
        };
        if marriage_status != MarriageStatus::Married {
            return Err(RepositoryError::validation_error(
                "spouse_id requires marriage_status Married",
            ));
        }
        if spouse_id == id {
            return Err(RepositoryError::validation_error(
                "A customer cannot be their own spouse",
            ));
        }
        if self.find_by_id(spouse_id).await?.is_none() {
            return Err(RepositoryError::validation_error(
                "spouse_id does not refer to a customer",
            ));
        }
        Ok(())
    }
}

fn validate_phone(phone: &str) -> Result<String, RepositoryError> {
    let phone = phone.trim();
    if !PHONE.is_match(phone) {
        return Err(RepositoryError::validation_error(
            "phone must contain 6 to 25 digits, spaces, dashes or parentheses",
        ));
    }
    Ok(phone.to_string())
}

fn validate_email(email: Option<String>) -> Result<Option<String>, RepositoryError> {
    let Some(email) = clean_optional(email) else {
        return Ok(None);
    };
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !email.contains(char::is_whitespace)
        && email.len() <= 254;
    if !valid {
        return Err(RepositoryError::validation_error("email is not a valid address"));
    }
    Ok(Some(email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tests_support::setup_db;

    fn new_customer(first: &str, last: &str) -> NewCustomer {
        NewCustomer {
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: "+351 912 345 678".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_and_search() {
        let db = setup_db().await;
        let repo = CustomerRepository::new(&db);

        let ana = repo
            .create(new_customer("Ana", "Silva"), Some("frontdesk"))
            .await
            .unwrap();
        repo.create(new_customer("Bruno", "Costa"), None).await.unwrap();

        assert_eq!(ana.full_name(), "Ana Silva");
        assert_eq!(ana.status, None);

        let page = repo.list(Some("Silv"), PageRequest::default()).await.unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].id, ana.id);

        let all = repo.list(None, PageRequest::default()).await.unwrap();
        let names: Vec<_> = all.items.iter().map(|c| c.last_name.as_str()).collect();
        assert_eq!(names, vec!["Costa", "Silva"]);
    }

    #[tokio::test]
    async fn validates_contact_fields() {
        let db = setup_db().await;
        let repo = CustomerRepository::new(&db);

        let mut bad_phone = new_customer("Ana", "Silva");
        bad_phone.phone = "call me".to_string();
        assert!(matches!(
            repo.create(bad_phone, None).await,
            Err(RepositoryError::Validation(_))
        ));

        let mut bad_email = new_customer("Ana", "Silva");
        bad_email.email = Some("ana.example.com".to_string());
        assert!(matches!(
            repo.create(bad_email, None).await,
            Err(RepositoryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn spouse_link_rules() {
        let db = setup_db().await;
        let repo = CustomerRepository::new(&db);
        let ana = repo.create(new_customer("Ana", "Silva"), None).await.unwrap();

        let mut single_with_spouse = new_customer("Rui", "Silva");
        single_with_spouse.spouse_id = Some(ana.id);
        assert!(matches!(
            repo.create(single_with_spouse, None).await,
            Err(RepositoryError::Validation(_))
        ));

        let mut unknown_spouse = new_customer("Rui", "Silva");
        unknown_spouse.marriage_status = MarriageStatus::Married;
        unknown_spouse.spouse_id = Some(Uuid::new_v4());
        assert!(matches!(
            repo.create(unknown_spouse, None).await,
            Err(RepositoryError::Validation(_))
        ));

        let mut rui = new_customer("Rui", "Silva");
        rui.marriage_status = MarriageStatus::Married;
        rui.spouse_id = Some(ana.id);
        let rui = repo.create(rui, None).await.unwrap();
        assert_eq!(rui.spouse_id, Some(ana.id));

        let self_link = CustomerChanges {
            spouse_id: Some(Some(rui.id)),
            ..Default::default()
        };
        assert!(matches!(
            repo.update(rui.id, self_link, "frontdesk").await,
            Err(RepositoryError::Validation(_))
        ));

        let divorced = repo
            .update(
                rui.id,
                CustomerChanges {
                    marriage_status: Some(MarriageStatus::Divorced),
                    ..Default::default()
                },
                "frontdesk",
            )
            .await
            .unwrap();
        assert_eq!(divorced.spouse_id, None);
    }

    #[tokio::test]
    async fn status_mirror_and_delete() {
        let db = setup_db().await;
        let repo = CustomerRepository::new(&db);
        let ana = repo.create(new_customer("Ana", "Silva"), None).await.unwrap();

        let updated = repo
            .set_status(ana.id, Some(ReservationStatus::CheckedIn), "frontdesk")
            .await
            .unwrap();
        assert_eq!(updated.status, Some(ReservationStatus::CheckedIn));

        repo.delete(ana.id).await.unwrap();
        assert!(matches!(
            repo.get(ana.id).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
