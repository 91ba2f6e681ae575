//! # Customer API Handlers

use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::types::PaginatedResponse;
use crate::models::customer::{MarriageStatus, Model as CustomerModel};
use crate::models::reservation::ReservationStatus;
use crate::repositories::{
    CustomerRepository, PageRequest,
    customer::{CustomerChanges, NewCustomer},
};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
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
    /// Status of the customer's latest reservation
    pub status: Option<ReservationStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CustomerModel> for CustomerResponse {
    fn from(customer: CustomerModel) -> Self {
        Self {
            id: customer.id,
            first_name: customer.first_name,
            last_name: customer.last_name,
            email: customer.email,
            phone: customer.phone,
            address: customer.address,
            nationality: customer.nationality,
            id_number: customer.id_number,
            date_of_birth: customer.date_of_birth,
            marriage_status: customer.marriage_status,
            spouse_id: customer.spouse_id,
            status: customer.status,
            created_at: customer.created_at.with_timezone(&Utc),
            updated_at: customer.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCustomerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: Option<String>,
    pub nationality: Option<String>,
    pub id_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub marriage_status: MarriageStatus,
    pub spouse_id: Option<Uuid>,
}

/// Partial update. Send `"spouse_id": null` to clear the spouse link.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCustomerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub nationality: Option<String>,
    pub id_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub marriage_status: Option<MarriageStatus>,
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<Uuid>)]
    pub spouse_id: Option<Option<Uuid>>,
}

/// Distinguishes an explicit `null` from a missing field.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerListQuery {
    /// Matches first name, last name, phone or id number
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/admin/customers",
    security(("bearer_auth" = [])),
    params(CustomerListQuery),
    responses(
        (status = 200, description = "Customers ordered by name", body = PaginatedResponse<CustomerResponse>),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<PaginatedResponse<CustomerResponse>>, ApiError> {
    let page = CustomerRepository::new(&state.db)
        .list(
            query.search.as_deref(),
            PageRequest::new(query.page, query.per_page),
        )
        .await?;
    Ok(Json(PaginatedResponse::from_page(page)))
}

#[utoipa::path(
    post,
    path = "/admin/customers",
    security(("bearer_auth" = [])),
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer registered", body = CustomerResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    let Json(request) = payload?;

    let customer = CustomerRepository::new(&state.db)
        .create(
            NewCustomer {
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                address: request.address,
                nationality: request.nationality,
                id_number: request.id_number,
                date_of_birth: request.date_of_birth,
                marriage_status: request.marriage_status,
                spouse_id: request.spouse_id,
            },
            Some(&user.username),
        )
        .await?;

    tracing::info!(customer_id = %customer.id, actor = %user.username, "Customer registered");
    Ok((StatusCode::CREATED, Json(CustomerResponse::from(customer))))
}

#[utoipa::path(
    get,
    path = "/admin/customers/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = CustomerResponse),
        (status = 404, description = "Customer not found", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let customer = CustomerRepository::new(&state.db).get(id).await?;
    Ok(Json(CustomerResponse::from(customer)))
}

#[utoipa::path(
    put,
    path = "/admin/customers/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Updated customer", body = CustomerResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Customer not found", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateCustomerRequest>, JsonRejection>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let Json(request) = payload?;

    let customer = CustomerRepository::new(&state.db)
        .update(
            id,
            CustomerChanges {
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                address: request.address,
                nationality: request.nationality,
                id_number: request.id_number,
                date_of_birth: request.date_of_birth,
                marriage_status: request.marriage_status,
                spouse_id: request.spouse_id,
            },
            &user.username,
        )
        .await?;

    Ok(Json(CustomerResponse::from(customer)))
}

#[utoipa::path(
    delete,
    path = "/admin/customers/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 404, description = "Customer not found", body = ApiError),
        (status = 409, description = "Customer has reservations", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    CustomerRepository::new(&state.db).delete(id).await?;
    tracing::info!(customer_id = %id, actor = %user.username, "Customer deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spouse_id_distinguishes_null_from_missing() {
        let missing: UpdateCustomerRequest = serde_json::from_str(r#"{"phone": "912345678"}"#).unwrap();
        assert_eq!(missing.spouse_id, None);

        let cleared: UpdateCustomerRequest = serde_json::from_str(r#"{"spouse_id": null}"#).unwrap();
        assert_eq!(cleared.spouse_id, Some(None));

        let id = Uuid::new_v4();
        let set: UpdateCustomerRequest =
            serde_json::from_str(&format!(r#"{{"spouse_id": "{id}"}}"#)).unwrap();
        assert_eq!(set.spouse_id, Some(Some(id)));
    }
}
