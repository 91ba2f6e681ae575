//! # Server Configuration
//!
//! Router assembly, shared state and the serve loop for the hotel API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::crypto::{CryptoError, TokenIssuer};
use crate::handlers::uploads::MAX_FILES_PER_REQUEST;
use crate::handlers::{self, auth, customers, rates, reservations, rooms, users};
use crate::storage::{self, ImageStore};
use crate::telemetry::{TRACE_ID_HEADER, trace_context_middleware};
use crate::{db, seeds};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub tokens: Arc<TokenIssuer>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        db: DatabaseConnection,
        images: Arc<dyn ImageStore>,
    ) -> Result<Self, CryptoError> {
        let tokens = Arc::new(TokenIssuer::from_config(&config)?);
        Ok(Self {
            config,
            db,
            tokens,
            images,
        })
    }

    /// Builds the state with the image store selected by `HOTEL_STORAGE_PROVIDER`.
    pub fn from_config(config: Arc<AppConfig>, db: DatabaseConnection) -> anyhow::Result<Self> {
        let images = storage::from_config(&config.storage).context("configuring image store")?;
        Self::new(config, db, images).context("configuring access tokens")
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout));

    let staff = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/register", post(auth::register))
        .route("/admin/users", get(users::list_users))
        .route(
            "/admin/users/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        .route(
            "/admin/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route(
            "/admin/customers/{id}",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .route("/admin/rates", get(rates::list_rates).post(rates::create_rate))
        .route(
            "/admin/rates/{id}",
            get(rates::get_rate)
                .put(rates::update_rate)
                .delete(rates::delete_rate),
        )
        .route("/admin/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route(
            "/admin/rooms/{id}",
            get(rooms::get_room)
                .put(rooms::update_room)
                .delete(rooms::delete_room),
        )
        .route("/admin/rooms/{id}/images", post(rooms::upload_room_images))
        .route(
            "/admin/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/admin/reservations/availability",
            get(reservations::search_availability),
        )
        .route(
            "/admin/reservations/{id}",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route("/admin/reservations/{id}/check-in", post(reservations::check_in))
        .route("/admin/reservations/{id}/check-out", post(reservations::check_out))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let body_limit = request_body_limit(&state.config);
    let cors = cors_layer(&state.config);

    public
        .merge(staff)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(trace_context_middleware))
}

/// Multipart bodies may carry several images plus form fields.
fn request_body_limit(config: &AppConfig) -> usize {
    config
        .storage
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(64 * 1024)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(TRACE_ID_HEADER)])
}

/// Connects, migrates, seeds and serves until Ctrl-C.
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let db = db::init_pool(&config).await?;
    if config.run_migrations {
        db::run_migrations(&db).await?;
    }
    seeds::run(&db, &config).await?;

    let state = AppState::from_config(Arc::clone(&config), db)?;
    let app = create_app(state);

    let addr = config
        .bind_addr()
        .with_context(|| format!("invalid server address {}", config.api_bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    tracing::info!(%addr, profile = %config.profile, "Hotel API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::auth::register,
        crate::handlers::users::list_users,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::delete_customer,
        crate::handlers::rates::list_rates,
        crate::handlers::rates::get_rate,
        crate::handlers::rates::create_rate,
        crate::handlers::rates::update_rate,
        crate::handlers::rates::delete_rate,
        crate::handlers::rooms::list_rooms,
        crate::handlers::rooms::get_room,
        crate::handlers::rooms::create_room,
        crate::handlers::rooms::update_room,
        crate::handlers::rooms::delete_room,
        crate::handlers::rooms::upload_room_images,
        crate::handlers::reservations::search_availability,
        crate::handlers::reservations::list_reservations,
        crate::handlers::reservations::create_reservation,
        crate::handlers::reservations::get_reservation,
        crate::handlers::reservations::update_reservation,
        crate::handlers::reservations::delete_reservation,
        crate::handlers::reservations::check_in,
        crate::handlers::reservations::check_out,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::HealthResponse,
            crate::handlers::types::MessageResponse,
            crate::models::user::Role,
            crate::models::customer::MarriageStatus,
            crate::models::reservation::ReservationStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Staff login and sessions"),
        (name = "users", description = "Staff accounts"),
        (name = "customers", description = "Guest records"),
        (name = "rates", description = "Room types and nightly prices"),
        (name = "rooms", description = "Rooms and their photos"),
        (name = "reservations", description = "Bookings, availability, check-in and check-out"),
    ),
    info(
        title = "Hotel API",
        description = "Back-office API for hotel front-desk operations",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
