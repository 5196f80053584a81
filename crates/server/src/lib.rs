//! IOU tracker REST server: Axum routes over a shared SQLite connection.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod storage;

use axum::{
    Router,
    extract::FromRef,
    http::HeaderValue,
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
use storage::Db;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

fn cors(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match config
        .cors_origin
        .as_deref()
        .and_then(|o| HeaderValue::from_str(o).ok())
    {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Health
        .route("/health", get(routes::health::health))
        // Auth
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/logout-all", post(routes::auth::logout_all))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/devices", get(routes::auth::devices))
        // Users & items
        .route("/users/{username}", get(routes::users::get_user))
        .route("/items", get(routes::items::list_items))
        // IOUs
        .route(
            "/iou/owed",
            get(routes::ious::list_owed).post(routes::ious::create_owed),
        )
        .route(
            "/iou/owed/{iou_id}/complete",
            put(routes::ious::complete_owed),
        )
        .route(
            "/iou/owe",
            get(routes::ious::list_owe).post(routes::ious::create_owe),
        )
        .route("/iou/owe/{iou_id}/complete", put(routes::ious::complete_owe))
        // Requests
        .route(
            "/requests",
            get(routes::requests::list_requests).post(routes::requests::create_request),
        )
        .route(
            "/requests/{id}",
            get(routes::requests::get_request)
                .put(routes::requests::update_request)
                .delete(routes::requests::delete_request),
        )
        .route(
            "/requests/{id}/complete",
            put(routes::requests::complete_request),
        );

    let cors = cors(&state.config);
    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
