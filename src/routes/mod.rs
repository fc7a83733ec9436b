use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{MovieCatalog, RecommendationService},
};

pub mod model;
pub mod movies;
pub mod ratings;
pub mod recommendations;
pub mod users;

/// Upper bound on `top_n` accepted from clients
pub const MAX_TOP_N: usize = 500;

/// Shared application state
pub struct AppState {
    pub service: Arc<RecommendationService>,
    pub default_top_n: usize,
    /// Absent when no catalog file was configured
    pub catalog: Option<Arc<MovieCatalog>>,
}

impl AppState {
    pub fn new(service: Arc<RecommendationService>, default_top_n: usize) -> Self {
        Self {
            service,
            default_top_n,
            catalog: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<MovieCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/recommendations/:user_id",
            get(recommendations::recommend),
        )
        .route(
            "/predictions/:user_id/:movie_id",
            get(recommendations::predict),
        )
        .route(
            "/explain/:user_id/:movie_id",
            get(recommendations::explain),
        )
        .route("/ratings", post(ratings::submit))
        .route("/model", get(model::info))
        .route("/model/train", post(model::train))
        .route("/evaluate", post(model::evaluate))
        .route("/users/:user_id/profile", get(users::profile))
        .route("/movies", get(movies::list))
        .route("/movies/popular", get(movies::popular))
        .route("/movies/:movie_id", get(movies::details))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
