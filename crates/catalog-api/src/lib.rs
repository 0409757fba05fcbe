//! catalog-api
//!
//! axum HTTP surface over the hybrid engine: ranked search, the filtered
//! product listing, an admin reindex trigger and a health probe.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use errors::ApiError;
use handlers::AppState;

pub use services::Services;

async fn admin_auth(
    State(state): State<AppState>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, ApiError> {
    if let Some(expected) = state.admin_token.as_deref() {
        let token = req
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if token != Some(expected) {
            return Err(ApiError::Unauthorized("Invalid or missing admin token".to_string()));
        }
    }
    Ok(next.run(req).await)
}

pub fn create_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/api/admin/index", post(handlers::run_indexing))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/search", get(handlers::search))
        .route("/api/products", get(handlers::list_products))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
