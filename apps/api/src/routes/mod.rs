pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::orders::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Orders API
        .route("/api/v1/orders", post(handlers::handle_create_order))
        .route("/api/v1/orders/:id", get(handlers::handle_get_order))
        .route(
            "/api/v1/orders/:id/generate",
            post(handlers::handle_generate),
        )
        .with_state(state)
}
