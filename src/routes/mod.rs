// Route modules
pub mod subscribers;

use crate::{app_state::AppState, middleware::logging_middleware, models::common::MessageResponse};
use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/subscribers", post(subscribers::create_subscriber))
        .route(
            "/subscribers/{id}",
            get(subscribers::get_subscriber)
                .put(subscribers::update_subscriber)
                .delete(subscribers::delete_subscriber),
        )
        .route(
            "/subscribers/{id}/transaction",
            put(subscribers::replace_transaction),
        )
        // Request/response body logging
        .layer(middleware::from_fn(logging_middleware))
}

/// GET /health
async fn health() -> Json<MessageResponse> {
    Json(MessageResponse::new("ok"))
}
