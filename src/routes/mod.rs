pub mod auth;
pub mod trips;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/api/auth", auth::router())
        .nest("/api/trips", trips::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "API funcionando"
}
