use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod catalog;
pub mod health;
pub mod search;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", post(search::search))
        .route("/api/packages/{name}", get(catalog::get_package))
        .route("/api/authors/{name}", get(catalog::get_author))
        .route("/api/health", get(health::health))
        .route("/api/cache/invalidate", post(health::invalidate))
        .with_state(state)
}
