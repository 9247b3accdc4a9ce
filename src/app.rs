use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/options", get(handlers::get_options))
        .route("/api/state", get(handlers::get_state))
        .route("/api/data", get(handlers::get_data))
        .route("/api/events", post(handlers::post_event))
        .with_state(state)
}
