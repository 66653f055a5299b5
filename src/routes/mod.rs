mod health;
mod sessions;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/session/start",
            post(sessions::start).fallback(fallback_handler),
        )
        .route(
            "/session/question",
            get(sessions::question).fallback(fallback_handler),
        )
        .route(
            "/session/answer",
            post(sessions::answer).fallback(fallback_handler),
        )
        .route(
            "/session/metrics",
            get(sessions::metrics).fallback(fallback_handler),
        )
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    AppError::not_found("route not found").into_response()
}
