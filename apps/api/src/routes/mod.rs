pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::artifacts::handlers as artifacts;
use crate::pipeline::handlers as sessions;
use crate::pipeline::intake::UPLOAD_BODY_LIMIT;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route(
            "/api/v1/sessions/upload",
            post(sessions::handle_upload_session)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/v1/sessions/:id", get(sessions::handle_get_session))
        .route(
            "/api/v1/sessions/:id/confirm",
            post(sessions::handle_confirm),
        )
        // Artifacts
        .route(
            "/api/v1/sessions/:id/artifacts/:filename",
            get(artifacts::handle_download_artifact),
        )
        .with_state(state)
}
