pub mod protocol;
pub mod rest;
pub mod state;
pub mod timer_task;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Builds the session router. The body limit is sized for document uploads.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sessions", post(rest::create_session_handler))
        .route(
            "/sessions/{session_id}",
            get(rest::get_session_handler).delete(rest::delete_session_handler),
        )
        .route(
            "/sessions/{session_id}/settings",
            put(rest::update_settings_handler),
        )
        .route(
            "/sessions/{session_id}/files",
            post(rest::add_files_handler).put(rest::replace_files_handler),
        )
        .route(
            "/sessions/{session_id}/files/{index}",
            delete(rest::remove_file_handler),
        )
        .route("/sessions/{session_id}/toc", post(rest::extract_toc_handler))
        .route("/sessions/{session_id}/quiz", post(rest::generate_quiz_handler))
        .route(
            "/sessions/{session_id}/quiz-from-text",
            post(rest::generate_quiz_from_text_handler),
        )
        .route(
            "/sessions/{session_id}/answers",
            post(rest::record_answer_handler),
        )
        .route(
            "/sessions/{session_id}/submit",
            post(rest::submit_quiz_handler),
        )
        .route(
            "/sessions/{session_id}/regenerate",
            post(rest::regenerate_handler),
        )
        .route("/sessions/{session_id}/reset", post(rest::reset_handler))
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
        .with_state(app_state)
}
