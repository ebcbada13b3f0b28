use axum::{Router, routing::get};

use crate::handlers;
use crate::handlers::form::SESSION_LIST_PATH;
use crate::state::AppState;

/// Paths keep their trailing slash; the redirect target must match exactly.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(SESSION_LIST_PATH, get(handlers::form::session_list))
        .route(
            "/asistencia/{activity_id}/marcar/",
            get(handlers::form::mark_form).post(handlers::form::submit_mark_form),
        )
}
