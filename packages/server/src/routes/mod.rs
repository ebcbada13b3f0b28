mod form;
mod v1;

use axum::Router;
use utoipa_axum::router::OpenApiRouter;

use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/v1", v1::routes())
}

/// Redirecting form endpoints. Not part of the OpenAPI document.
pub fn form_routes() -> Router<AppState> {
    form::routes()
}
