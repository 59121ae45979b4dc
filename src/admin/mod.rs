//! Read-only admin endpoints over the published model.

pub mod handlers;

use axum::routing::get;
use axum::Router;

use self::handlers::{get_blueprints, get_channels, get_status};
use crate::http::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/channels", get(get_channels))
        .route("/admin/blueprints", get(get_blueprints))
}
