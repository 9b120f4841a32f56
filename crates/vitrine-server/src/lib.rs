//! HTTP front end for the media library.
//!
//! Read endpoints are open; every mutating endpoint sits behind the
//! admin-token middleware, which is a no-op when no token is configured.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Uploads are image batches; 64 MiB covers a full carousel refresh.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let open = Router::new()
        .route("/media", get(handlers::list_media))
        .route("/settings", get(handlers::read_settings));

    let protected = Router::new()
        .route("/media/upload", post(handlers::upload_media))
        .route("/media/reorder", post(handlers::reorder_media))
        .route("/media/descriptions", post(handlers::update_descriptions))
        .route("/media/delete", post(handlers::delete_media))
        .route("/settings", post(handlers::write_settings))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_admin,
        ));

    open.merge(protected)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
