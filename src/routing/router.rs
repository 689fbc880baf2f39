//! Mounting the secret handler under a revision's prefix.
//!
//! # Responsibilities
//! - Route every request under the mount prefix to the secret handler
//! - Strip the prefix so the handler sees only the secret path
//! - Leave everything outside the prefix to the default 404
//!
//! # Design Decisions
//! - All methods reach the handler; it owns the 405 response
//! - The path is passed on still percent-encoded; the handler decodes it
//!   and rejects an encoded `/`

use axum::extract::{Request, State};
use axum::response::Response;
use axum::routing::any;
use axum::Router;

use crate::http::handler;
use crate::http::server::AppState;

/// Router serving the secret API at `state.revision`'s mount prefix.
pub fn secret_routes(state: AppState) -> Router {
    let prefix = state.revision.mount_prefix();

    Router::new()
        .route(prefix, any(secret_endpoint))
        .route(&format!("{prefix}{{*path}}"), any(secret_endpoint))
        .with_state(state)
}

async fn secret_endpoint(State(state): State<AppState>, request: Request) -> Response {
    let raw_path = strip_prefix(request.uri().path(), state.revision.mount_prefix()).to_owned();
    handler::handle_secret(&state, &raw_path, request).await
}

/// `path` without `prefix`; empty when the prefix does not match.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or_default()
}
