//! Response building and error-to-status mapping.
//!
//! # Responsibilities
//! - Map client errors to HTTP status codes
//! - Render error messages verbatim as plain-text bodies
//! - Build the fixed responses (payload, 400, 405, 413)
//!
//! # Design Decisions
//! - Status chain: public status of the error → per-verb override → 500
//! - A public status is only honoured if it is an error status
//! - The only success produced from an error is GET not-found → 204, empty

use axum::body::Bytes;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::client::{ClientError, PathError, PublicStatus, SecretPath};
use crate::http::handler::Verb;
use crate::routing::Revision;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Status codes a verb assigns to errors that carry no public status.
pub fn override_status(verb: Verb, err: &ClientError) -> Option<StatusCode> {
    match (verb, err) {
        (Verb::Get, ClientError::SecretNotFound) => Some(StatusCode::NO_CONTENT),
        (
            Verb::Post,
            ClientError::CannotWriteToVersion | ClientError::EmptySecret | ClientError::SecretTooBig,
        ) => Some(StatusCode::BAD_REQUEST),
        (Verb::Delete, ClientError::CannotDeleteVersion) => Some(StatusCode::BAD_REQUEST),
        (Verb::Delete, ClientError::SecretNotFound) => Some(StatusCode::NOT_FOUND),
        _ => None,
    }
}

/// Resolve the status code for a failed `verb`.
pub fn status_for(verb: Verb, err: &ClientError) -> StatusCode {
    err.public_status()
        .filter(|status| status.is_client_error() || status.is_server_error())
        .or_else(|| override_status(verb, err))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Response for a client error, with the error message as body.
pub fn client_error(verb: Verb, path: &SecretPath, err: &ClientError) -> Response {
    let status = status_for(verb, err);
    if status.is_server_error() {
        tracing::warn!(verb = verb.as_str(), path = %path, status = status.as_u16(), error = %err, "Secret client failed");
    } else {
        tracing::debug!(verb = verb.as_str(), path = %path, status = status.as_u16(), error = %err, "Secret request rejected");
    }

    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    text(status, err.to_string())
}

/// 200 with the raw secret payload.
pub fn secret_payload(data: Bytes) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, OCTET_STREAM)], data).into_response()
}

/// 400 for a path the validator rejected.
pub fn invalid_path(err: &PathError) -> Response {
    text(StatusCode::BAD_REQUEST, err.to_string())
}

/// 405 listing the verbs of `revision`.
pub fn method_not_allowed(revision: Revision) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, revision.allow_header())],
    )
        .into_response()
}

/// 413 for a body over the proxy's own limit.
pub fn payload_too_large(limit: usize) -> Response {
    text(
        StatusCode::PAYLOAD_TOO_LARGE,
        format!("request body exceeds the limit of {limit} bytes"),
    )
}

/// 500 for a request body that could not be read.
pub fn body_read_failed(err: &(dyn std::error::Error + Send + Sync)) -> Response {
    tracing::warn!(error = %err, "Failed to read request body");
    text(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}
