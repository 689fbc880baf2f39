//! Errors returned by secret clients.

use axum::http::StatusCode;
use thiserror::Error;

/// Capability of an error to expose an HTTP status code that is safe to
/// hand to untrusted callers.
pub trait PublicStatus {
    fn public_status(&self) -> Option<StatusCode>;
}

/// Errors that can occur while talking to the secret service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No secret (or no such version) exists at the path.
    #[error("secret not found")]
    SecretNotFound,

    /// Writes always create a new version; a versioned path cannot be written.
    #[error("cannot write to a specific version of a secret")]
    CannotWriteToVersion,

    /// Deletes remove every version; a versioned path cannot be deleted.
    #[error("cannot delete a specific version of a secret")]
    CannotDeleteVersion,

    #[error("secret content is empty")]
    EmptySecret,

    #[error("secret exceeds the maximum secret size")]
    SecretTooBig,

    /// Error the secret service flagged as safe to expose, with its status.
    #[error("{message}")]
    Public { status: StatusCode, message: String },

    /// Server-side failure reported by the secret service.
    #[error("secret service error ({status}): {message}")]
    Service { status: StatusCode, message: String },

    /// The secret service could not be reached.
    #[error("secret service unreachable: {0}")]
    Transport(String),

    /// The secret service answered with something we could not understand.
    #[error("invalid response from secret service: {0}")]
    InvalidResponse(String),
}

impl PublicStatus for ClientError {
    fn public_status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Public { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
