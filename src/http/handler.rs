//! Secret handler: verb dispatch against the secret client.
//!
//! # Responsibilities
//! - Decode and validate the secret path before anything else
//! - Dispatch GET / POST / DELETE to the client, once, without retries
//! - Answer unsupported verbs with 405 and the revision's `Allow` list
//!
//! # Design Decisions
//! - Dispatch is a table of [`Verb`]s owned by the revision
//! - Each verb operation is a free function over `&dyn SecretClient`
//! - Every path through the handler produces a response

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;

use crate::client::{SecretClient, SecretPath};
use crate::http::response;
use crate::http::server::AppState;

/// HTTP verbs the proxy can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Delete,
}

impl Verb {
    pub const fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Delete => "DELETE",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Delete => Method::DELETE,
        }
    }

    /// Look `method` up in a verb table.
    pub fn from_method(method: &Method, table: &[Verb]) -> Option<Verb> {
        table.iter().copied().find(|verb| verb.method() == *method)
    }
}

/// Handle one request for the secret at `raw_path`.
///
/// `raw_path` is the URI path with the mount prefix stripped, still
/// percent-encoded.
pub async fn handle_secret(state: &AppState, raw_path: &str, request: Request<Body>) -> Response {
    let path = match SecretPath::from_uri_path(raw_path) {
        Ok(path) => path,
        Err(err) => {
            tracing::debug!(path = %raw_path, error = %err, "Rejected secret path");
            return response::invalid_path(&err);
        }
    };

    let Some(verb) = Verb::from_method(request.method(), state.revision.verbs()) else {
        tracing::debug!(method = %request.method(), path = %path, "Method not allowed");
        return response::method_not_allowed(state.revision);
    };

    let client = state.client.as_ref();
    match verb {
        Verb::Get => get_secret(client, &path).await,
        Verb::Post => match read_body(request.into_body(), state.max_body_bytes).await {
            Ok(data) => post_secret(client, &path, data).await,
            Err(response) => response,
        },
        Verb::Delete => delete_secret(client, &path).await,
    }
}

/// GET: 200 with the payload, 204 when there is no such secret.
pub async fn get_secret(client: &dyn SecretClient, path: &SecretPath) -> Response {
    match client.get(path).await {
        Ok(secret) => {
            tracing::debug!(path = %path, version = secret.version, "Secret read");
            response::secret_payload(secret.data)
        }
        Err(err) => response::client_error(Verb::Get, path, &err),
    }
}

/// POST: 201 once `data` is stored as a new version.
pub async fn post_secret(client: &dyn SecretClient, path: &SecretPath, data: Bytes) -> Response {
    match client.write(path, data).await {
        Ok(version) => {
            tracing::info!(path = %path, version, "Secret written");
            StatusCode::CREATED.into_response()
        }
        Err(err) => response::client_error(Verb::Post, path, &err),
    }
}

/// DELETE: 200 once every version at `path` is gone.
pub async fn delete_secret(client: &dyn SecretClient, path: &SecretPath) -> Response {
    match client.delete(path).await {
        Ok(()) => {
            tracing::info!(path = %path, "Secret deleted");
            StatusCode::OK.into_response()
        }
        Err(err) => response::client_error(Verb::Delete, path, &err),
    }
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, Response> {
    to_bytes(body, limit).await.map_err(|err| {
        let err = err.into_inner();
        if err.downcast_ref::<LengthLimitError>().is_some() {
            response::payload_too_large(limit)
        } else {
            response::body_read_failed(err.as_ref())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryClient;

    fn path(raw: &str) -> SecretPath {
        SecretPath::parse(raw).unwrap()
    }

    async fn body_of(response: Response) -> Bytes {
        to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[test]
    fn test_verb_table_lookup() {
        let table = [Verb::Get, Verb::Post];
        assert_eq!(Verb::from_method(&Method::GET, &table), Some(Verb::Get));
        assert_eq!(Verb::from_method(&Method::POST, &table), Some(Verb::Post));
        assert_eq!(Verb::from_method(&Method::DELETE, &table), None);
        assert_eq!(Verb::from_method(&Method::PUT, &table), None);
    }

    #[tokio::test]
    async fn test_get_missing_secret_is_no_content() {
        let client = MemoryClient::new();
        let response = get_secret(&client, &path("acme/app/token")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_post_then_get() {
        let client = MemoryClient::new();
        let target = path("acme/app/token");

        let response = post_secret(&client, &target, Bytes::from_static(b"\x00binary\xff")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(body_of(response).await.is_empty());

        let response = get_secret(&client, &target).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&body_of(response).await[..], b"\x00binary\xff");
    }

    #[tokio::test]
    async fn test_post_to_version_is_bad_request() {
        let client = MemoryClient::new();
        let response = post_secret(&client, &path("acme/app/token:2"), Bytes::from_static(b"x")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            &body_of(response).await[..],
            b"cannot write to a specific version of a secret"
        );
    }

    #[tokio::test]
    async fn test_delete_missing_secret_is_not_found() {
        let client = MemoryClient::new();
        let response = delete_secret(&client, &path("acme/app/token")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(&body_of(response).await[..], b"secret not found");
    }

    #[tokio::test]
    async fn test_read_body_failure_is_internal_error() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
        ];
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        let response = read_body(body, 1024).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            response::TEXT_PLAIN
        );
        assert_eq!(&body_of(response).await[..], b"client went away");
    }

    #[tokio::test]
    async fn test_read_body_limit() {
        let response = read_body(Body::from("0123456789"), 4).await.unwrap_err();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let data = read_body(Body::from("0123"), 4).await.unwrap();
        assert_eq!(&data[..], b"0123");
    }
}
