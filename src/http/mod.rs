//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, span)
//!     → [routing strips the mount prefix]
//!     → handler.rs (decode and validate path, dispatch verb to the secret client)
//!     → response.rs (map errors to status codes)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::Verb;
pub use request::X_REQUEST_ID;
pub use server::{AppState, ClientProxy, ProxyError, RestProxy};
