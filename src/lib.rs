//! Stateless RESTful HTTP proxy in front of a secret-management client.

// Core subsystems
pub mod client;
pub mod config;
pub mod credential;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

/// Program name used in diagnostics.
pub const PROGRAM: &str = "secrets-http-proxy";

pub use client::{MemoryClient, RemoteClient, SecretClient, SecretPath};
pub use config::schema::ProxyConfig;
pub use http::{ClientProxy, ProxyError, RestProxy};
pub use lifecycle::Shutdown;
pub use routing::Revision;
