//! Secret client subsystem.
//!
//! # Data Flow
//! ```text
//! Handler (validated SecretPath)
//!     → SecretClient::get / write / delete
//!     → remote.rs (HTTP to the secret service) | memory.rs (in-process store)
//!     → SecretVersion or ClientError
//! ```
//!
//! # Design Decisions
//! - One client handle per process, shared as `Arc<dyn SecretClient>`
//! - Clients own the write policy (empty, oversized, versioned writes)
//! - Errors may expose a public status via [`PublicStatus`]

pub mod error;
pub mod memory;
pub mod path;
pub mod remote;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::{ClientError, ClientResult, PublicStatus};
pub use memory::MemoryClient;
pub use path::{PathError, SecretPath};
pub use remote::RemoteClient;

/// A single version of a secret, including its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVersion {
    pub version: u64,
    pub data: Bytes,
}

/// Operations the proxy needs from a secret-management client.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait SecretClient: Send + Sync {
    /// Fetch the latest version at `path`, or the version it names.
    async fn get(&self, path: &SecretPath) -> ClientResult<SecretVersion>;

    /// Store `data` as a new version at `path`, returning the version number.
    async fn write(&self, path: &SecretPath, data: Bytes) -> ClientResult<u64>;

    /// Delete every version at `path`.
    async fn delete(&self, path: &SecretPath) -> ClientResult<()>;
}
