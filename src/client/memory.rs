//! In-process secret client.
//!
//! Keeps every version of every secret in memory. Enforces the same write
//! policy as the secret service, which makes it a drop-in stand-in for
//! local development and tests.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::client::{ClientError, ClientResult, SecretClient, SecretPath, SecretVersion};

/// Default maximum secret size (512 KiB).
pub const DEFAULT_MAX_SECRET_SIZE: usize = 512 * 1024;

/// Versioned in-memory secret store.
#[derive(Debug)]
pub struct MemoryClient {
    /// Versions per path, oldest first. Version `n` lives at index `n - 1`.
    secrets: RwLock<HashMap<String, Vec<Bytes>>>,
    max_secret_size: usize,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self {
            secrets: RwLock::new(HashMap::new()),
            max_secret_size: DEFAULT_MAX_SECRET_SIZE,
        }
    }

    /// Override the maximum accepted secret size.
    pub fn with_max_secret_size(mut self, max_secret_size: usize) -> Self {
        self.max_secret_size = max_secret_size;
        self
    }

    pub fn max_secret_size(&self) -> usize {
        self.max_secret_size
    }

    /// Number of paths currently holding at least one version.
    pub fn len(&self) -> usize {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretClient for MemoryClient {
    async fn get(&self, path: &SecretPath) -> ClientResult<SecretVersion> {
        let secrets = self.secrets.read().unwrap_or_else(PoisonError::into_inner);
        let versions = secrets
            .get(path.as_str())
            .ok_or(ClientError::SecretNotFound)?;

        let version = path.version().unwrap_or(versions.len() as u64);
        let data = usize::try_from(version)
            .ok()
            .and_then(|v| v.checked_sub(1))
            .and_then(|index| versions.get(index))
            .ok_or(ClientError::SecretNotFound)?;

        Ok(SecretVersion {
            version,
            data: data.clone(),
        })
    }

    async fn write(&self, path: &SecretPath, data: Bytes) -> ClientResult<u64> {
        if path.has_version() {
            return Err(ClientError::CannotWriteToVersion);
        }
        if data.is_empty() {
            return Err(ClientError::EmptySecret);
        }
        if data.len() > self.max_secret_size {
            return Err(ClientError::SecretTooBig);
        }

        let mut secrets = self.secrets.write().unwrap_or_else(PoisonError::into_inner);
        let versions = secrets.entry(path.as_str().to_string()).or_default();
        versions.push(data);
        Ok(versions.len() as u64)
    }

    async fn delete(&self, path: &SecretPath) -> ClientResult<()> {
        if path.has_version() {
            return Err(ClientError::CannotDeleteVersion);
        }

        let mut secrets = self.secrets.write().unwrap_or_else(PoisonError::into_inner);
        secrets
            .remove(path.as_str())
            .map(|_| ())
            .ok_or(ClientError::SecretNotFound)
    }
}
