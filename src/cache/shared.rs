//! Shared (cross-process) cache tier contract.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use glob::Pattern;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SharedCacheError {
    #[error("shared cache unavailable: {0}")]
    Unavailable(String),
    #[error("shared cache backend error: {message}")]
    Backend { message: String },
}

impl SharedCacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Result of asking a shared backend to delete keys by pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDeletion {
    /// The backend removed the matching keys itself.
    Deleted { removed: usize },
    /// The backend cannot delete by pattern; the caller must fall back.
    Unsupported,
}

/// A cache shared across processes, partitioned into named groups.
///
/// Values are opaque bytes. TTLs are advisory and enforced by the backend.
#[async_trait]
pub trait SharedCache: Send + Sync {
    async fn get(&self, group: &str, key: &str) -> Result<Option<Bytes>, SharedCacheError>;

    async fn set(
        &self,
        group: &str,
        key: &str,
        value: Bytes,
        ttl: Duration,
    ) -> Result<(), SharedCacheError>;

    /// Deleting an absent key succeeds.
    async fn delete(&self, group: &str, key: &str) -> Result<(), SharedCacheError>;

    /// Drops every entry of the group.
    async fn flush_group(&self, group: &str) -> Result<(), SharedCacheError>;

    /// Deletes keys of the group matching `pattern`, when the backend can.
    async fn delete_matching(
        &self,
        _group: &str,
        _pattern: &Pattern,
    ) -> Result<PatternDeletion, SharedCacheError> {
        Ok(PatternDeletion::Unsupported)
    }
}
