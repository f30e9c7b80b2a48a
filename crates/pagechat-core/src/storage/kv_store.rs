//! Key-value store trait.
//!
//! The one persistence primitive: string keys, JSON values, no transactions,
//! last write wins. Sessions and settings share a single store.

use std::future::Future;
use std::sync::Arc;

use pagechat_types::error::RepositoryError;

/// Trait for the shared key-value persistent store.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations: [`MemoryKvStore`](super::MemoryKvStore) here, the JSON
/// file store in pagechat-infra.
pub trait KvStore: Send + Sync {
    /// Get a value by key. Returns None if the key does not exist.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, RepositoryError>> + Send;

    /// Set a value for a key (upsert).
    fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Remove a key. No-op if the key does not exist.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Every stored entry, ordered by key ascending.
    ///
    /// The ordering is part of the contract: callers that scan for a "first
    /// match" rely on it to stay deterministic across runs.
    fn get_all(
        &self,
    ) -> impl Future<Output = Result<Vec<(String, serde_json::Value)>, RepositoryError>> + Send;

    /// Remove everything.
    fn clear(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

impl<T: KvStore> KvStore for Arc<T> {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, RepositoryError>> + Send {
        (**self).get(key)
    }

    fn set(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        (**self).remove(key)
    }

    fn get_all(
        &self,
    ) -> impl Future<Output = Result<Vec<(String, serde_json::Value)>, RepositoryError>> + Send {
        (**self).get_all()
    }

    fn clear(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        (**self).clear()
    }
}
