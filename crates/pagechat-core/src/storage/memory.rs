//! In-memory key-value store.
//!
//! Backs tests and ephemeral runs. Entries are kept in a `BTreeMap` so
//! `get_all` is naturally ordered by key.

use std::collections::BTreeMap;
use std::sync::RwLock;

use pagechat_types::error::RepositoryError;

use super::kv_store::KvStore;

/// In-memory [`KvStore`].
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Io("memory store lock poisoned".to_string())
}

impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, RepositoryError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<(String, serde_json::Value)>, RepositoryError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_missing_key() {
        let store = MemoryKvStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryKvStore::new();
        store.set("theme", &json!("dark")).await.unwrap();
        assert_eq!(store.get("theme").await.unwrap(), Some(json!("dark")));

        store.remove("theme").await.unwrap();
        assert!(store.get("theme").await.unwrap().is_none());
        // Removing again is a no-op.
        store.remove("theme").await.unwrap();
    }

    #[tokio::test]
    async fn get_all_is_sorted_by_key() {
        let store = MemoryKvStore::new();
        store.set("chat_b", &json!(2)).await.unwrap();
        store.set("chat_a", &json!(1)).await.unwrap();
        store.set("theme", &json!("light")).await.unwrap();

        let keys: Vec<String> = store.get_all().await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["chat_a", "chat_b", "theme"]);
    }

    #[tokio::test]
    async fn clear_empties_store() {
        let store = MemoryKvStore::new();
        store.set("a", &json!(1)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}
