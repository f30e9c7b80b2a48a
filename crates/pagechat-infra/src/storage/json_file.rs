//! File-per-key JSON implementation of [`KvStore`].
//!
//! Each key lives in its own `<key>.json` file under the store directory and
//! nothing is cached in memory, so every read sees what is on disk. Writes go
//! through a uniquely named temporary sibling and a rename: a crash or a
//! failed write leaves the previous value in place, and two processes
//! sharing a directory only ever race on the same key (last write wins).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use pagechat_core::storage::KvStore;
use pagechat_types::error::RepositoryError;
use serde_json::Value;
use tracing::{debug, warn};

const VALUE_EXT: &str = "json";

/// File-backed [`KvStore`].
#[derive(Debug)]
pub struct JsonFileKvStore {
    dir: PathBuf,
    tmp_seq: AtomicU64,
}

impl JsonFileKvStore {
    /// Open the store rooted at `dir`, creating it as needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(io_error)?;
        debug!(dir = %dir.display(), "opened key-value store");
        Ok(Self {
            dir,
            tmp_seq: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{VALUE_EXT}", encode_key(key)))
    }

    fn tmp_path(&self, key: &str) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{seq}.tmp",
            encode_key(key),
            std::process::id()
        ))
    }

    async fn read_value(path: &Path) -> Result<Option<Value>, RepositoryError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| RepositoryError::Serialization(format!("{}: {e}", path.display()))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(err)),
        }
    }

    /// Keys with a value file, in no particular order.
    async fn keys(&self) -> Result<Vec<String>, RepositoryError> {
        let mut keys = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await.map_err(io_error)?;
        while let Some(entry) = dir.next_entry().await.map_err(io_error)? {
            let is_file = entry.file_type().await.map_err(io_error)?.is_file();
            let path = entry.path();
            if !is_file || path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXT) {
                continue;
            }
            if let Some(key) = path.file_stem().and_then(|s| s.to_str()).and_then(decode_key) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

fn io_error(err: std::io::Error) -> RepositoryError {
    RepositoryError::Io(err.to_string())
}

fn is_plain(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// File stem for `key`. Bytes outside `[A-Za-z0-9_-]` become `%XX`.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if is_plain(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn decode_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = stem.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b if is_plain(b) => {
                out.push(b);
                i += 1;
            }
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}

impl KvStore for JsonFileKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        Self::read_value(&self.value_path(key)).await
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), RepositoryError> {
        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let tmp = self.tmp_path(key);

        let written = match tokio::fs::write(&tmp, body).await {
            Ok(()) => tokio::fs::rename(&tmp, self.value_path(key)).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            warn!(%key, error = %err, "failed to write store value");
            return Err(io_error(err));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), RepositoryError> {
        match tokio::fs::remove_file(self.value_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(err)),
        }
    }

    /// Every readable entry, sorted by key. Unreadable files are skipped.
    async fn get_all(&self) -> Result<Vec<(String, Value)>, RepositoryError> {
        let mut keys = self.keys().await?;
        keys.sort();

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            match Self::read_value(&self.value_path(&key)).await {
                Ok(Some(value)) => entries.push((key, value)),
                // Removed by another process since the listing.
                Ok(None) => {}
                Err(e) => warn!(%key, error = %e, "skipping unreadable store value"),
            }
        }
        Ok(entries)
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        for key in self.keys().await? {
            self.remove(&key).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn values_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("store");

        let store = JsonFileKvStore::open(&dir).await.unwrap();
        store.set("theme", &json!("dark")).await.unwrap();
        store
            .set("chat_1", &json!({"id": "1", "messages": []}))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileKvStore::open(&dir).await.unwrap();
        assert_eq!(reopened.get("theme").await.unwrap(), Some(json!("dark")));
        assert_eq!(reopened.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_all_is_sorted_by_key() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileKvStore::open(tmp.path()).await.unwrap();
        for key in ["chat_b", "theme", "chat_a"] {
            store.set(key, &json!(1)).await.unwrap();
        }

        let keys: Vec<String> = store.get_all().await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["chat_a", "chat_b", "theme"]);
    }

    #[tokio::test]
    async fn remove_and_clear_are_persisted() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileKvStore::open(tmp.path()).await.unwrap();
        store.set("a", &json!(1)).await.unwrap();
        store.set("b", &json!(2)).await.unwrap();

        store.remove("a").await.unwrap();
        store.remove("missing").await.unwrap();
        assert_eq!(JsonFileKvStore::open(tmp.path()).await.unwrap().get("a").await.unwrap(), None);

        store.clear().await.unwrap();
        assert!(JsonFileKvStore::open(tmp.path()).await.unwrap().get_all().await.unwrap().is_empty());
        let leftovers = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_value() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileKvStore::open(tmp.path()).await.unwrap();
        store.set("theme", &json!("light")).await.unwrap();

        // A non-empty directory at the value path makes the rename fail.
        let blocker = tmp.path().join("geminiApiKey.json");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), "x").unwrap();

        assert!(matches!(
            store.set("geminiApiKey", &json!("k")).await,
            Err(RepositoryError::Io(_))
        ));
        let entries = store.get_all().await.unwrap();
        assert_eq!(entries, vec![("theme".to_string(), json!("light"))]);

        let tmp_files = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(tmp_files, 0);
    }

    #[tokio::test]
    async fn two_instances_do_not_erase_each_other() {
        let tmp = TempDir::new().unwrap();
        let a = JsonFileKvStore::open(tmp.path()).await.unwrap();
        let b = JsonFileKvStore::open(tmp.path()).await.unwrap();

        a.set("chat_a", &json!({"url": "https://a.example"})).await.unwrap();
        b.set("theme", &json!("dark")).await.unwrap();
        b.set("chat_b", &json!({"url": "https://b.example"})).await.unwrap();
        a.remove("chat_b").await.unwrap();

        let keys: Vec<String> = JsonFileKvStore::open(tmp.path())
            .await
            .unwrap()
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["chat_a", "theme"]);
        assert_eq!(b.get("chat_a").await.unwrap(), Some(json!({"url": "https://a.example"})));
    }

    #[tokio::test]
    async fn unusual_keys_round_trip_through_file_names() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileKvStore::open(tmp.path()).await.unwrap();
        store.set("a/b c.é", &json!(true)).await.unwrap();

        assert_eq!(store.get("a/b c.é").await.unwrap(), Some(json!(true)));
        let keys: Vec<String> = store.get_all().await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a/b c.é"]);
    }

    #[tokio::test]
    async fn corrupt_value_is_an_error_on_get_and_skipped_in_listing() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileKvStore::open(tmp.path()).await.unwrap();
        store.set("ok", &json!(1)).await.unwrap();
        std::fs::write(tmp.path().join("bad.json"), "{not json").unwrap();

        assert!(matches!(
            store.get("bad").await,
            Err(RepositoryError::Serialization(_))
        ));
        assert_eq!(store.get_all().await.unwrap(), vec![("ok".to_string(), json!(1))]);
    }
}
