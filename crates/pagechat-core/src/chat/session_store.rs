//! Per-page chat session persistence.
//!
//! Sessions live in the shared key-value store under `chat_<id>`. The store
//! has no index by URL, so every lookup scans all records and filters; with a
//! handful of sessions per profile that is fine. Records that fail to decode
//! are skipped with a warning rather than failing the scan.

use chrono::Utc;
use pagechat_types::chat::{ChatMessage, ChatSession, SESSION_KEY_PREFIX, SessionId};
use pagechat_types::error::RepositoryError;
use tracing::{debug, info, warn};

use crate::storage::KvStore;

/// Owns the `chat_` namespace of a [`KvStore`].
#[derive(Debug, Clone)]
pub struct SessionStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The session to use for `url`.
    ///
    /// With `force_new`, every stored session for `url` is deleted first and
    /// a fresh one is created. Otherwise the most recently updated session
    /// for `url` is returned, or a fresh one if there is none. Ties on
    /// `last_updated` go to the first record in key order.
    pub async fn resolve(&self, url: &str, force_new: bool) -> Result<ChatSession, RepositoryError> {
        let existing = self.scan().await?;

        if force_new {
            for session in existing.iter().filter(|s| s.page_url == url) {
                self.store.remove(&session.storage_key()).await?;
                debug!(session_id = %session.id, %url, "deleted session on reset");
            }
        } else {
            let mut latest: Option<ChatSession> = None;
            for session in existing.into_iter().filter(|s| s.page_url == url) {
                if latest
                    .as_ref()
                    .is_none_or(|best| session.last_updated > best.last_updated)
                {
                    latest = Some(session);
                }
            }
            if let Some(session) = latest {
                debug!(session_id = %session.id, %url, messages = session.messages.len(), "resumed session");
                return Ok(session);
            }
        }

        let session = ChatSession::new(url);
        self.save(&session).await?;
        info!(session_id = %session.id, %url, "created session");
        Ok(session)
    }

    /// Append `message` to an in-memory session and persist the whole record.
    ///
    /// The in-memory handle is updated even if the write fails.
    pub async fn append(
        &self,
        session: &mut ChatSession,
        message: ChatMessage,
    ) -> Result<(), RepositoryError> {
        session.messages.push(message);
        session.last_updated = Utc::now();
        self.save(session).await
    }

    /// Load session `id`, append `message`, and persist it.
    pub async fn append_by_id(
        &self,
        id: SessionId,
        message: ChatMessage,
    ) -> Result<ChatSession, RepositoryError> {
        let mut session = self.get(id).await?.ok_or(RepositoryError::NotFound)?;
        self.append(&mut session, message).await?;
        Ok(session)
    }

    pub async fn get(&self, id: SessionId) -> Result<Option<ChatSession>, RepositoryError> {
        match self.store.get(&id.storage_key()).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| RepositoryError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// All sessions, most recently updated first.
    pub async fn list(&self) -> Result<Vec<ChatSession>, RepositoryError> {
        let mut sessions = self.scan().await?;
        sessions.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(sessions)
    }

    /// Sessions for one page, most recently updated first.
    pub async fn list_for_url(&self, url: &str) -> Result<Vec<ChatSession>, RepositoryError> {
        let mut sessions = self.list().await?;
        sessions.retain(|s| s.page_url == url);
        Ok(sessions)
    }

    pub async fn delete(&self, id: SessionId) -> Result<(), RepositoryError> {
        self.store.remove(&id.storage_key()).await
    }

    async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let value = serde_json::to_value(session)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        self.store.set(&session.storage_key(), &value).await
    }

    /// Every decodable session record, in key order.
    async fn scan(&self) -> Result<Vec<ChatSession>, RepositoryError> {
        let entries = self.store.get_all().await?;
        let sessions = entries
            .into_iter()
            .filter(|(key, _)| key.starts_with(SESSION_KEY_PREFIX))
            .filter_map(|(key, value)| match serde_json::from_value::<ChatSession>(value) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(%key, error = %e, "skipping unreadable session record");
                    None
                }
            })
            .collect();
        Ok(sessions)
    }
}
