//! User preferences kept in the shared key-value store.
//!
//! Each preference is a single scalar under a fixed key. Reads never fail on
//! bad data: a value of the wrong shape is treated as absent.

use pagechat_types::error::RepositoryError;
use pagechat_types::settings::{
    API_KEY_KEY, SIDEBAR_PINNED_KEY, SIDEBAR_POSITION_KEY, SidebarPosition, THEME_KEY, Theme,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use crate::storage::KvStore;

/// Typed access to the stored preferences.
#[derive(Debug, Clone)]
pub struct Settings<S: KvStore> {
    store: S,
}

impl<S: KvStore> Settings<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The generation API key, if a non-empty one is stored.
    pub async fn api_key(&self) -> Result<Option<SecretString>, RepositoryError> {
        let value = self.store.get(API_KEY_KEY).await?;
        Ok(value
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(|key| SecretString::from(key.to_string())))
    }

    pub async fn set_api_key(&self, key: &SecretString) -> Result<(), RepositoryError> {
        self.store
            .set(API_KEY_KEY, &Value::String(key.expose_secret().trim().to_string()))
            .await?;
        debug!("API key saved");
        Ok(())
    }

    pub async fn clear_api_key(&self) -> Result<(), RepositoryError> {
        self.store.remove(API_KEY_KEY).await
    }

    /// The stored theme, or the default when unset or unrecognized.
    pub async fn theme(&self) -> Result<Theme, RepositoryError> {
        let value = self.store.get(THEME_KEY).await?;
        let theme = match value.as_ref().and_then(Value::as_str) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = raw, "unrecognized stored theme, using default");
                Theme::default()
            }),
            None => Theme::default(),
        };
        Ok(theme)
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<(), RepositoryError> {
        self.store
            .set(THEME_KEY, &Value::String(theme.as_str().to_string()))
            .await
    }

    pub async fn pinned(&self) -> Result<bool, RepositoryError> {
        let value = self.store.get(SIDEBAR_PINNED_KEY).await?;
        Ok(value.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn set_pinned(&self, pinned: bool) -> Result<(), RepositoryError> {
        self.store.set(SIDEBAR_PINNED_KEY, &Value::Bool(pinned)).await
    }

    /// Where the sidebar should open.
    ///
    /// A stored position only applies while the sidebar is pinned.
    pub async fn sidebar_position(&self) -> Result<SidebarPosition, RepositoryError> {
        if !self.pinned().await? {
            return Ok(SidebarPosition::default());
        }
        let value = self.store.get(SIDEBAR_POSITION_KEY).await?;
        Ok(value
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default())
    }

    /// Remember `position` if pinned; otherwise forget any stored position.
    pub async fn save_sidebar_position(
        &self,
        position: SidebarPosition,
    ) -> Result<(), RepositoryError> {
        if self.pinned().await? {
            let value = serde_json::to_value(position)
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
            self.store.set(SIDEBAR_POSITION_KEY, &value).await
        } else {
            self.store.remove(SIDEBAR_POSITION_KEY).await
        }
    }
}
