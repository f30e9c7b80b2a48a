//! Configuration loading for pagechat.
//!
//! Reads `config.toml` from the data directory (`~/.pagechat/` in production)
//! and deserializes it into [`AppConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use pagechat_types::config::AppConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PAGECHAT_DATA_DIR";

/// Directory of the key-value store inside the data directory.
pub const STORE_DIR: &str = "store";

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`AppConfig::default()`].
/// - Unreadable or unparsable file: a warning and the default.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Resolve the data directory.
///
/// `PAGECHAT_DATA_DIR` if set, else `~/.pagechat`, else `.pagechat` in the
/// working directory.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".pagechat");
    }

    PathBuf::from(".pagechat")
}

/// Path of the key-value store directory under `data_dir`.
pub fn store_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STORE_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagechat_types::llm::OutputLanguage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn valid_toml_overrides_fields() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
model = "gemini-2.5-pro"
max_input_tokens = 2048
output_language = "de"
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.max_input_tokens, 2048);
        assert_eq!(config.output_language, OutputLanguage::from_code("de"));
        assert_eq!(config.chars_per_token, 4);
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "model = [unterminated")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn data_dir_from_env() {
        // SAFETY: the variable is set and removed within this test only.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-pagechat");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-pagechat"));
        assert_eq!(store_path(&dir), PathBuf::from("/tmp/test-pagechat/store"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}
