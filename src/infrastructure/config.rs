//! Client configuration.
//!
//! TOML files with serde defaults, so partial files stay valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::error::{ClientError, Result};

/// API endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the marketplace API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds, enforced by the transport.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

/// Page sizes per listing type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_cards_page_size")]
    pub cards_page_size: u32,

    #[serde(default = "default_trades_page_size")]
    pub trades_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            cards_page_size: default_cards_page_size(),
            trades_page_size: default_trades_page_size(),
        }
    }
}

const fn default_cards_page_size() -> u32 {
    20
}

const fn default_trades_page_size() -> u32 {
    10
}

/// Storage paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom data directory (defaults to the platform data dir).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub paging: PagingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ClientError::Config {
            message: format!("failed to read config file {}: {e}", path.display()),
        })?;

        toml::from_str(&content).map_err(|e| ClientError::Config {
            message: format!("failed to parse config file: {e}"),
        })
    }

    /// Data directory, honoring the configured override.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(default_data_dir)
    }

    /// Path of the session database.
    #[must_use]
    pub fn session_db_path(&self) -> PathBuf {
        self.data_dir().join("session.db")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from(".card-market-client"),
        |dir| dir.join("card-market-client"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_all_defaults() {
        let config: ClientConfig = toml::from_str("").expect("empty config parses");
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.timeout_ms, 10_000);
        assert_eq!(config.paging.cards_page_size, 20);
        assert_eq!(config.paging.trades_page_size, 10);
        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_partial_file_keeps_section_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://market.example.com"
            "#,
        )
        .expect("partial config parses");

        assert_eq!(config.api.base_url, "https://market.example.com");
        assert_eq!(config.api.timeout_ms, 10_000, "unset field stays default");
        assert_eq!(config.paging.cards_page_size, 20, "unset section stays default");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client.toml");
        fs::write(
            &path,
            "[paging]\ncards_page_size = 50\n\n[storage]\ndata_dir = \"/tmp/cards\"\n",
        )
        .expect("write config");

        let config = ClientConfig::load_from_file(&path).expect("load");
        assert_eq!(config.paging.cards_page_size, 50);
        assert_eq!(config.session_db_path(), PathBuf::from("/tmp/cards/session.db"));
    }

    #[test]
    fn test_load_missing_file_is_a_config_error() {
        let err = ClientConfig::load_from_file(Path::new("/nonexistent/client.toml"))
            .expect_err("missing file fails");
        assert!(matches!(err, ClientError::Config { .. }));
    }
}
