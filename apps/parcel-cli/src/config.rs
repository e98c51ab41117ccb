//! CLI configuration.
//!
//! Configuration is stored as TOML, looked up in order:
//! - the `--config` argument
//! - `$PARCEL_CONFIG`
//! - Linux: `~/.config/parcel/config.toml`
//! - Windows: `%APPDATA%/parcel/config.toml`
//!
//! A missing default file means defaults. `$PARCEL_SERVER_URL` overrides
//! `server_url`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use parcel_protocol::constants::SIGNED_URL_EXPIRY;
use parcel_uploader::UploaderConfig;
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "PARCEL_CONFIG";
const SERVER_URL_ENV: &str = "PARCEL_SERVER_URL";

/// Uploader CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the upload server.
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub upload: UploaderConfig,
}

fn default_server_url() -> String {
    "http://localhost:3001".into()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout_secs(),
            upload: UploaderConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration, applying environment overrides.
    ///
    /// An explicitly named file must exist; the default location may not.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match named {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = config_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env(std::env::var(SERVER_URL_ENV).ok());
        config.upload.validate()?;
        if config.request_timeout() > SIGNED_URL_EXPIRY {
            tracing::warn!(
                timeout_secs = config.request_timeout_secs,
                expiry_secs = SIGNED_URL_EXPIRY.as_secs(),
                "request timeout exceeds signed URL lifetime"
            );
        }
        Ok(config)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration read");
        Ok(config)
    }

    fn apply_env(&mut self, server_url: Option<String>) {
        if let Some(url) = server_url.filter(|u| !u.trim().is_empty()) {
            self.server_url = url;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").context("APPDATA is not set")?;
        Ok(PathBuf::from(appdata).join("parcel").join("config.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("parcel")
            .join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:3001");
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert_eq!(config.upload, UploaderConfig::default());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml_str = r#"
            server_url = "https://upload.example.com"

            [upload]
            max_concurrency = 6
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server_url, "https://upload.example.com");
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.upload.max_concurrency, 6);
        assert_eq!(config.upload.chunk_size, 5 * 1024 * 1024);
        assert_eq!(config.upload.max_retry_attempts, 3);
    }

    #[test]
    fn roundtrip_toml() {
        let config = Config {
            server_url: "http://10.0.0.2:3001".into(),
            request_timeout_secs: 30,
            upload: UploaderConfig {
                chunk_size: 8 * 1024 * 1024,
                max_concurrency: 4,
                max_retry_attempts: 5,
                retry_base_delay_ms: 250,
            },
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn env_overrides_server_url() {
        let mut config = Config::default();
        config.apply_env(Some("http://override:9000".into()));
        assert_eq!(config.server_url, "http://override:9000");

        config.apply_env(Some("  ".into()));
        assert_eq!(config.server_url, "http://override:9000");
        config.apply_env(None);
        assert_eq!(config.server_url, "http://override:9000");
    }

    #[test]
    fn load_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("parcel.toml");
        std::fs::write(&path, "request_timeout_secs = 15\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.request_timeout_secs, 15);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&tmp.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn invalid_upload_section_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("parcel.toml");
        std::fs::write(&path, "[upload]\nchunk_size = 0\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("parcel"));
    }
}
