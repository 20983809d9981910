use crate::core::rate::Period;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const API_KEY_ENV: &str = "RATEDESK_STORE_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreProvider {
    #[default]
    Postgrest,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub provider: StoreProvider,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "exchange_rates".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            provider: StoreProvider::Memory,
            base_url: None,
            api_key: None,
            table: default_table(),
        }
    }
}

impl StoreConfig {
    /// API key from the config file, falling back to the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdminConfig {
    pub password: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_session_ttl() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub admin: Option<AdminConfig>,
    #[serde(default)]
    pub default_period: Period,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "ratedesk", "ratedesk")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("com", "ratedesk", "ratedesk")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
store:
  provider: postgrest
  base_url: "https://example.supabase.co"
  api_key: "anon-key"
server:
  bind: "0.0.0.0:8080"
admin:
  password: "s3cret"
default_period: "P7"
data_path: "/tmp/ratedesk"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.store.provider, StoreProvider::Postgrest);
        assert_eq!(
            config.store.base_url.as_deref(),
            Some("https://example.supabase.co")
        );
        assert_eq!(config.store.resolved_api_key().as_deref(), Some("anon-key"));
        assert_eq!(config.store.table, "exchange_rates");
        assert_eq!(config.server.bind, "0.0.0.0:8080");

        let admin = config.admin.as_ref().unwrap();
        assert_eq!(admin.password, "s3cret");
        assert_eq!(admin.session_ttl_secs, 3600);

        assert_eq!(config.default_period.as_str(), "P7");
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/ratedesk")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.store.provider, StoreProvider::Memory);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert!(config.admin.is_none());
        assert_eq!(config.default_period.as_str(), "P5");
    }

    #[test]
    fn test_provider_defaults_to_postgrest_when_store_section_present() {
        let config: AppConfig =
            serde_yaml::from_str("store:\n  base_url: \"http://localhost:54321\"\n").unwrap();
        assert_eq!(config.store.provider, StoreProvider::Postgrest);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = AppConfig::load_from_path("/nonexistent/ratedesk/config.yaml");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
