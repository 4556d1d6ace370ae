//! Configuration management for polyprompt
//!
//! Lives in `<config dir>/config.toml`; every section falls back to defaults
//! so a partial file is fine. `POLYPROMPT_HOME` overrides the config dir.

use crate::llm::ModelDescriptor;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that relocates the config directory
pub const HOME_ENV: &str = "POLYPROMPT_HOME";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub dispatch: DispatchConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Route CLI completions through a relay server instead of calling
/// providers directly
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Call all selected models at once (false: one after another)
    pub concurrent: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { concurrent: true }
    }
}

/// Extra or replacement model descriptors
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CatalogConfig {
    pub models: Vec<ModelDescriptor>,
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))
        } else {
            Ok(Config::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Save configuration to default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }
}

/// Config directory, created if missing
pub fn config_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(HOME_ENV) {
        Some(home) => PathBuf::from(home),
        None => match directories::ProjectDirs::from("", "", "polyprompt") {
            Some(proj_dirs) => proj_dirs.config_dir().to_path_buf(),
            None => PathBuf::from(".polyprompt"),
        },
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config dir {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderKind;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8787);
        assert!(config.relay.url.is_none());
        assert!(config.dispatch.concurrent);
        assert!(config.catalog.models.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
[server]
port = 9000

[dispatch]
concurrent = false
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.dispatch.concurrent);
    }

    #[test]
    fn test_catalog_models_from_toml() {
        let config = Config::from_toml(
            r#"
[relay]
url = "http://127.0.0.1:8787"

[[catalog.models]]
id = "llama3-70b"
name = "Llama 3 70B (Groq)"
provider = "openai"
apiKeyName = "groq"
apiEndpoint = "https://api.groq.com/openai/v1/chat/completions"
maxTokens = 1024
"#,
        )
        .unwrap();
        assert_eq!(config.relay.url.as_deref(), Some("http://127.0.0.1:8787"));
        let model = &config.catalog.models[0];
        assert_eq!(model.provider, ProviderKind::OpenAi);
        assert_eq!(model.api_key_name, "groq");
        assert_eq!(model.max_tokens, Some(1024));
        assert_eq!(model.temperature, None);
    }

    // The only test in this binary that touches HOME_ENV
    #[test]
    fn test_save_then_load_in_home_override() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::env::set_var(HOME_ENV, tmp.path());

        let mut config = Config::default();
        config.server.port = 9100;
        config.relay.url = Some("http://relay.internal:8787".into());
        config.save().unwrap();

        assert_eq!(Config::config_path().unwrap(), tmp.path().join("config.toml"));
        let loaded = Config::load().unwrap();
        std::env::remove_var(HOME_ENV);

        assert_eq!(loaded.server.port, 9100);
        assert_eq!(loaded.relay.url.as_deref(), Some("http://relay.internal:8787"));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let result = Config::from_toml(
            r#"
[[catalog.models]]
id = "x"
name = "X"
provider = "bard"
apiKeyName = "x"
apiEndpoint = "http://x"
"#,
        );
        assert!(result.is_err());
    }
}
