//! Configuration loading for the `dr` binary.
//!
//! Configuration lives in a TOML file at `~/.config/dr/config.toml` and can
//! be partially overridden from the environment (`OPENAI_API_KEY`,
//! `SENDGRID_API_KEY`) and the command line.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use dr_tools::{EmailConfig, WebSearchConfig};

use crate::util::validate_email;

/// Sample configuration written by `dr setup` and shown when no
/// configuration can be found.
pub const SAMPLE_CONFIG: &str = r#"# Deep research configuration

# How many searches the planner should produce (optional, default 5).
# max_searches = 5

[provider]
# API key for the OpenAI-compatible provider. Falls back to $OPENAI_API_KEY.
# api_key = "sk-..."
# base_url = "https://api.openai.com/v1"
# model = "gpt-4o-mini"

[search]
# Base URL of the search backend.
host = "http://localhost:3000"

# Remove this section to disable email delivery.
[email]
# SendGrid API key. Falls back to $SENDGRID_API_KEY.
# api_key = "SG...."
from = "research@example.com"
to = "you@example.com"
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Number of searches the planner is asked for.
    pub max_searches: Option<usize>,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub search: SearchConfig,
    pub email: Option<EmailSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub host: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSection {
    pub api_key: Option<String>,
    pub from: String,
    pub to: String,
}

impl Config {
    /// Default config file location (`~/.config/dr/config.toml`).
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Could not determine config directory")?;
        Ok(base.join("dr").join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the default configuration; only an explicitly
    /// requested path is required to exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        if !path.exists() {
            if required {
                bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the provider API key from config or environment.
    pub fn provider_api_key(&self) -> Result<String> {
        if let Some(key) = &self.provider.api_key {
            return Ok(key.clone());
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                return Ok(key);
            }
        }
        bail!(
            "No provider API key configured. Set `provider.api_key` in the config \
             file or export OPENAI_API_KEY.\n\nSample config:\n\n{}",
            SAMPLE_CONFIG
        )
    }

    /// Search backend configuration.
    pub fn search_config(&self) -> WebSearchConfig {
        WebSearchConfig::new(&self.search.host)
    }

    /// Copy of the config with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(key) = &mut config.provider.api_key {
            *key = mask_key(key);
        }
        if let Some(email) = &mut config.email {
            if let Some(key) = &mut email.api_key {
                *key = mask_key(key);
            }
        }
        config
    }

    /// Resolve the email delivery configuration, if any.
    ///
    /// Returns `None` when no `[email]` section is present. Addresses are
    /// validated up front so delivery never fails on a typo at the last
    /// pipeline stage.
    pub fn email_config(&self) -> Result<Option<EmailConfig>> {
        let Some(section) = &self.email else {
            return Ok(None);
        };

        let api_key = match &section.api_key {
            Some(key) => key.clone(),
            None => match std::env::var("SENDGRID_API_KEY") {
                Ok(key) if !key.is_empty() => key,
                _ => bail!(
                    "Email delivery is configured but no SendGrid API key was found. \
                     Set `email.api_key` or export SENDGRID_API_KEY."
                ),
            },
        };

        if !validate_email(&section.from) {
            bail!("Invalid sender address in config: {}", section.from);
        }
        if !validate_email(&section.to) {
            bail!("Invalid recipient address in config: {}", section.to);
        }

        Ok(Some(EmailConfig::new(api_key, &section.from, &section.to)))
    }
}

/// Keep only a short prefix of an API key for identification.
fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{}...", visible)
}

/// Write the sample config to `path` unless a config already exists.
pub fn write_sample_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }
    std::fs::write(path, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(true)
}
