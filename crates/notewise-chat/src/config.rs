//! Generation endpoint configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::CallOptions;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Stored endpoint configuration (persisted to llm-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Timeout for ordinary calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout for streamed note generation.
    #[serde(default = "default_note_timeout_secs")]
    pub note_timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_note_max_tokens")]
    pub note_max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_model() -> String {
    DEFAULT_MODEL.into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_note_timeout_secs() -> u64 {
    300
}
fn default_max_tokens() -> u32 {
    4000
}
fn default_note_max_tokens() -> u32 {
    16000
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            timeout_secs: default_timeout_secs(),
            note_timeout_secs: default_note_timeout_secs(),
            max_tokens: default_max_tokens(),
            note_max_tokens: default_note_max_tokens(),
            temperature: default_temperature(),
            config_path: PathBuf::new(),
        }
    }
}

/// Public view of the configuration (key masked).
#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfigView {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "defaultModel")]
    pub default_model: String,
    pub configured: bool,
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
}

impl GenerationConfig {
    /// Load config from file, then let environment variables override.
    pub fn load(config_path: &Path) -> Self {
        let mut config: GenerationConfig = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        config.config_path = config_path.to_path_buf();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `NOTEWISE_API_KEY`, `NOTEWISE_BASE_URL` and `NOTEWISE_MODEL`
    /// from the given lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = get("NOTEWISE_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = get("NOTEWISE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = get("NOTEWISE_MODEL") {
            self.default_model = model;
        }
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved generation config to {}", self.config_path.display());
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            && !self.base_url.trim().is_empty()
    }

    /// Full URL of the chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn to_public(&self) -> GenerationConfigView {
        GenerationConfigView {
            base_url: self.base_url.clone(),
            default_model: self.default_model.clone(),
            configured: self.is_configured(),
            api_key: self.api_key.as_deref().map(mask_key),
        }
    }

    /// Options for ordinary calls.
    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            model: None,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// Options for streamed note generation.
    pub fn note_options(&self) -> CallOptions {
        CallOptions {
            model: None,
            max_tokens: self.note_max_tokens,
            temperature: 0.5,
            timeout: Duration::from_secs(self.note_timeout_secs),
        }
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".into();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
