//! Configuration (layered: code > env > file).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AbacusError, Result};
use crate::history::{DEFAULT_HISTORY_CAPACITY, DEFAULT_RECENT_WINDOW};
use crate::provider::http::DEFAULT_REQUEST_TIMEOUT;
use crate::provider::{ProviderAdapter, ProviderKind};
use crate::transport::RetryPolicy;
use crate::types::ModelSettings;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "ABACUS_CONFIG";

pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Everything a [`crate::agent::ChatAgent`] needs to talk to a model.
///
/// Resolution order:
/// 1. Values set in code (`with_*` methods)
/// 2. `ABACUS_*` environment variables, `.env` included
/// 3. TOML file at `$ABACUS_CONFIG` or `<config dir>/abacus/config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub provider: ProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Falls back to the provider's default model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub settings: ModelSettings,
    pub max_iterations: u32,
    pub history_capacity: usize,
    pub recent_window: usize,
    pub retry: RetryPolicy,
    pub request_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            base_url: None,
            model: None,
            settings: ModelSettings::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            recent_window: DEFAULT_RECENT_WINDOW,
            retry: RetryPolicy::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl AgentConfig {
    /// Load file and environment layers.
    ///
    /// A missing file is fine; a malformed one is an error.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv(); // .env is optional
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(Self::default_path);
        let config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.with_env()
    }

    /// `<config dir>/abacus/config.toml`, when a home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("abacus").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw).map_err(|e| match e {
                AbacusError::Configuration(msg) => {
                    AbacusError::Configuration(format!("{}: {msg}", path.display()))
                }
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| AbacusError::Configuration(format!("invalid config: {e}")))
    }

    /// Overlay `ABACUS_*` variables from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Overlay `ABACUS_*` variables from `lookup`.
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get("ABACUS_PROVIDER") {
            self.provider = parse_var("ABACUS_PROVIDER", &provider)?;
        }
        if let Some(key) = get("ABACUS_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = get("ABACUS_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(model) = get("ABACUS_MODEL") {
            self.model = Some(model);
        }
        if let Some(max_tokens) = get("ABACUS_MAX_TOKENS") {
            self.settings.max_tokens = parse_var("ABACUS_MAX_TOKENS", &max_tokens)?;
        }
        if let Some(temperature) = get("ABACUS_TEMPERATURE") {
            self.settings.temperature = parse_var("ABACUS_TEMPERATURE", &temperature)?;
        }
        if let Some(stream) = get("ABACUS_STREAM") {
            self.settings.stream = parse_var("ABACUS_STREAM", &stream)?;
        }
        Ok(self)
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Configured model, or the provider default.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Precondition check run before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(AbacusError::Configuration(format!(
                "missing API key for provider '{}'",
                self.provider
            )));
        }
        if self.max_iterations == 0 {
            return Err(AbacusError::Configuration(
                "max_iterations must be at least 1".into(),
            ));
        }
        self.adapter().map(|_| ())
    }

    pub fn adapter(&self) -> Result<ProviderAdapter> {
        ProviderAdapter::new(
            self.provider,
            self.api_key.clone().unwrap_or_default(),
            self.base_url.clone(),
            self.model(),
        )
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AbacusError::Configuration(format!("{key} has invalid value '{value}'")))
}
