use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};
use url::Url;

use crate::recommendations::FarmSnapshot;

pub const DEFAULT_CONFIG_PATH: &str = "config/fieldsense.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Invalid URL for {key}: {reason}")]
    InvalidUrl { key: &'static str, reason: String },
    #[error("AI_PROVIDER is gemini but no GEMINI_API_KEY is configured")]
    MissingGeminiKey,
}

/// A credential. Never printed.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderChoice {
    /// Gemini when a key is configured, otherwise the stub.
    #[default]
    Auto,
    Gemini,
    Stub,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8081,
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/conversations.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: ProviderChoice,
    pub gemini_api_key: Option<Secret>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub context_entries: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderChoice::Auto,
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            context_entries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: Option<Secret>,
    pub base_url: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openweathermap.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub weather: WeatherConfig,
    pub farm: FarmSnapshot,
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            ai: AiConfig::default(),
            weather: WeatherConfig::default(),
            farm: FarmSnapshot::default(),
            http_timeout_secs: 30,
        }
    }
}

fn parse_env<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|_| ConfigError::InvalidValue { key, value })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn validate_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        key,
        reason: e.to_string(),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl {
            key,
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(())
}

impl AppConfig {
    /// Defaults, then the YAML file (`FIELDSENSE_CONFIG`, or `config/fieldsense.yaml` when it
    /// exists), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("FIELDSENSE_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                default.exists().then_some(default)
            });

        let mut config = match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_yaml_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORT") {
            self.server.port = parse_env("PORT", v)?;
        }
        if let Some(v) = lookup("BIND_ADDRESS").and_then(non_empty) {
            self.server.bind_address = v;
        }
        if let Some(v) = lookup("STATIC_DIR").and_then(non_empty) {
            self.server.static_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DATABASE_PATH").and_then(non_empty) {
            self.storage.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("AI_PROVIDER").and_then(non_empty) {
            self.ai.provider = parse_env("AI_PROVIDER", v)?;
        }
        if let Some(v) = lookup("GEMINI_API_KEY").and_then(non_empty) {
            self.ai.gemini_api_key = Some(Secret::new(v));
        }
        if let Some(v) = lookup("GEMINI_MODEL").and_then(non_empty) {
            self.ai.gemini_model = v;
        }
        if let Some(v) = lookup("GEMINI_BASE_URL").and_then(non_empty) {
            self.ai.gemini_base_url = v;
        }
        if let Some(v) = lookup("WEATHER_API_KEY").and_then(non_empty) {
            self.weather.api_key = Some(Secret::new(v));
        }
        if let Some(v) = lookup("WEATHER_BASE_URL").and_then(non_empty) {
            self.weather.base_url = v;
        }
        if let Some(v) = lookup("HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = parse_env("HTTP_TIMEOUT_SECS", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("GEMINI_BASE_URL", &self.ai.gemini_base_url)?;
        validate_url("WEATHER_BASE_URL", &self.weather.base_url)?;

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HTTP_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        if self.ai.gemini_model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "GEMINI_MODEL",
                value: String::new(),
            });
        }
        if self.ai.provider == ProviderChoice::Gemini && self.ai.gemini_api_key.is_none() {
            return Err(ConfigError::MissingGeminiKey);
        }
        Ok(())
    }

    /// Whether requests go to Gemini rather than the stub.
    pub fn uses_gemini(&self) -> bool {
        match self.ai.provider {
            ProviderChoice::Stub => false,
            ProviderChoice::Gemini | ProviderChoice::Auto => self.ai.gemini_api_key.is_some(),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
