//! Configuration loading for medthread.
//! Reads medthread.toml from the current directory or the path in the
//! MEDTHREAD_CONFIG env var, then applies environment overrides for secrets.
//! Loaded once at process start and shared read-only afterwards.

use std::path::{Path, PathBuf};

use medthread_common::SelectionMode;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "MEDTHREAD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "medthread.toml";
pub const GEMINI_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
pub const NCBI_KEY_ENV_VAR: &str = "NCBI_API_KEY";
/// Upper bound for `search.lookback_years`.
pub const MAX_LOOKBACK_YEARS: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Missing API key: set llm.gemini.api_key or the {0} environment variable")]
    MissingApiKey(&'static str),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub thread: ThreadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16    { 5000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Upper bound for every outbound call (search, fetch, translate, generate).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 { 30 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs() }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_eutils_base_url")]
    pub eutils_base_url: String,
    #[serde(default = "default_lookback_years")]
    pub lookback_years: u32,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub mode: SelectionMode,
    /// Optional NCBI key; raises the E-utilities rate limit.
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
}

fn default_eutils_base_url() -> String { "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string() }
fn default_lookback_years()  -> u32    { 5 }
fn default_max_results()     -> usize  { 10 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            eutils_base_url: default_eutils_base_url(),
            lookback_years: default_lookback_years(),
            max_results: default_max_results(),
            mode: SelectionMode::default(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_translate_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

fn bool_true() -> bool { true }
fn default_translate_endpoint() -> String { "https://translate.googleapis.com/translate_a/single".to_string() }
fn default_target_language()    -> String { "en".to_string() }

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_translate_endpoint(),
            target_language: default_target_language(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_gemini_model()      -> String { "gemini-2.0-flash".to_string() }
fn default_gemini_base_url()   -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_temperature()       -> f32    { 0.9 }
fn default_max_output_tokens() -> u32    { 4096 }

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadConfig {
    /// Language the generated discussion thread is written in.
    #[serde(default = "default_thread_language")]
    pub language: String,
}

fn default_thread_language() -> String { "Japanese".to_string() }

impl Default for ThreadConfig {
    fn default() -> Self {
        Self { language: default_thread_language() }
    }
}

/// Blank strings count as absent, so `api_key = ""` falls through to the env.
fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()).map(SecretString::from))
}

mod tests;

impl Config {
    /// Load, apply environment overrides and validate.
    ///
    /// Checks MEDTHREAD_CONFIG first, then ./medthread.toml. A missing default
    /// file means built-in defaults; a missing file named by the env var is an
    /// error.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var(CONFIG_ENV_VAR).ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

        let config = if path.exists() {
            Self::from_file(&path)?
        } else if explicit.is_some() {
            return Err(ConfigError::NotFound(path));
        } else {
            Self::default()
        };

        let config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Fill secrets the file left empty from the environment.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };
        if self.llm.gemini.api_key.is_none() {
            self.llm.gemini.api_key = from_env(GEMINI_KEY_ENV_VAR);
        }
        if self.search.api_key.is_none() {
            self.search.api_key = from_env(NCBI_KEY_ENV_VAR);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.gemini.api_key.is_none() {
            return Err(ConfigError::MissingApiKey(GEMINI_KEY_ENV_VAR));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::Invalid {
                field: "search.max_results",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(1..=MAX_LOOKBACK_YEARS).contains(&self.search.lookback_years) {
            return Err(ConfigError::Invalid {
                field: "search.lookback_years",
                reason: format!("must be between 1 and {MAX_LOOKBACK_YEARS}"),
            });
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "http.timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http.timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
