use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

use crate::language_utils::Language;

/// Application configuration module
/// This module holds every setting a translation run consumes: language
/// pair, identifier mode, translation backend, archive tool and output
/// layout. Loading from disk is done by the binary.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language
    pub source_language: Language,

    /// Target language
    pub target_language: Language,

    /// How curated identifiers are resolved
    #[serde(default)]
    pub mode: SyncMode,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// External archive tool config
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Output directory layout
    #[serde(default)]
    pub output: OutputConfig,

    /// Identifier dictionary settings
    #[serde(default)]
    pub identifiers: IdentifierConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Identifier handling mode of the synchronizer
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Dictionary hints are substituted verbatim for known identifiers
    Preserve,
    /// Backend output is the canonical translation of every identifier
    #[default]
    Synchronize,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Google Translate (free endpoint or Cloud API)
    #[default]
    Google,
    // @provider: OpenAI-compatible chat completions (OpenAI, OpenRouter)
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: Offline mock, for dry runs
    Mock,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Google => "Google Translate",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Mock => "Mock",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Google => "google".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }

    // @returns: Whether requests need an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

// Implement Display trait for TranslationProvider
impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for TranslationProvider
impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "openai" | "llm" | "openrouter" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        let (model, endpoint) = match provider_type {
            TranslationProvider::Google => (String::new(), default_google_endpoint()),
            TranslationProvider::OpenAI => (default_openai_model(), default_openai_endpoint()),
            TranslationProvider::Anthropic => (default_anthropic_model(), default_anthropic_endpoint()),
            TranslationProvider::Mock => (String::new(), String::new()),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Attempts per batch before giving up
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before the second attempt (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Factor applied to the delay for each further attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,

    /// Number of items between two pacing pauses
    #[serde(default = "default_pacing_interval")]
    pub pacing_interval: usize,

    /// Pacing pause length in milliseconds
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,

    /// Texts per request for LLM providers
    #[serde(default = "default_llm_batch_size")]
    pub llm_batch_size: usize,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Free text describing the material, given to LLM providers
    #[serde(default = "default_context")]
    pub context: String,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            pacing_interval: default_pacing_interval(),
            pacing_delay_ms: default_pacing_delay_ms(),
            llm_batch_size: default_llm_batch_size(),
            temperature: default_temperature(),
            context: default_context(),
        }
    }
}

/// External archive tool configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArchiveConfig {
    /// Path to the mpqcli executable
    #[serde(default = "default_tool_path")]
    pub tool_path: PathBuf,

    /// Optional listfile passed to every tool invocation
    #[serde(default)]
    pub listfile_path: Option<PathBuf>,

    /// Timeout for a single extract or repack call
    #[serde(default = "default_archive_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            tool_path: default_tool_path(),
            listfile_path: None,
            timeout_secs: default_archive_timeout_secs(),
        }
    }
}

/// Output directory layout
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Timestamped copies of the original archives
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Translated copies of protected maps
    #[serde(default = "default_protected_dir")]
    pub protected_dir: PathBuf,

    /// Final translated campaigns
    #[serde(default = "default_translated_dir")]
    pub translated_dir: PathBuf,

    /// Parent directory of per-run temp workspaces
    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            protected_dir: default_protected_dir(),
            translated_dir: default_translated_dir(),
            work_root: default_work_root(),
        }
    }
}

impl OutputConfig {
    /// Layout with every root placed under one base directory
    pub fn under(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            backup_dir: base.join(default_backup_dir()),
            protected_dir: base.join(default_protected_dir()),
            translated_dir: base.join(default_translated_dir()),
            work_root: base.clone(),
        }
    }
}

/// Identifier dictionary settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct IdentifierConfig {
    /// JSON or numbered-text dictionary; built-in defaults when absent
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,

    /// Script literals that must never be treated as identifiers
    #[serde(default)]
    pub blacklist: Vec<String>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each further attempt
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_pacing_interval() -> usize {
    10
}

fn default_pacing_delay_ms() -> u64 {
    1000
}

fn default_llm_batch_size() -> usize {
    20
}

fn default_temperature() -> f32 {
    0.3
}

fn default_context() -> String {
    "Warcraft III Campaign Text".to_string()
}

fn default_tool_path() -> PathBuf {
    PathBuf::from("mpqcli")
}

fn default_archive_timeout_secs() -> u64 {
    300
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backup")
}

fn default_protected_dir() -> PathBuf {
    PathBuf::from("protected")
}

fn default_translated_dir() -> PathBuf {
    PathBuf::from("translated")
}

fn default_work_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_google_endpoint() -> String {
    "https://translate.googleapis.com".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.source_language == self.target_language {
            return Err(anyhow!(
                "Source and target language are both {}",
                self.source_language
            ));
        }

        if self.translation.provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider",
                self.translation.provider.display_name()
            ));
        }

        let common = &self.translation.common;
        if common.retry_attempts == 0 {
            return Err(anyhow!("retry_attempts must be at least 1"));
        }
        if common.backoff_multiplier == 0 {
            return Err(anyhow!("backoff_multiplier must be at least 1"));
        }
        if common.pacing_interval == 0 {
            return Err(anyhow!("pacing_interval must be at least 1"));
        }
        if self.archive.timeout_secs == 0 {
            return Err(anyhow!("archive timeout_secs must be at least 1"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: Language::Chinese,
            target_language: Language::English,
            mode: SyncMode::default(),
            translation: TranslationConfig::default(),
            archive: ArchiveConfig::default(),
            output: OutputConfig::default(),
            identifiers: IdentifierConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::Google | TranslationProvider::Mock => String::new(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::Google => default_google_endpoint(),
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::Mock => String::new(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Google),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Anthropic),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
