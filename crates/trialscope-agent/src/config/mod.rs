//! Configuration loading for Trialscope.
//! Reads trialscope.toml from the current directory or path in TRIALSCOPE_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::Path;
use trialscope_ingestion::sources::clinicaltrials::CT_API_URL;
use trialscope_llm::backend::DEFAULT_HF_MODEL;
use trialscope_security::PasswordScheme;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub conditions: ConditionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_registry_url() -> String { CT_API_URL.to_string() }
fn default_timeout_secs() -> u64    { 30 }

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { base_url: default_registry_url(), timeout_secs: default_timeout_secs() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub password_scheme: PasswordScheme,
}

fn default_database_url() -> String { "sqlite://trialscope.db?mode=rwc".to_string() }

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self { database_url: default_database_url(), password_scheme: PasswordScheme::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LlmBackendKind {
    #[default]
    #[serde(rename = "huggingface")]
    HuggingFace,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub backend: LlmBackendKind,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Required for `openai_compatible`; optional override otherwise.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_max_context_rows")]
    pub max_context_rows: usize,
}

fn default_llm_model()        -> String { DEFAULT_HF_MODEL.to_string() }
fn default_temperature()      -> f32    { 0.5 }
fn default_max_new_tokens()   -> u32    { 512 }
fn default_max_context_rows() -> usize  { 50 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackendKind::default(),
            model: default_llm_model(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            max_new_tokens: default_max_new_tokens(),
            max_context_rows: default_max_context_rows(),
        }
    }
}

impl LlmConfig {
    /// Configured key, else TRIALSCOPE_LLM_API_KEY.
    pub fn effective_api_key(&self) -> Option<String> {
        pick_api_key(self.api_key.as_deref(), std::env::var("TRIALSCOPE_LLM_API_KEY").ok())
    }
}

fn pick_api_key(configured: Option<&str>, from_env: Option<String>) -> Option<String> {
    match configured {
        Some(key) if !key.trim().is_empty() => Some(key.to_string()),
        _ => from_env.filter(|k| !k.trim().is_empty()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_export_dir")]
    pub directory: String,
}

fn bool_true()          -> bool   { true }
fn default_export_dir() -> String { ".".to_string() }

impl Default for ExportConfig {
    fn default() -> Self {
        Self { enabled: bool_true(), directory: default_export_dir() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionsConfig {
    #[serde(default = "default_presets")]
    pub presets: Vec<String>,
}

fn default_presets() -> Vec<String> {
    [
        "Diabetes",
        "Asthma",
        "COVID-19",
        "Heart Disease",
        "Asthma in Children",
        "Breast Cancer",
        "Alzheimer's in Adults",
        "Asthma in Adults",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ConditionsConfig {
    fn default() -> Self {
        Self { presets: default_presets() }
    }
}


impl Config {
    /// Load configuration from trialscope.toml.
    /// Checks TRIALSCOPE_CONFIG env var first, then current directory.
    /// A missing file yields the built-in defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("TRIALSCOPE_CONFIG")
            .unwrap_or_else(|_| "trialscope.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        Ok(config)
    }
}
