//! Text-generation backends used to answer dataset questions.
//!
//! `HuggingFaceBackend` talks to the hosted Inference API. `OllamaBackend`
//! and `OpenAiCompatibleBackend` share the chat-completions wire format.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trialscope_common::{SandboxClient, TrialscopeError};

pub const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_HF_MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Client error: {0}")]
    Client(#[from] TrialscopeError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Query is empty")]
    EmptyQuery,
    #[error("Model returned an empty response")]
    EmptyResponse,
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    /// Short backend name for logs and audit entries.
    fn backend_name(&self) -> &str;
    fn is_local(&self) -> bool;
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

/// Text-generation responses come back as `[{"generated_text": …}]` or,
/// from some deployments, a bare object.
fn parse_hf_response(json: &serde_json::Value) -> String {
    let item = if json.is_array() { &json[0] } else { json };
    item["generated_text"].as_str().unwrap_or("").to_string()
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    if status >= 400 {
        let body: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .or_else(|| body["message"].as_str())
            .map(String::from)
            .unwrap_or(text);
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(serde_json::from_str(&text)?)
}

/// Flatten chat messages into one prompt for plain text-generation models.
fn flatten_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| m.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── 1. HuggingFace Inference ──────────────────────────────────────────────────

pub struct HuggingFaceBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<String>,
    client: SandboxClient,
}

impl HuggingFaceBackend {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            base_url: HF_INFERENCE_URL.to_string(),
            model: model.into(),
            api_key,
            client: SandboxClient::new()?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.client.allow_url_host(&self.base_url);
        self
    }
}

#[async_trait]
impl LlmBackend for HuggingFaceBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/models/{}", self.base_url.trim_end_matches('/'), self.model);
        let body = serde_json::json!({
            "inputs": flatten_messages(&req.messages),
            "parameters": {
                "temperature":      req.temperature.unwrap_or(0.5),
                "max_new_tokens":   req.max_tokens.unwrap_or(512),
                "return_full_text": false,
            }
        });
        let mut builder = self.client.post(&url)?;
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.json(&body).send().await?;
        let json = check_response_status(resp).await.map_err(|e| match e {
            // Cold models answer 503 until loaded
            LlmError::ApiError { status: 503, message } => LlmError::Unavailable(message),
            other => other,
        })?;
        Ok(LlmResponse {
            content: parse_hf_response(&json),
            model: self.model.clone(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &str { "huggingface" }
    fn is_local(&self) -> bool { false }
}

// ── 2. Chat-completions endpoints ─────────────────────────────────────────────

/// POST `req` to `{base_url}/v1/chat/completions`.
async fn chat_completion(
    client: &SandboxClient,
    base_url: &str,
    model: &str,
    api_key: Option<&str>,
    req: LlmRequest,
) -> Result<LlmResponse, LlmError> {
    let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
    let body = serde_json::json!({
        "model":       model,
        "messages":    req.messages,
        "max_tokens":  req.max_tokens.unwrap_or(512),
        "temperature": req.temperature.unwrap_or(0.5),
    });
    let mut builder = client.post(&url)?;
    if let Some(key) = api_key {
        builder = builder.bearer_auth(key);
    }
    let json = check_response_status(builder.json(&body).send().await?).await?;
    Ok(parse_openai_response(&json, model))
}

fn sandbox_for(base_url: &str) -> Result<SandboxClient, LlmError> {
    let mut client = SandboxClient::new()?;
    client.allow_url_host(base_url);
    Ok(client)
}

/// Local Ollama server.
pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    client: SandboxClient,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let base_url = base_url.into();
        let client = sandbox_for(&base_url)?;
        Ok(Self { base_url, model: model.into(), client })
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        chat_completion(&self.client, &self.base_url, &self.model, None, req).await
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &str { "ollama" }
    fn is_local(&self) -> bool { true }
}

/// Any OpenAI-compatible server (LMStudio, vLLM, Groq, OpenRouter, …).
pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<String>,
    client: SandboxClient,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.into();
        let client = sandbox_for(&base_url)?;
        Ok(Self { base_url, model: model.into(), api_key, client })
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        chat_completion(&self.client, &self.base_url, &self.model, self.api_key.as_deref(), req).await
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &str { "openai_compatible" }
    fn is_local(&self) -> bool { false }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
