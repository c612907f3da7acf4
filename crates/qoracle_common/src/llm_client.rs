//! LLM Client - the external reasoning service behind the `llm` backend.
//!
//! The service is asked for a JSON reading; this module only moves JSON in and
//! out. Contract checks on the reading live in `reading`.
//! Supports Ollama and OpenAI-compatible endpoints, plus a fake for tests.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Environment variable consulted when `api_key` is not set in the config
pub const API_KEY_ENV: &str = "QORACLE_LLM_API_KEY";

/// `[backend.llm]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Off means every call fails with `LlmError::Disabled`
    pub enabled: bool,
    /// Base URL; Ollama is detected by port or host name
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Whole-request timeout
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5:3b-instruct".to_string(),
            api_key: None,
            timeout_secs: 20,
        }
    }
}

impl LlmConfig {
    /// Config key first, then $QORACLE_LLM_API_KEY
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("the llm backend is switched off ([backend.llm] enabled = false)")]
    Disabled,

    #[error("transport: {0}")]
    Http(String),

    #[error("reply is not a JSON object: {0}")]
    MalformedReply(String),

    #[error("no reply within {0}s")]
    Timeout(u64),

    #[error("the model said nothing")]
    EmptyReply,
}

/// Anything that answers a prompt with one JSON object
pub trait LlmClient: Send + Sync {
    fn call_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema_description: &str,
    ) -> Result<serde_json::Value, LlmError>;
}

/// Blocking HTTP client: Ollama first when the endpoint looks like one,
/// then the OpenAI-style chat completions route
pub struct HttpLlmClient {
    config: LlmConfig,
    client: reqwest::blocking::Client,
}

impl HttpLlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map(|client| Self { config, client })
            .map_err(|e| LlmError::Http(format!("client setup: {}", e)))
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), route)
    }

    /// Local Ollama daemons listen on 11434
    fn looks_like_ollama(&self) -> bool {
        let endpoint = &self.config.endpoint;
        endpoint.contains("11434") || endpoint.contains("ollama")
    }

    /// POST a body and hand back the decoded JSON envelope
    fn post(&self, route: &str, body: &serde_json::Value, service: &str) -> Result<serde_json::Value, LlmError> {
        let mut request = self.client.post(self.url(route)).json(body);
        if let Some(key) = self.config.resolved_api_key() {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.config.timeout_secs)
            } else {
                LlmError::Http(format!("{} unreachable: {}", service, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Http(format!("{} answered {}", service, status)));
        }

        response
            .json()
            .map_err(|e| LlmError::MalformedReply(format!("{} envelope: {}", service, e)))
    }

    /// Ollama `/api/generate`; the reading sits in `response`
    fn ask_ollama(&self, prompt: &str) -> Result<serde_json::Value, LlmError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
        });
        let envelope = self.post("/api/generate", &body, "Ollama")?;
        let text = envelope["response"].as_str().ok_or(LlmError::EmptyReply)?;
        parse_model_output(text)
    }

    /// OpenAI-style `/v1/chat/completions`; the reading sits in the first choice
    fn ask_chat_completions(&self, system_prompt: &str, user_prompt: &str) -> Result<serde_json::Value, LlmError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "json_object"},
        });
        let envelope = self.post("/v1/chat/completions", &body, "chat completions")?;
        let text = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LlmError::EmptyReply)?;
        parse_model_output(text)
    }
}

impl LlmClient for HttpLlmClient {
    fn call_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema_description: &str,
    ) -> Result<serde_json::Value, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }

        let full_prompt = format!(
            "{}\n\nUser offering: {}\n\nYou must respond with valid JSON matching this schema:\n{}",
            system_prompt, user_prompt, schema_description
        );

        if self.looks_like_ollama() {
            match self.ask_ollama(&full_prompt) {
                Ok(reading) => return Ok(reading),
                Err(e) => debug!(error = %e, "ollama route failed, trying chat completions"),
            }
        }

        self.ask_chat_completions(system_prompt, &full_prompt)
    }
}

/// Models sometimes wrap JSON in a ```json fence; strip it before parsing.
pub fn parse_model_output(text: &str) -> Result<serde_json::Value, LlmError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyReply);
    }

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced)
        .map_err(|e| LlmError::MalformedReply(e.to_string()))
}

/// Scripted client for tests
pub struct FakeLlmClient {
    responses: Mutex<Vec<Result<serde_json::Value, LlmError>>>,
    call_count: Mutex<usize>,
    last_user_prompt: Mutex<Option<String>>,
}

impl FakeLlmClient {
    /// Responses are returned in order; the last one repeats
    pub fn new(responses: Vec<Result<serde_json::Value, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            last_user_prompt: Mutex::new(None),
        }
    }

    pub fn always_valid(reply: serde_json::Value) -> Self {
        Self::new(vec![Ok(reply)])
    }

    pub fn always_error(error: LlmError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.call_count.lock().map(|c| *c).unwrap_or(0)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.last_user_prompt.lock().ok().and_then(|p| p.clone())
    }
}

impl LlmClient for FakeLlmClient {
    fn call_json(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _schema_description: &str,
    ) -> Result<serde_json::Value, LlmError> {
        if let Ok(mut count) = self.call_count.lock() {
            *count += 1;
        }
        if let Ok(mut last) = self.last_user_prompt.lock() {
            *last = Some(user_prompt.to_string());
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| LlmError::Http("fake client poisoned".to_string()))?;

        match responses.len() {
            0 => Err(LlmError::EmptyReply),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}
