use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const FIRST_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    /// Extra attempts after a transport error or a 408/429/5xx reply.
    pub max_retries: u32,
}

impl LLMConfig {
    pub fn from_env() -> Self {
        let endpoint = read_env("LLM_API_ENDPOINT")
            .or_else(|| read_env("LLM_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        Self {
            api_key: read_env("LLM_API_KEY"),
            model: read_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_endpoint: with_version_suffix(&endpoint),
            timeout: Duration::from_millis(read_env_num("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS)),
            max_tokens: read_env_num("LLM_MAX_TOKENS").unwrap_or(DEFAULT_MAX_TOKENS),
            max_retries: read_env_num("LLM_MAX_RETRIES").unwrap_or(0),
        }
    }

    fn key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM not configured: {0} missing")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

impl LLMError {
    fn is_transient(&self) -> bool {
        match self {
            LLMError::Request(_) => true,
            LLMError::HttpStatus { status, .. } => is_retryable(*status),
            _ => false,
        }
    }
}

/// Chat-completions client for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct LLMProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMProvider {
    pub fn new(config: LLMConfig) -> Self {
        let client = match reqwest::Client::builder().timeout(config.timeout).build() {
            Ok(client) => client,
            Err(err) => {
                warn!(error = %err, "falling back to default HTTP client");
                reqwest::Client::new()
            }
        };
        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(LLMConfig::from_env())
    }

    pub fn is_available(&self) -> bool {
        self.config.key().is_some() && !self.config.model.trim().is_empty()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sends a system + user exchange and returns the first completion.
    pub async fn complete_with_system(&self, system: &str, user: &str) -> Result<String, LLMError> {
        let messages = [Message::new(Role::System, system), Message::new(Role::User, user)];
        let response = self.complete(&messages).await?;

        if let Some(tokens) = response.usage.and_then(|u| u.total_tokens) {
            debug!(tokens, model = %self.config.model, "completion received");
        }

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(LLMError::EmptyChoices)
    }

    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse, LLMError> {
        let key = self.config.key().ok_or(LLMError::NotConfigured("LLM_API_KEY"))?;
        let url = format!("{}/chat/completions", self.config.api_endpoint);
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let mut attempt = 0;
        let mut backoff = FIRST_BACKOFF;
        loop {
            match self.send_once(&url, key, &request).await {
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %err, backoff_ms = backoff.as_millis() as u64, "LLM call failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                result => return result,
            }
        }
    }

    async fn send_once(
        &self,
        url: &str,
        key: &str,
        request: &CompletionRequest<'_>,
    ) -> Result<CompletionResponse, LLMError> {
        let response = self.client.post(url).bearer_auth(key).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LLMError::HttpStatus { status, body });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| {
            warn!(error = %err, body = %String::from_utf8_lossy(&bytes), "unreadable completion body");
            LLMError::Json(err)
        })
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_env_num<T: std::str::FromStr>(key: &str) -> Option<T> {
    read_env(key)?.parse().ok()
}

fn with_version_suffix(endpoint: &str) -> String {
    let base = endpoint.trim().trim_end_matches('/');
    if base.ends_with("/v1") || base.contains("/v1/") {
        base.to_string()
    } else {
        format!("{base}/v1")
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(status, StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT)
        || status.is_server_error()
}
