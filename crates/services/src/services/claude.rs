//! Anthropic Messages API client backing the chat assistant and the AI
//! reviewer.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone, Error)]
pub enum ClaudeError {
    #[error("missing api key: ANTHROPIC_API_KEY is not set")]
    MissingApiKey,
    #[error("network error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ClaudeError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// One message of the conversation sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone)]
pub struct ClaudeClient {
    http: Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    /// Build a client from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, ClaudeError> {
        let api_key =
            std::env::var("ANTHROPIC_API_KEY").map_err(|_| ClaudeError::MissingApiKey)?;
        Self::new(api_key, None)
    }

    pub fn new(api_key: String, model: Option<String>) -> Result<Self, ClaudeError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("survey-studio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClaudeError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    /// Send the conversation and return the model's text reply. Transient
    /// failures are retried with exponential backoff.
    pub async fn complete(
        &self,
        system: Option<&str>,
        turns: &[ChatTurn],
    ) -> Result<String, ClaudeError> {
        (|| async { self.send(system, turns).await })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(20))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(ClaudeError::is_transient)
            .notify(|err, delay| {
                warn!(
                    "claude request failed, retrying in {:.1}s: {}",
                    delay.as_secs_f64(),
                    err
                );
            })
            .await
    }

    /// Like [`complete`](Self::complete), but parse the reply as JSON after
    /// stripping any markdown code fence around it.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system: Option<&str>,
        turns: &[ChatTurn],
    ) -> Result<T, ClaudeError> {
        let text = self.complete(system, turns).await?;
        let payload = strip_code_fence(&text);
        if payload.is_empty() {
            return Err(ClaudeError::Malformed("empty reply".to_string()));
        }
        serde_json::from_str(payload).map_err(|e| {
            ClaudeError::Malformed(format!(
                "{e} (reply preview: {})",
                payload.chars().take(200).collect::<String>()
            ))
        })
    }

    async fn send(&self, system: Option<&str>, turns: &[ChatTurn]) -> Result<String, ClaudeError> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": turns,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }

        let res = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClaudeError::Timeout
                } else {
                    ClaudeError::Transport(e.to_string())
                }
            })?;

        match res.status() {
            s if s.is_success() => {
                let parsed: MessagesResponse = res
                    .json()
                    .await
                    .map_err(|e| ClaudeError::Malformed(e.to_string()))?;
                parsed
                    .content
                    .into_iter()
                    .find_map(|block| match block {
                        ResponseBlock::Text { text } => Some(text),
                        ResponseBlock::Other => None,
                    })
                    .ok_or_else(|| ClaudeError::Malformed("no text block in reply".to_string()))
            }
            StatusCode::UNAUTHORIZED => Err(ClaudeError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(ClaudeError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(ClaudeError::Http { status, body })
            }
        }
    }
}

/// Pull the payload out of a markdown code fence, if the reply is wrapped in
/// one; otherwise return the trimmed reply unchanged.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    // Skip a language tag on the fence line.
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => trimmed,
    }
}
