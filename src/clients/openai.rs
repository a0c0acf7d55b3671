use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{Completion, CompletionClient, CompletionError};
use crate::config::CompletionConfig;

/// Chat-completions client; the caller's own key is sent on every request
pub struct OpenAiClient {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: i64,
}

impl OpenAiClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, reqwest::Error> {
        // Slightly above the caller's deadline; `complete_bounded` is authoritative
        let client = reqwest::Client::builder()
            .timeout(config.timeout + std::time::Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
        })
    }
}

/// Maps an error status and body to a failure kind
pub fn classify_failure(status: StatusCode, body: &str) -> CompletionError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::InvalidCredential,
        StatusCode::TOO_MANY_REQUESTS if body.contains("insufficient_quota") => {
            CompletionError::QuotaExhausted
        }
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited,
        StatusCode::BAD_REQUEST if body.contains("context_length_exceeded") => {
            CompletionError::ContextTooLong
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => CompletionError::Timeout,
        _ => CompletionError::Unknown(format!("status {}", status.as_u16())),
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        credential: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Completion, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(credential)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Unknown(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let failure = classify_failure(status, &body);
            log::warn!("Completion request failed with status {}: {}", status, failure);
            return Err(failure);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Unknown(format!("invalid response: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CompletionError::Unknown("empty completion".to_string()))?;

        let units = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok(Completion { text, units })
    }
}
