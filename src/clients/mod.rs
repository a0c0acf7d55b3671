//! Outbound collaborators behind traits.
//!
//! The completion service, the publisher and the notifier are external
//! systems; every component receives them as `Arc<dyn Trait>` handles so
//! tests can substitute doubles.

pub mod openai;
pub mod telegram;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppResult;

pub use openai::OpenAiClient;
pub use telegram::TelegramClient;

// =============================================================================
// Completion
// =============================================================================

/// Generated text and what it consumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub units: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("invalid credential")]
    InvalidCredential,

    #[error("credential quota exhausted")]
    QuotaExhausted,

    #[error("rate limited by completion service")]
    RateLimited,

    #[error("input exceeds context length")]
    ContextTooLong,

    #[error("completion timed out")]
    Timeout,

    #[error("completion failed: {0}")]
    Unknown(String),
}

impl CompletionError {
    /// Explanation shown to the user or channel owner
    pub fn user_message(&self) -> &'static str {
        match self {
            CompletionError::InvalidCredential => {
                "Your API key is invalid or has been revoked. Set a new key and try again."
            }
            CompletionError::QuotaExhausted => {
                "Your API key has run out of credit. Top up your account or set another key."
            }
            CompletionError::RateLimited => {
                "The AI service is receiving too many requests right now. Please try again shortly."
            }
            CompletionError::ContextTooLong => {
                "The request is too long for the model. Please shorten it."
            }
            CompletionError::Timeout => "The AI service took too long to answer. Please try again.",
            CompletionError::Unknown(_) => {
                "The AI service returned an unexpected error. Please try again later."
            }
        }
    }

    /// Only transient upstream conditions are worth retrying without owner action
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompletionError::RateLimited | CompletionError::Timeout)
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        credential: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Completion, CompletionError>;
}

/// Runs a completion under a hard deadline. An elapsed deadline is a
/// `Timeout` and the abandoned call is never charged.
pub async fn complete_bounded(
    client: &dyn CompletionClient,
    timeout: Duration,
    credential: &str,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<Completion, CompletionError> {
    let call = client.complete(credential, system_prompt, user_prompt);
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CompletionError::Timeout),
    }
}

// =============================================================================
// Delivery (publisher + notifier)
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Transport failure. Converted without its URL: the Bot API carries the
    /// bot token in the request path.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("API error: {description}")]
    Api { description: String },
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        DeliveryError::Http(e.without_url())
    }
}

impl DeliveryError {
    /// Reason safe to show a channel owner or an API caller
    pub fn public_reason(&self) -> String {
        match self {
            DeliveryError::Http(e) if e.is_timeout() => "the Bot API timed out".to_string(),
            DeliveryError::Http(_) => "the Bot API could not be reached".to_string(),
            DeliveryError::Api { description } => description.clone(),
        }
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Posts HTML-formatted content to a destination
    async fn publish(&self, destination: &str, content: &str) -> Result<(), DeliveryError>;

    /// Whether the bot may currently post to `destination`
    async fn verify_capability(&self, destination: &str) -> Result<bool, DeliveryError>;
}

/// Best-effort private messages to users; callers log failures
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, message: &str) -> Result<(), DeliveryError>;
}

// =============================================================================
// Credentials
// =============================================================================

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The user's single active completion-service key, if any
    async fn active_credential(&self, user_id: i64) -> AppResult<Option<String>>;
}
