use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

use super::{DeliveryError, Notifier, Publisher};
use crate::config::TelegramConfig;

/// Bot API client used both to publish to channels and to message users
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    bot_id: OnceCell<i64>,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct BotUser {
    id: i64,
}

#[derive(Deserialize)]
struct ChatMember {
    status: String,
}

/// Member statuses that allow posting to a channel
pub fn can_publish(status: &str) -> bool {
    matches!(status, "administrator" | "creator")
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            bot_id: OnceCell::new(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, DeliveryError> {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(DeliveryError::Api {
                description: response
                    .description
                    .unwrap_or_else(|| format!("{} failed", method)),
            }),
        }
    }

    async fn send_message(
        &self,
        chat: serde_json::Value,
        text: &str,
        html: bool,
    ) -> Result<(), DeliveryError> {
        let mut body = json!({
            "chat_id": chat,
            "text": text,
            "disable_web_page_preview": true,
        });
        if html {
            body["parse_mode"] = json!("HTML");
        }
        self.call::<serde_json::Value>("sendMessage", body).await?;
        Ok(())
    }

    async fn bot_id(&self) -> Result<i64, DeliveryError> {
        self.bot_id
            .get_or_try_init(|| async {
                let me: BotUser = self.call("getMe", json!({})).await?;
                Ok(me.id)
            })
            .await
            .copied()
    }
}

#[async_trait]
impl Publisher for TelegramClient {
    async fn publish(&self, destination: &str, content: &str) -> Result<(), DeliveryError> {
        self.send_message(json!(destination), content, true).await
    }

    async fn verify_capability(&self, destination: &str) -> Result<bool, DeliveryError> {
        let bot_id = self.bot_id().await?;
        let member: ChatMember = self
            .call(
                "getChatMember",
                json!({ "chat_id": destination, "user_id": bot_id }),
            )
            .await?;

        Ok(can_publish(&member.status))
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn notify(&self, user_id: i64, message: &str) -> Result<(), DeliveryError> {
        self.send_message(json!(user_id), message, false).await
    }
}
