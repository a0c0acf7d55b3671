//! Unit tests for Bot API delivery failures
//!
//! Transport errors must never carry the bot token, which the Bot API puts
//! in the request path.

use chrono::Utc;
use tierbot::clients::{DeliveryError, Notifier, Publisher, TelegramClient};
use tierbot::config::TelegramConfig;
use tierbot::models::Channel;
use tierbot::scheduler::PublishFailure;

const BOT_TOKEN: &str = "123456:SECRET_BOT_TOKEN";

/// Nothing listens on port 1, so every call fails at the transport
fn unreachable_client() -> TelegramClient {
    TelegramClient::new(&TelegramConfig {
        bot_token: BOT_TOKEN.to_string(),
        api_url: "http://127.0.0.1:1".to_string(),
    })
    .unwrap()
}

fn channel() -> Channel {
    let now = Utc::now();
    Channel {
        id: 1,
        owner_id: 42,
        destination: "@rust_daily".to_string(),
        title: None,
        prompt: "Rust tips".to_string(),
        schedule_time: "09:00".to_string(),
        posts_per_batch: 1,
        is_active: true,
        last_post_at: None,
        total_posts: 0,
        created_at: now,
        updated_at: now,
    }
}

fn assert_no_token(text: &str) {
    assert!(!text.contains("SECRET_BOT_TOKEN"), "bot token in: {}", text);
}

#[actix_web::test]
async fn test_publish_error_hides_bot_token() {
    let err = unreachable_client().publish("@rust_daily", "hello").await.unwrap_err();

    assert!(matches!(err, DeliveryError::Http(_)));
    assert_no_token(&err.to_string());
    assert_no_token(&format!("{:?}", err));
    assert_eq!(err.public_reason(), "the Bot API could not be reached");

    let failure = PublishFailure::Publish(err);
    assert_no_token(&failure.to_string());

    let message = failure.owner_message(&channel());
    assert_no_token(&message);
    assert!(message.contains("could not be reached"));
}

#[actix_web::test]
async fn test_capability_and_notify_errors_hide_bot_token() {
    let client = unreachable_client();

    let err = client.verify_capability("@rust_daily").await.unwrap_err();
    assert_no_token(&err.to_string());

    let failure = PublishFailure::CapabilityCheck(err);
    assert_no_token(&failure.to_string());
    assert_no_token(&failure.owner_message(&channel()));

    let err = client.notify(42, "hi").await.unwrap_err();
    assert_no_token(&err.to_string());
}

#[test]
fn test_api_description_is_shown_as_is() {
    let err = DeliveryError::Api {
        description: "Bad Request: chat not found".to_string(),
    };
    assert_eq!(err.public_reason(), "Bad Request: chat not found");
}
