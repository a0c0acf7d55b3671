//! Unit tests for completion failure classification and messaging

use reqwest::StatusCode;
use rstest::rstest;
use std::collections::HashSet;
use tierbot::clients::openai::classify_failure;
use tierbot::clients::CompletionError;

#[rstest]
#[case(StatusCode::UNAUTHORIZED, "", CompletionError::InvalidCredential)]
#[case(StatusCode::FORBIDDEN, "", CompletionError::InvalidCredential)]
#[case(
    StatusCode::TOO_MANY_REQUESTS,
    r#"{"error":{"type":"insufficient_quota"}}"#,
    CompletionError::QuotaExhausted
)]
#[case(
    StatusCode::TOO_MANY_REQUESTS,
    r#"{"error":{"type":"requests"}}"#,
    CompletionError::RateLimited
)]
#[case(
    StatusCode::BAD_REQUEST,
    r#"{"error":{"code":"context_length_exceeded"}}"#,
    CompletionError::ContextTooLong
)]
#[case(StatusCode::GATEWAY_TIMEOUT, "", CompletionError::Timeout)]
fn test_classify_failure(
    #[case] status: StatusCode,
    #[case] body: &str,
    #[case] expected: CompletionError,
) {
    assert_eq!(classify_failure(status, body), expected);
}

#[test]
fn test_each_failure_has_its_own_message() {
    let all = [
        CompletionError::InvalidCredential,
        CompletionError::QuotaExhausted,
        CompletionError::RateLimited,
        CompletionError::ContextTooLong,
        CompletionError::Timeout,
        CompletionError::Unknown("boom".to_string()),
    ];

    let messages: HashSet<&str> = all.iter().map(|e| e.user_message()).collect();
    assert_eq!(messages.len(), all.len());

    // Internal detail never reaches the user
    assert!(!CompletionError::Unknown("secret body".to_string())
        .user_message()
        .contains("secret"));
}
