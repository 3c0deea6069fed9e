//! OpenAI backend tests against a mock HTTP server

use aichat::models::openai::OpenAIRequest;
use aichat::providers::{OpenAIProvider, RetryConfig, RetryingBackend};
use aichat::{CompletionBackend, ConversationSession, SessionError};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-abc123",
        "object": "chat.completion",
        "created": 1_726_000_000,
        "model": "gpt-4o-mini-2024-07-18",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content, "refusal": null},
            "logprobs": null,
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 1000, "completion_tokens": 200, "total_tokens": 1200},
        "system_fingerprint": "fp_123"
    })
}

fn provider(server: &MockServer) -> OpenAIProvider {
    OpenAIProvider::with_timeout(&server.url("/v1"), "sk-test-key", 5).unwrap()
}

#[tokio::test]
async fn test_chat_complete_success() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("Authorization", "Bearer sk-test-key")
                .json_body_partial(r#"{"model": "gpt-4o-mini"}"#);
            then.status(200).json_body(completion_body("Recursion calls\nitself again and again\nuntil the base case"));
        })
        .await;

    let response = provider(&server).chat_complete(OpenAIRequest::default()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.choices.len(), 1);
    assert_eq!(response.usage.unwrap().total_tokens, 1200);
    assert!(response
        .first_message()
        .and_then(|m| m.content.as_ref())
        .unwrap()
        .extract_text()
        .starts_with("Recursion"));
}

#[tokio::test]
async fn test_api_error_message_is_surfaced() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).json_body(json!({
                "error": {
                    "message": "Incorrect API key provided.",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": "invalid_api_key"
                }
            }));
        })
        .await;

    let err = provider(&server).chat_complete(OpenAIRequest::default()).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("401"));
    assert!(message.contains("Incorrect API key provided."));
}

#[tokio::test]
async fn test_unparseable_error_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(502).body("Bad Gateway");
        })
        .await;

    let err = provider(&server).chat_complete(OpenAIRequest::default()).await.unwrap_err();
    assert!(err.to_string().contains("Bad Gateway"));
}

#[tokio::test]
async fn test_retrying_backend_retries_server_errors() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).json_body(json!({"error": {"message": "The server had an error"}}));
        })
        .await;

    let backend = RetryingBackend::new(
        Arc::new(provider(&server)),
        Some(RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }),
    );

    assert!(backend.chat_complete(OpenAIRequest::default()).await.is_err());
    mock.assert_hits_async(3).await;
    assert_eq!(backend.name(), "openai");
}

#[tokio::test]
async fn test_session_over_http_backend() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("You are a helpful assistant.")
                .body_contains("Write a haiku about recursion in programming.");
            then.status(200).json_body(completion_body("A function returns\nto itself"));
        })
        .await;

    let session = ConversationSession::builder(Arc::new(provider(&server)), "gpt-4o-mini")
        .system_prompt("You are a helpful assistant.")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let reply = session.submit("Write a haiku about recursion in programming.").await.unwrap();
    mock.assert_async().await;
    assert_eq!(reply.text(), "A function returns\nto itself");

    let summary = session.usage_summary().unwrap();
    assert_eq!(summary.total_tokens, 1200);
    assert_eq!(summary.formatted_cost(), "$0.00027000");
}

#[tokio::test]
async fn test_session_maps_http_failure_to_backend_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).json_body(json!({"error": {"message": "Rate limit reached"}}));
        })
        .await;

    let session = ConversationSession::builder(Arc::new(provider(&server)), "gpt-4o-mini")
        .system_prompt("You are a helpful assistant.")
        .build()
        .unwrap();

    let err = session.submit("Hello").await.unwrap_err();
    assert!(matches!(err, SessionError::Backend(_)));
    assert_eq!(session.transcript_len(), 1);
}
