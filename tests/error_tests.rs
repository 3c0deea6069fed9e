//! Error handling tests

use aichat::utils::error::{AppError, ErrorContext, ErrorResponse};
use aichat::SessionError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::error::Error;
use std::time::Duration;

#[test]
fn test_app_error_status_codes() {
    let cases = [
        (AppError::Validation("bad form".into()), StatusCode::BAD_REQUEST),
        (AppError::PayloadTooLarge, StatusCode::PAYLOAD_TOO_LARGE),
        (AppError::Storage("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (AppError::Render("template".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (SessionError::EmptyInput.into(), StatusCode::BAD_REQUEST),
        (SessionError::Timeout(Duration::from_secs(30)).into(), StatusCode::GATEWAY_TIMEOUT),
        (SessionError::SessionBusy.into(), StatusCode::TOO_MANY_REQUESTS),
        (SessionError::UnknownTool("x".into()).into(), StatusCode::BAD_GATEWAY),
        (SessionError::StructuredDecode("eof".into()).into(), StatusCode::BAD_GATEWAY),
        (SessionError::UnknownModel("gpt-x".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, status) in cases {
        assert_eq!(error.status_code(), status, "{}", error);
    }
}

#[test]
fn test_app_error_types() {
    assert_eq!(AppError::Validation("x".into()).error_type(), "invalid_request_error");
    assert_eq!(AppError::from(SessionError::Timeout(Duration::from_secs(1))).error_type(), "timeout_error");
    assert_eq!(AppError::from(SessionError::SessionBusy).error_type(), "busy_error");
    assert_eq!(AppError::from(SessionError::Cancelled).error_type(), "api_error");
    assert_eq!(AppError::Storage("x".into()).error_type(), "storage_error");
    assert_eq!(AppError::Internal("x".into()).error_type(), "internal_error");
}

#[test]
fn test_should_log_details() {
    assert!(!AppError::Validation("x".into()).should_log_details());
    assert!(!AppError::PayloadTooLarge.should_log_details());
    assert!(AppError::Internal("x".into()).should_log_details());
    assert!(AppError::from(SessionError::ToolLoopExceeded(8)).should_log_details());
}

#[test]
fn test_session_error_display() {
    assert_eq!(SessionError::UnknownTool("book_flight".into()).to_string(), "Unknown tool requested: book_flight");
    assert_eq!(SessionError::ToolLoopExceeded(8).to_string(), "Tool loop exceeded 8 rounds");
    assert_eq!(
        SessionError::Timeout(Duration::from_secs(30)).to_string(),
        "Completion backend timed out after 30s"
    );
    assert_eq!(
        SessionError::Timeout(Duration::from_millis(50)).to_string(),
        "Completion backend timed out after 50ms"
    );
    assert_eq!(SessionError::SessionBusy.to_string(), "Session is busy with another submission");
    // transparent wrapping keeps the session message
    assert_eq!(AppError::from(SessionError::Cancelled).to_string(), "Submission cancelled");
}

#[test]
fn test_backend_error_keeps_source() {
    let err = SessionError::Backend(anyhow::anyhow!("connection refused"));
    assert_eq!(err.to_string(), "Completion backend error: connection refused");
    assert_eq!(err.source().unwrap().to_string(), "connection refused");
    assert!(err.is_retryable());
}

#[test]
fn test_error_context_trait() {
    let io: Result<(), std::io::Error> = Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
    match io.storage_context("Failed to save upload") {
        Err(AppError::Storage(message)) => assert_eq!(message, "Failed to save upload: denied"),
        other => panic!("unexpected {:?}", other),
    }

    let parse: Result<u32, std::num::ParseIntError> = "x".parse();
    assert!(matches!(parse.validation_context("Bad number"), Err(AppError::Validation(_))));

    let ok: Result<u32, String> = Ok(7);
    assert_eq!(ok.internal_context("unused").unwrap(), 7);
}

#[tokio::test]
async fn test_error_response_body() {
    let response = AppError::from(SessionError::SessionBusy).into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body.error_type, "busy_error");
    assert_eq!(body.message, "Session is busy with another submission");
}
