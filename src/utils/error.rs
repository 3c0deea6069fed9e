//! Error handling module
//!
//! Defines session and HTTP error types used in the project

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Conversation session errors
///
/// A model refusal is not an error; it is reported through `Outcome::Refused`.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Network, non-2xx or decoding failure from the completion backend
    #[error("Completion backend error: {0}")]
    Backend(#[source] anyhow::Error),

    /// Backend call exceeded the configured timeout
    #[error("Completion backend timed out after {0:?}")]
    Timeout(Duration),

    /// Submission cancelled by the caller
    #[error("Submission cancelled")]
    Cancelled,

    /// Model requested a tool that was never declared
    #[error("Unknown tool requested: {0}")]
    UnknownTool(String),

    /// Tool arguments failed to parse or validate
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidToolArguments { tool: String, message: String },

    /// Model kept requesting tools past the configured bound
    #[error("Tool loop exceeded {0} rounds")]
    ToolLoopExceeded(u32),

    /// Model identifier not present in the catalog
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Another submission is in flight on this session
    #[error("Session is busy with another submission")]
    SessionBusy,

    /// Empty user input
    #[error("User input cannot be empty")]
    EmptyInput,

    /// Structured response did not match the requested type
    #[error("Failed to decode structured response: {0}")]
    StructuredDecode(String),

    /// Tool declaration rejected at registration
    #[error("Invalid tool declaration '{tool}': {message}")]
    InvalidToolDeclaration { tool: String, message: String },
}

impl SessionError {
    pub(crate) fn invalid_arguments(tool: &str, message: impl Into<String>) -> Self {
        SessionError::InvalidToolArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_declaration(tool: &str, message: impl Into<String>) -> Self {
        SessionError::InvalidToolDeclaration {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// Whether the caller may simply retry the same submission
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Backend(_) | SessionError::Timeout(_) | SessionError::SessionBusy
        )
    }
}

/// Session result type alias
pub type SessionResult<T> = Result<T, SessionError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Request validation failed
    #[error("Request validation failed: {0}")]
    Validation(String),

    /// Upload storage failure
    #[error("Upload storage error: {0}")]
    Storage(String),

    /// Template rendering failure
    #[error("Rendering failed: {0}")]
    Render(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Payload too large
    #[error("Payload too large")]
    PayloadTooLarge,
}

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message
    pub message: String,
}

impl AppError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Session(err) => match err {
                SessionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                SessionError::SessionBusy => StatusCode::TOO_MANY_REQUESTS,
                SessionError::EmptyInput => StatusCode::BAD_REQUEST,
                SessionError::Backend(_)
                | SessionError::UnknownTool(_)
                | SessionError::InvalidToolArguments { .. }
                | SessionError::ToolLoopExceeded(_)
                | SessionError::StructuredDecode(_) => StatusCode::BAD_GATEWAY,
                SessionError::Cancelled
                | SessionError::UnknownModel(_)
                | SessionError::InvalidToolDeclaration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Config(_)
            | AppError::Storage(_)
            | AppError::Render(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::PayloadTooLarge => "invalid_request_error",
            AppError::Session(SessionError::Timeout(_)) => "timeout_error",
            AppError::Session(SessionError::SessionBusy) => "busy_error",
            AppError::Session(_) => "api_error",
            AppError::Storage(_) => "storage_error",
            AppError::Config(_) | AppError::Render(_) | AppError::Internal(_) => "internal_error",
        }
    }

    /// Whether detailed error information should be logged
    pub fn should_log_details(&self) -> bool {
        !matches!(self, AppError::Validation(_) | AppError::PayloadTooLarge)
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error_type: self.error_type().to_string(),
            message: self.to_string(),
        }
    }
}

/// Implement IntoResponse trait to allow errors to be returned directly as HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.should_log_details() {
            tracing::error!("Application error: {} - Status code: {}", self, status);
        } else {
            tracing::warn!("Client error: {} - Status code: {}", self.error_type(), status);
        }

        (status, Json(self.to_error_response())).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Error context extension trait
pub trait ErrorContext<T> {
    /// Add validation error context
    fn validation_context(self, message: &str) -> AppResult<T>;

    /// Add storage error context
    fn storage_context(self, message: &str) -> AppResult<T>;

    /// Add internal error context
    fn internal_context(self, message: &str) -> AppResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn validation_context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Validation(format!("{}: {}", message, e)))
    }

    fn storage_context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Storage(format!("{}: {}", message, e)))
    }

    fn internal_context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Internal(format!("{}: {}", message, e)))
    }
}
