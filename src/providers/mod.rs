//! Provider module
//!
//! Defines the completion backend trait and its implementations

pub mod openai;

use crate::models::openai::{OpenAIRequest, OpenAIResponse};
use anyhow::Result;
use async_trait::async_trait;

/// Completion backend used by conversation sessions
///
/// Authentication, retries and rate limiting are the backend's concern;
/// sessions treat `chat_complete` as an opaque remote call.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Send a chat completion request (non-streaming)
    async fn chat_complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse>;
}

pub use openai::{backend_from_settings, OpenAIProvider, RetryConfig, RetryingBackend};
