//! Logging utilities
//!
//! Shared logging configuration and helper functions

use crate::config::settings::LoggingConfig;
use crate::models::openai::{OpenAIContent, OpenAIMessage, OpenAIRequest};

/// Set to true to include full request details (tools, system prompts, images) in debug logs
/// Default is false to reduce log verbosity
pub const VERBOSE_REQUEST_LOGGING: bool = false;

/// Truncate a string with a note about original length
fn truncate_content(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let head: String = s.chars().take(max_len).collect();
        format!("{}... ({} chars truncated)", head, s.chars().count() - max_len)
    } else {
        s.to_string()
    }
}

/// Create a filtered version of OpenAI message for logging
fn filter_openai_message(msg: &OpenAIMessage) -> serde_json::Value {
    let content = match &msg.content {
        Some(OpenAIContent::Text(t)) => {
            let max_len = if msg.role == "system" { 100 } else { 200 };
            serde_json::Value::String(truncate_content(t, max_len))
        }
        Some(array @ OpenAIContent::Array(parts)) => {
            let images = if array.has_images() { " incl. images" } else { "" };
            serde_json::json!(format!("[...{} content blocks{}]", parts.len(), images))
        }
        None => serde_json::Value::Null,
    };

    let mut obj = serde_json::json!({
        "role": msg.role,
        "content": content,
    });

    if let Some(tool_calls) = &msg.tool_calls {
        let names: Vec<&str> = tool_calls.iter().map(|c| c.function.name.as_str()).collect();
        obj["tool_calls"] = serde_json::json!(names);
    }
    if let Some(tool_call_id) = &msg.tool_call_id {
        obj["tool_call_id"] = serde_json::json!(tool_call_id);
    }

    obj
}

/// Create a filtered summary of OpenAI request for logging
/// Keeps original structure but truncates verbose content
pub fn create_request_log_summary(request: &OpenAIRequest) -> serde_json::Value {
    if VERBOSE_REQUEST_LOGGING {
        serde_json::to_value(request).unwrap_or(serde_json::json!({"error": "serialize failed"}))
    } else {
        let filtered_messages: Vec<serde_json::Value> =
            request.messages.iter().map(filter_openai_message).collect();

        let tools = match &request.tools {
            Some(t) if !t.is_empty() => {
                let names: Vec<&str> = t.iter().map(|tool| tool.function.name.as_str()).collect();
                serde_json::json!(names)
            }
            _ => serde_json::Value::Null,
        };

        let response_format = request
            .response_format
            .as_ref()
            .map(|format| serde_json::json!(format.format_type))
            .unwrap_or(serde_json::Value::Null);

        serde_json::json!({
            "model": request.model,
            "messages": filtered_messages,
            "tools": tools,
            "response_format": response_format,
        })
    }
}

/// Initialize the global tracing subscriber
pub fn init_logging(config: &LoggingConfig) {
    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if config.format == "json" {
        // JSON format logs (production environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(config.level.as_str())
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr)
                .finish(),
        )
    } else {
        // Human readable format (development environment)
        Box::new(
            tracing_subscriber::fmt()
                .with_env_filter(config.level.as_str())
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .finish(),
        )
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Tracing subscriber already initialized");
    }
}
