//! OpenAI API data models
//!
//! Defines OpenAI chat completions request and response structures

use serde::{Deserialize, Serialize};

/// OpenAI API request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIRequest {
    /// Model name
    pub model: String,
    /// Message list
    pub messages: Vec<OpenAIMessage>,
    /// Maximum tokens to generate (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Temperature parameter (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Response format (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<OpenAIResponseFormat>,
    /// Tools (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAITool>>,
    /// Tool choice (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
}

/// OpenAI message structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role (system/user/assistant/tool)
    pub role: String,
    /// Message content
    #[serde(default)]
    pub content: Option<OpenAIContent>,
    /// Refusal text returned instead of content (responses only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
    /// Tool calls (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAIToolCall>>,
    /// Tool call ID (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// OpenAI message content (can be string or content array)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenAIContent {
    /// Simple text content
    Text(String),
    /// Content array (supports multimodal)
    Array(Vec<OpenAIContentPart>),
}

/// OpenAI content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OpenAIContentPart {
    /// Text part
    #[serde(rename = "text")]
    Text { text: String },
    /// Image URL part
    #[serde(rename = "image_url")]
    ImageUrl { image_url: OpenAIImageUrl },
}

/// OpenAI image URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAIImageUrl {
    /// Image URL (http(s) or data URL)
    pub url: String,
    /// Detail level (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// OpenAI response format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIResponseFormat {
    /// Format type ("text", "json_object" or "json_schema")
    #[serde(rename = "type")]
    pub format_type: String,
    /// Schema definition when `format_type` is "json_schema"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<OpenAIJsonSchema>,
}

/// Named JSON schema for schema-constrained responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIJsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// OpenAI tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAITool {
    /// Tool type
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function definition
    pub function: OpenAIFunction,
}

/// OpenAI function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIFunction {
    /// Function name
    pub name: String,
    /// Function description (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameter schema (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    /// Strict schema adherence (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// OpenAI tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIToolCall {
    /// Call ID
    pub id: String,
    /// Tool type
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function call
    pub function: OpenAIFunctionCall,
}

/// OpenAI function call structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIFunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments as JSON string
    #[serde(default)]
    pub arguments: String,
}

/// OpenAI API response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIResponse {
    /// Response ID
    pub id: String,
    /// Object type
    pub object: String,
    /// Creation timestamp
    pub created: u64,
    /// Model used
    pub model: String,
    /// Choice list
    pub choices: Vec<OpenAIChoice>,
    /// Usage statistics (absent on some compatible backends)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenAIUsage>,
    /// System fingerprint (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

/// OpenAI choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIChoice {
    /// Choice index
    pub index: u32,
    /// Message content
    pub message: OpenAIMessage,
    /// Finish reason
    pub finish_reason: Option<String>,
}

/// OpenAI usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAIUsage {
    /// Prompt token count
    pub prompt_tokens: u32,
    /// Completion token count
    pub completion_tokens: u32,
    /// Total token count
    pub total_tokens: u32,
}

/// OpenAI error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIErrorResponse {
    /// Error information
    pub error: OpenAIError,
}

/// OpenAI error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIError {
    /// Error message
    pub message: String,
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Error parameter (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Error code (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl OpenAIContent {
    /// Extract text content
    pub fn extract_text(&self) -> String {
        match self {
            OpenAIContent::Text(text) => text.clone(),
            OpenAIContent::Array(parts) => {
                parts
                    .iter()
                    .filter_map(|part| match part {
                        OpenAIContentPart::Text { text } => Some(text.clone()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("")
            }
        }
    }

    /// Check if contains images
    pub fn has_images(&self) -> bool {
        match self {
            OpenAIContent::Text(_) => false,
            OpenAIContent::Array(parts) => {
                parts.iter().any(|part| matches!(part, OpenAIContentPart::ImageUrl { .. }))
            }
        }
    }
}

impl OpenAIResponse {
    /// First choice's message, which is the only one requested
    pub fn first_message(&self) -> Option<&OpenAIMessage> {
        self.choices.first().map(|choice| &choice.message)
    }
}

impl Default for OpenAIRequest {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            messages: Vec::new(),
            max_tokens: None,
            temperature: None,
            response_format: None,
            tools: None,
            tool_choice: None,
        }
    }
}
