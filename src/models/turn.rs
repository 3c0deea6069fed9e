//! Transcript turn types
//!
//! A `Turn` is immutable once constructed; the session only ever appends them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A base64 encoded image attached to a user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// MIME type, e.g. "image/png"
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    /// Render as a `data:` URL
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One part of a multimodal user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { image: ImagePayload },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(image: ImagePayload) -> Self {
        ContentPart::Image { image }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            ContentPart::Image { .. } => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImagePayload> {
        match self {
            ContentPart::Image { image } => Some(image),
            ContentPart::Text { .. } => None,
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier echoed back on the matching tool result
    pub id: String,
    /// Declared tool name
    pub name: String,
    /// Raw JSON argument string as produced by the model
    pub arguments: String,
}

/// Turn content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnContent {
    /// Plain text
    Text { text: String },
    /// Text and images
    Parts { parts: Vec<ContentPart> },
    /// Assistant request to invoke one or more tools
    ToolCalls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
    /// Output of a tool handler
    ToolResult { tool_call_id: String, output: String },
}

/// One message of a transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: TurnContent,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Parts { parts },
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn tool_calls(text: Option<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::ToolCalls { text, calls },
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: TurnContent::ToolResult {
                tool_call_id: tool_call_id.into(),
                output: output.into(),
            },
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &TurnContent {
        &self.content
    }

    /// Identifier linking a tool result to its request
    pub fn tool_call_id(&self) -> Option<&str> {
        match &self.content {
            TurnContent::ToolResult { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Tool calls carried by an assistant turn, empty otherwise
    pub fn requested_calls(&self) -> &[ToolCallRequest] {
        match &self.content {
            TurnContent::ToolCalls { calls, .. } => calls,
            _ => &[],
        }
    }

    /// Text of the turn, ignoring images
    pub fn text(&self) -> String {
        match &self.content {
            TurnContent::Text { text } => text.clone(),
            TurnContent::Parts { parts } => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            TurnContent::ToolCalls { text, .. } => text.clone().unwrap_or_default(),
            TurnContent::ToolResult { output, .. } => output.clone(),
        }
    }
}
