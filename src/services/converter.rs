//! API converter service
//!
//! Converts transcript turns and tool declarations into OpenAI wire format and
//! assistant responses back into transcript terms

use crate::models::openai::*;
use crate::models::{ContentPart, Role, ToolCallRequest, Turn, TurnContent, Usage};
use crate::tools::ToolDeclaration;
use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Assistant reply extracted from a completion response
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    /// Text content (may be absent on tool calls or refusals)
    pub content: Option<String>,
    /// Refusal text returned instead of content
    pub refusal: Option<String>,
    /// Requested tool invocations
    pub tool_calls: Vec<ToolCallRequest>,
    /// Reported usage
    pub usage: Option<Usage>,
}

/// API converter
#[derive(Debug, Clone, Default)]
pub struct ApiConverter;

impl ApiConverter {
    pub fn new() -> Self {
        Self
    }

    /// Build a chat completion request
    pub fn build_request<'a>(
        &self,
        model: &str,
        turns: impl IntoIterator<Item = &'a Turn>,
        tools: impl IntoIterator<Item = &'a ToolDeclaration>,
        response_format: Option<OpenAIResponseFormat>,
    ) -> OpenAIRequest {
        let messages: Vec<OpenAIMessage> = turns.into_iter().map(|turn| self.convert_turn(turn)).collect();
        let tools: Vec<OpenAITool> = tools.into_iter().map(|tool| self.convert_tool(tool)).collect();

        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (Some(tools), Some(serde_json::json!("auto")))
        };

        debug!(
            "Built request with {} messages and {} tools",
            messages.len(),
            tools.as_ref().map(|t| t.len()).unwrap_or(0)
        );

        OpenAIRequest {
            model: model.to_string(),
            messages,
            response_format,
            tools,
            tool_choice,
            ..Default::default()
        }
    }

    /// Convert one turn to an OpenAI message
    pub fn convert_turn(&self, turn: &Turn) -> OpenAIMessage {
        let role = turn.role().as_str().to_string();

        match turn.content() {
            TurnContent::Text { text } => OpenAIMessage {
                role,
                content: Some(OpenAIContent::Text(text.clone())),
                ..Default::default()
            },
            TurnContent::Parts { parts } => OpenAIMessage {
                role,
                content: Some(OpenAIContent::Array(parts.iter().map(convert_part).collect())),
                ..Default::default()
            },
            TurnContent::ToolCalls { text, calls } => OpenAIMessage {
                role,
                content: text.clone().map(OpenAIContent::Text),
                tool_calls: Some(
                    calls
                        .iter()
                        .map(|call| OpenAIToolCall {
                            id: call.id.clone(),
                            tool_type: "function".to_string(),
                            function: OpenAIFunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        })
                        .collect(),
                ),
                ..Default::default()
            },
            TurnContent::ToolResult { tool_call_id, output } => OpenAIMessage {
                role,
                content: Some(OpenAIContent::Text(output.clone())),
                tool_call_id: Some(tool_call_id.clone()),
                ..Default::default()
            },
        }
    }

    /// Convert a tool declaration to an OpenAI function tool
    pub fn convert_tool(&self, tool: &ToolDeclaration) -> OpenAITool {
        OpenAITool {
            tool_type: "function".to_string(),
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                parameters: Some(tool.schema()),
                strict: tool.strict.then_some(true),
            },
        }
    }

    /// Extract the assistant reply from a response
    pub fn convert_response(&self, response: OpenAIResponse) -> Result<AssistantReply> {
        let usage = response.usage.map(Usage::from);

        let choice = response
            .choices
            .into_iter()
            .next()
            .context("Completion response contained no choices")?;

        if choice.message.role != Role::Assistant.as_str() {
            warn!("Unexpected role in completion response: {}", choice.message.role);
        }

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(AssistantReply {
            content: choice.message.content.map(|content| content.extract_text()),
            refusal: choice.message.refusal.filter(|text| !text.is_empty()),
            tool_calls,
            usage,
        })
    }
}

fn convert_part(part: &ContentPart) -> OpenAIContentPart {
    match part {
        ContentPart::Text { text } => OpenAIContentPart::Text { text: text.clone() },
        ContentPart::Image { image } => OpenAIContentPart::ImageUrl {
            image_url: OpenAIImageUrl {
                url: image.data_url(),
                detail: None,
            },
        },
    }
}
