//! Data models module
//!
//! Defines OpenAI wire structures, transcript turns and usage statistics

use serde::{Deserialize, Serialize};

pub mod openai;
pub mod turn;

pub use turn::{ContentPart, ImagePayload, Role, ToolCallRequest, Turn, TurnContent};

/// Token usage reported for a single completion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt token count
    pub prompt_tokens: u64,
    /// Completion token count
    pub completion_tokens: u64,
    /// Total token count
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Add another call's usage
    pub fn merge(&mut self, other: &Usage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.prompt_tokens.saturating_add(self.completion_tokens);
    }
}

impl From<openai::OpenAIUsage> for Usage {
    fn from(usage: openai::OpenAIUsage) -> Self {
        Self::new(usage.prompt_tokens as u64, usage.completion_tokens as u64)
    }
}

/// Usage of one `submit`, summed over its tool rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallUsage {
    Reported(Usage),
    Unavailable,
}

/// Running totals plus derived cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub model_id: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Estimated cost in US dollars
    pub estimated_cost: f64,
}

impl UsageSummary {
    /// Cost formatted as dollars with eight decimals
    pub fn formatted_cost(&self) -> String {
        format!("${:.8}", self.estimated_cost)
    }
}
