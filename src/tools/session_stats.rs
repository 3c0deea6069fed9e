//! Session introspection tools
//!
//! Lets the model toggle token diagnostics and report usage and expense.

use super::{ToolContext, ToolDeclaration, ToolHandler};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

struct ToggleTokens;

#[async_trait]
impl ToolHandler for ToggleTokens {
    async fn call(&self, _arguments: &Value, ctx: &mut ToolContext<'_>) -> anyhow::Result<String> {
        let enabled = ctx.toggle_diagnostics();
        Ok(format!("Show tokens: {}", enabled))
    }
}

struct TokenStats;

#[async_trait]
impl ToolHandler for TokenStats {
    async fn call(&self, _arguments: &Value, ctx: &mut ToolContext<'_>) -> anyhow::Result<String> {
        let summary = ctx.usage_summary();
        Ok(format!(
            "Model: {}\nTotal Tokens: {} Total Expense: ({})",
            summary.model_id,
            summary.total_tokens,
            summary.formatted_cost()
        ))
    }
}

/// `toggle_tokens` declaration and handler
pub fn toggle_tokens_tool() -> (ToolDeclaration, Arc<dyn ToolHandler>) {
    (
        ToolDeclaration::new(
            "toggle_tokens",
            "Toggle the display of token usage information for the last chat.",
        )
        .strict(true),
        Arc::new(ToggleTokens),
    )
}

/// `token_stats` declaration and handler
pub fn token_stats_tool() -> (ToolDeclaration, Arc<dyn ToolHandler>) {
    (
        ToolDeclaration::new(
            "token_stats",
            "Get stats on the selected model, number of total tokens, and the expense of the tokens in dollars.",
        )
        .strict(true),
        Arc::new(TokenStats),
    )
}
