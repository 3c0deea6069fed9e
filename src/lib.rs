//! Conversational sessions over the OpenAI chat completions API
//!
//! A `ConversationSession` owns a transcript, resends it with transient
//! policy instructions on every call, runs declared tools until the model
//! answers, and tracks token usage and cost against a `ModelCatalog`.

pub mod cli;
pub mod config;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod services;
pub mod tools;
pub mod utils;

// Re-export common types
pub use config::Settings;
pub use handlers::{create_router, AppState};
pub use models::{CallUsage, ContentPart, ImagePayload, Role, Turn, Usage, UsageSummary};
pub use providers::{CompletionBackend, OpenAIProvider, RetryingBackend};
pub use services::{
    BillExtractor, ConversationSession, ModelCatalog, ModelProfile, Outcome, Reply, SessionPhase, Structured,
};
pub use tools::{ParamType, ToolContext, ToolDeclaration, ToolHandler, ToolRegistry};
pub use utils::error::{AppError, AppResult, SessionError, SessionResult};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
