//! Service layer module
//!
//! Contains the model catalog, turn conversion, conversation sessions,
//! structured output and bill extraction

pub mod bills;
pub mod catalog;
pub mod converter;
pub mod session;
pub mod structured;
pub mod usage;

pub use bills::BillExtractor;
pub use catalog::{ModelCatalog, ModelProfile};
pub use converter::{ApiConverter, AssistantReply};
pub use session::{ConversationSession, Outcome, Reply, SessionBuilder, SessionPhase};
pub use structured::{MathReasoning, Step, Structured};
pub use usage::UsageCounter;
