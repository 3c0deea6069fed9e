//! Tool calling support
//!
//! Tools are declared once per session with a typed parameter list. The
//! declaration renders to a JSON Schema that is sent to the model and also
//! compiled locally, so arguments the model produces are validated before any
//! handler runs.

pub mod session_stats;
pub mod weather;

use crate::models::{ToolCallRequest, UsageSummary};
use crate::services::catalog::ModelProfile;
use crate::services::usage::UsageCounter;
use crate::utils::error::{SessionError, SessionResult};
use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use session_stats::{token_stats_tool, toggle_tokens_tool};
pub use weather::{format_weather_data, weather_tool, WeatherClient};

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamType {
    fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }
}

/// One named tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

/// Tool name, description and argument schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    /// Reject parameters that are not declared
    pub strict: bool,
}

impl ToolDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            strict: false,
        }
    }

    pub fn parameter(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.parameters.push(ToolParameter {
            name: name.into(),
            param_type,
            description: description.into(),
            required,
        });
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// JSON Schema describing accepted arguments
    pub fn schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.param_type.as_str(), "description": p.description }),
                )
            })
            .collect();

        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "required": required,
        });
        if self.strict {
            schema["additionalProperties"] = Value::Bool(false);
        }
        schema
    }

    fn check(&self) -> SessionResult<()> {
        let valid_name = !self.name.is_empty()
            && self.name.len() <= 64
            && self.name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(SessionError::invalid_declaration(
                &self.name,
                "name must be 1-64 characters of [a-zA-Z0-9_-]",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(SessionError::invalid_declaration(
                    &self.name,
                    format!("duplicate parameter '{}'", param.name),
                ));
            }
            // strict function calling requires every property to be listed as required
            if self.strict && !param.required {
                return Err(SessionError::invalid_declaration(
                    &self.name,
                    format!("strict tools cannot have optional parameter '{}'", param.name),
                ));
            }
        }
        Ok(())
    }
}

/// Session state visible to tool handlers
pub struct ToolContext<'a> {
    usage: &'a UsageCounter,
    model: &'a ModelProfile,
    diagnostics: &'a mut bool,
}

impl<'a> ToolContext<'a> {
    pub fn new(usage: &'a UsageCounter, model: &'a ModelProfile, diagnostics: &'a mut bool) -> Self {
        Self { usage, model, diagnostics }
    }

    pub fn model(&self) -> &ModelProfile {
        self.model
    }

    /// Usage totals recorded before this tool round
    pub fn usage_summary(&self) -> UsageSummary {
        self.usage.summary(self.model)
    }

    pub fn diagnostics(&self) -> bool {
        *self.diagnostics
    }

    /// Flip the diagnostics flag, returning the new value
    pub fn toggle_diagnostics(&mut self) -> bool {
        *self.diagnostics = !*self.diagnostics;
        *self.diagnostics
    }
}

/// Executes one declared tool
///
/// An `Err` is not fatal to the session: its message is sent back to the
/// model as the tool result.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: &Value, ctx: &mut ToolContext<'_>) -> anyhow::Result<String>;
}

/// Adapter for synchronous closures
struct FnHandler<F>(F);

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(&Value, &mut ToolContext<'_>) -> anyhow::Result<String> + Send + Sync,
{
    async fn call(&self, arguments: &Value, ctx: &mut ToolContext<'_>) -> anyhow::Result<String> {
        (self.0)(arguments, ctx)
    }
}

struct RegisteredTool {
    declaration: ToolDeclaration,
    validator: JSONSchema,
    handler: Arc<dyn ToolHandler>,
}

/// A tool call that passed lookup and argument validation
pub struct PreparedCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    pub handler: Arc<dyn ToolHandler>,
}

/// Declared tools with their handlers, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a tool and bind its handler
    pub fn register(&mut self, declaration: ToolDeclaration, handler: Arc<dyn ToolHandler>) -> SessionResult<()> {
        declaration.check()?;

        if self.get(&declaration.name).is_some() {
            return Err(SessionError::invalid_declaration(&declaration.name, "tool already registered"));
        }

        let schema = declaration.schema();
        let validator = JSONSchema::compile(&schema)
            .map_err(|e| SessionError::invalid_declaration(&declaration.name, e.to_string()))?;

        debug!(tool = %declaration.name, "Registered tool");
        self.tools.push(RegisteredTool {
            declaration,
            validator,
            handler,
        });
        Ok(())
    }

    /// Declare a tool backed by a synchronous closure
    pub fn register_fn<F>(&mut self, declaration: ToolDeclaration, handler: F) -> SessionResult<()>
    where
        F: Fn(&Value, &mut ToolContext<'_>) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.register(declaration, Arc::new(FnHandler(handler)))
    }

    /// Builder form of `register`
    pub fn with_tool(mut self, declaration: ToolDeclaration, handler: Arc<dyn ToolHandler>) -> SessionResult<Self> {
        self.register(declaration, handler)?;
        Ok(self)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &ToolDeclaration> {
        self.tools.iter().map(|tool| &tool.declaration)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|tool| tool.declaration.name == name)
    }

    /// Resolve the handler and validate the arguments of a requested call
    pub fn prepare(&self, call: &ToolCallRequest) -> SessionResult<PreparedCall> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| SessionError::UnknownTool(call.name.clone()))?;

        // models send "" for tools without parameters
        let raw = if call.arguments.trim().is_empty() { "{}" } else { call.arguments.as_str() };
        let arguments: Value = serde_json::from_str(raw)
            .map_err(|e| SessionError::invalid_arguments(&call.name, format!("arguments are not valid JSON: {}", e)))?;

        if let Err(errors) = tool.validator.validate(&arguments) {
            let messages: Vec<String> = errors.map(|err| err.to_string()).collect();
            return Err(SessionError::invalid_arguments(&call.name, messages.join("; ")));
        }

        Ok(PreparedCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
            handler: tool.handler.clone(),
        })
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|tool| &tool.declaration.name))
            .finish()
    }
}
