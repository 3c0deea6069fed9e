//! Schema-constrained responses
//!
//! Asks the backend for a `json_schema` response format generated from a Rust
//! type and decodes the reply into that type.

use crate::models::openai::{OpenAIJsonSchema, OpenAIResponseFormat};
use crate::models::Turn;
use crate::services::session::{ConversationSession, Outcome};
use crate::utils::error::{SessionError, SessionResult};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Typed result of a structured submission
#[derive(Debug, Clone, PartialEq)]
pub enum Structured<T> {
    Parsed(T),
    Refused(String),
}

/// `response_format` requesting JSON that matches `T`'s schema
pub fn response_format_for<T: JsonSchema>(name: &str) -> SessionResult<OpenAIResponseFormat> {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .map_err(|e| SessionError::StructuredDecode(format!("failed to render schema: {}", e)))?;

    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
    }

    Ok(OpenAIResponseFormat {
        format_type: "json_schema".to_string(),
        json_schema: Some(OpenAIJsonSchema {
            name: name.to_string(),
            schema,
            // schemars output does not close objects with additionalProperties
            strict: None,
        }),
    })
}

/// Decode assistant content as `T`
pub fn decode<T: DeserializeOwned>(content: &str) -> SessionResult<T> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(SessionError::StructuredDecode("response had no content".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|e| SessionError::StructuredDecode(e.to_string()))
}

impl ConversationSession {
    /// Submit user text and decode the answer as `T`
    ///
    /// The exchange is kept in the transcript even if decoding fails.
    pub async fn submit_structured<T>(&self, user_text: &str, schema_name: &str) -> SessionResult<Structured<T>>
    where
        T: JsonSchema + DeserializeOwned,
    {
        if user_text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let format = response_format_for::<T>(schema_name)?;
        debug!(schema = schema_name, "Submitting structured request");

        let exchange = self.exchange(Turn::user(user_text), Some(format), None).await?;
        match exchange.outcome {
            Outcome::Refused(reason) => Ok(Structured::Refused(reason)),
            Outcome::Text(content) => decode(&content).map(Structured::Parsed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Step {
    pub explanation: String,
    pub output: String,
}

/// Step-by-step solution to a math question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MathReasoning {
    pub steps: Vec<Step>,
    pub final_answer: String,
}

impl fmt::Display for MathReasoning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "Step {}:", i + 1)?;
            writeln!(f, "  Explanation: {}", step.explanation)?;
            writeln!(f, "  Output: {}", step.output)?;
            writeln!(f)?;
        }
        write!(f, "Final Answer: {}", self.final_answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_format_shape() {
        let format = response_format_for::<MathReasoning>("math_reasoning").unwrap();
        let json = serde_json::to_value(&format).unwrap();

        assert_eq!(json["type"], "json_schema");
        assert_eq!(json["json_schema"]["name"], "math_reasoning");
        let schema = &json["json_schema"]["schema"];
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["steps"].is_object());
        assert!(schema["required"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("final_answer")));
    }

    #[test]
    fn test_decode() {
        let parsed: MathReasoning = decode(
            r#" {"steps":[{"explanation":"Power rule","output":"2x"}],"final_answer":"2x + 3"} "#,
        )
        .unwrap();
        assert_eq!(parsed.steps.len(), 1);
        assert_eq!(parsed.final_answer, "2x + 3");

        assert!(matches!(decode::<MathReasoning>(""), Err(SessionError::StructuredDecode(_))));
        assert!(matches!(
            decode::<MathReasoning>(r#"{"steps": "none"}"#),
            Err(SessionError::StructuredDecode(_))
        ));
    }

    #[test]
    fn test_pretty_print() {
        let reasoning = MathReasoning {
            steps: vec![
                Step { explanation: "Differentiate x^2".to_string(), output: "2x".to_string() },
                Step { explanation: "Differentiate 3x".to_string(), output: "3".to_string() },
            ],
            final_answer: "2x + 3".to_string(),
        };

        let text = reasoning.to_string();
        assert!(text.starts_with("Step 1:\n  Explanation: Differentiate x^2\n  Output: 2x\n\nStep 2:"));
        assert!(text.ends_with("Final Answer: 2x + 3"));
    }
}
