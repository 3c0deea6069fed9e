//! Console front ends
//!
//! Each subcommand of the `aichat` binary is one small conversation demo on
//! top of `ConversationSession`.

use crate::config::Settings;
use crate::models::CallUsage;
use crate::providers::CompletionBackend;
use crate::services::{ConversationSession, MathReasoning, ModelCatalog, Outcome, Reply, SessionBuilder, Structured};
use crate::tools::{token_stats_tool, toggle_tokens_tool, weather_tool, ToolRegistry, WeatherClient};
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

pub const DEFAULT_PROMPT: &str = "Write a haiku about recursion in programming.";

const ASSISTANT_PROMPT: &str = "You are a helpful assistant.";

const TUTOR_PROMPT: &str = "You are a helpful tutor on French culture. All questions should be answered \
with respect to French culture and history. It is important to provide accurate and detailed \
information. When appropriate, include references to famous French cultural figures, use French \
words/phrases, and discuss the significance of events in French history. Your goal is to help the user \
learn about French culture in an engaging and informative way. If the user asks about a specific topic, \
provide a brief overview and suggest further reading or resources. If the user asks for a summary of a \
specific event, provide a concise summary and highlight its importance in French culture. If the user \
asks for a comparison between French culture and another culture, provide a thoughtful analysis that \
respects both cultures. The bulk of any answer should be in the language of the user which defaults to \
English.";

const TUTOR_POLICY: &str = "Only answer questions relevant to French culture and history. It's ok to \
discuss controversial topics, but keep it respectful of all cultures involved. Assume the user is a high \
school student around the age of 16 and keep answers simple and easy to understand and appropriate.";

const TUTOR_TOOLS_POLICY: &str = "If the user asks to toggle tokens use the toggle_tokens tool function. \
If the user asks for stats on the session such as the selected model, the number of tokens used, or the \
cost/expense of the tokens use the token_stats tool function.";

const WEATHER_PROMPT: &str = "You are a helpful French weather and fashion expert. When a user asks about \
the weather or what clothing and accessories to wear in a specific location in France, retrieve the \
current weather for the specified location and provide recommendations accordingly. Respond in the \
language the user uses for their request.";

const WEATHER_POLICY: &str = "Please only answer questions about French weather and fashion. For all \
other requests, politely decline to answer and suggest a random French city to visit. All answers \
should be appropriate for a 16-year-old high school student using a school computer. Respond in the \
language the user uses for their request. Default to English if you are unsure which language the user \
is using.";

const MATH_PROMPT: &str = "You are a helpful math tutor. Guide the user through the solution step by step.";

pub const MATH_QUESTION: &str = "how can I derive the first derivative function of x^2 + 3x + 5?";

pub const MATH_MODEL: &str = "gpt-4o-2024-08-06";

/// Shared collaborators of the console demos
pub struct CliContext {
    pub settings: Settings,
    pub catalog: Arc<ModelCatalog>,
    pub backend: Arc<dyn CompletionBackend>,
}

/// Options of the `chat` subcommand
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub stateless: bool,
    pub tools: bool,
}

impl CliContext {
    fn session(&self, model: &str) -> SessionBuilder {
        ConversationSession::builder(self.backend.clone(), model)
            .catalog(self.catalog.clone())
            .max_tool_rounds(self.settings.session.max_tool_rounds)
            .timeout(Duration::from_secs(self.settings.openai.timeout))
    }

    fn model_or_default(&self, model: Option<String>) -> String {
        model.unwrap_or_else(|| self.settings.session.default_model.clone())
    }

    /// Single-shot question
    pub async fn ask<W: Write>(&self, prompt: Option<String>, model: Option<String>, out: &mut W) -> Result<()> {
        let model = self.model_or_default(model);
        let session = self.session(&model).system_prompt(ASSISTANT_PROMPT).build()?;

        let prompt = prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string());
        let reply = session.submit(&prompt).await?;
        print_reply(out, &reply)?;
        Ok(())
    }

    fn chat_session(&self, model: &str, tools: bool) -> Result<ConversationSession> {
        let mut builder = self
            .session(model)
            .system_prompt(TUTOR_PROMPT)
            .policy(TUTOR_POLICY);

        if tools {
            let mut registry = ToolRegistry::new();
            let (declaration, handler) = toggle_tokens_tool();
            registry.register(declaration, handler)?;
            let (declaration, handler) = token_stats_tool();
            registry.register(declaration, handler)?;
            builder = builder.policy(TUTOR_TOOLS_POLICY).tools(registry);
        }

        Ok(builder.build()?)
    }

    /// French culture tutor loop
    pub async fn chat<R, W>(&self, options: ChatOptions, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();

        writeln!(out, "\n\n\nWelcome to the French Culture Tutor!\n")?;

        let model = match options.model {
            Some(model) => model,
            None => {
                writeln!(out, "Available models:")?;
                for (index, profile) in self.catalog.profiles().iter().enumerate() {
                    writeln!(out, "{} {} ({})", index + 1, profile.name, profile.id)?;
                }
                write!(out, "\nWhich model would you like to use? ")?;
                out.flush()?;

                let answer = lines.next_line().await?.unwrap_or_default();
                let number: usize = answer.trim().parse().context("Invalid model number.")?;
                self.catalog.select(number)?.id.clone()
            }
        };

        let mut session = self.chat_session(&model, options.tools)?;

        loop {
            write!(out, "\nWhat can I help you with? (type `q` to exit)\n\n> ")?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let message = line.trim();

            match message.to_lowercase().as_str() {
                "" => continue,
                "q" | "quit" | "exit" => {
                    writeln!(out, "Goodbye!")?;
                    break;
                }
                "toggle tokens" => {
                    writeln!(out, "Show tokens: {}", session.toggle_diagnostics())?;
                    continue;
                }
                "token count" => {
                    let summary = session.usage_summary()?;
                    writeln!(
                        out,
                        "Model: {}\nPrompt Tokens: {}\nCompletion Tokens: {}\nTotal Tokens: {} Total Expense: ({})",
                        summary.model_id,
                        summary.prompt_tokens,
                        summary.completion_tokens,
                        summary.total_tokens,
                        summary.formatted_cost()
                    )?;
                    continue;
                }
                _ => {}
            }

            if options.stateless {
                let diagnostics = session.diagnostics_enabled();
                session = self.chat_session(&model, options.tools)?;
                if diagnostics {
                    session.toggle_diagnostics();
                }
            }

            match session.submit(message).await {
                Ok(reply) => print_reply(out, &reply)?,
                Err(e) => {
                    warn!("Submission failed: {}", e);
                    writeln!(out, "\nError: {}", e)?;
                }
            }
        }

        Ok(())
    }

    /// French weather and fashion expert with the weather tool
    pub async fn weather<R, W>(&self, question: Option<String>, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let client = WeatherClient::from_config(&self.settings.weather)?
            .context("OPEN_WEATHER_API_KEY environment variable not set")?;
        let (declaration, handler) = weather_tool(client);
        let tools = ToolRegistry::new().with_tool(declaration, handler)?;

        let session = self
            .session(&self.settings.session.default_model)
            .system_prompt(WEATHER_PROMPT)
            .policy(WEATHER_POLICY)
            .tools(tools)
            .build()?;

        writeln!(out, "\n\n\nWelcome to the French Weather and Fashion Expert!\n")?;
        let question = match question {
            Some(question) => question,
            None => {
                write!(out, "Ask what kind of clothing to wear in any French city today > ")?;
                out.flush()?;
                input.lines().next_line().await?.unwrap_or_default()
            }
        };

        let reply = session.submit(&question).await?;
        print_reply(out, &reply)?;
        Ok(())
    }

    /// Structured output demo
    pub async fn math<W: Write>(&self, question: Option<String>, model: Option<String>, out: &mut W) -> Result<()> {
        let model = model.unwrap_or_else(|| MATH_MODEL.to_string());
        let session = self.session(&model).system_prompt(MATH_PROMPT).build()?;

        let question = question.unwrap_or_else(|| MATH_QUESTION.to_string());
        match session.submit_structured::<MathReasoning>(&question, "math_reasoning").await? {
            Structured::Parsed(reasoning) => writeln!(out, "{}", reasoning)?,
            Structured::Refused(reason) => writeln!(out, "Refusal: {}", reason)?,
        }
        Ok(())
    }
}

/// Print assistant text plus per-call tokens when diagnostics are on
pub fn print_reply<W: Write>(out: &mut W, reply: &Reply) -> std::io::Result<()> {
    match &reply.outcome {
        Outcome::Text(text) => writeln!(out, "\n{}", text)?,
        Outcome::Refused(reason) => writeln!(out, "\nRefusal: {}", reason)?,
    }

    match &reply.diagnostics {
        Some(CallUsage::Reported(usage)) => writeln!(
            out,
            "\n\nCompletion Tokens: {}\nPrompt Tokens: {}\nTotal Tokens: {}",
            usage.completion_tokens, usage.prompt_tokens, usage.total_tokens
        ),
        Some(CallUsage::Unavailable) => writeln!(out, "No usage information available."),
        None => Ok(()),
    }
}
