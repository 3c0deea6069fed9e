//! Conversation session
//!
//! Owns a transcript, replays it on every completion call with the session's
//! transient policy turns appended, runs requested tools until the model
//! answers, and accumulates token usage.
//!
//! Turns produced by a submission are staged and only committed to the
//! transcript once the submission succeeds, so a failed, timed-out or
//! cancelled submission leaves the transcript untouched. Usage is recorded as
//! soon as the backend reports it.

use crate::models::openai::OpenAIResponseFormat;
use crate::models::{CallUsage, ContentPart, Turn, Usage, UsageSummary};
use crate::providers::CompletionBackend;
use crate::services::catalog::{ModelCatalog, ModelProfile};
use crate::services::converter::{ApiConverter, AssistantReply};
use crate::services::usage::UsageCounter;
use crate::tools::{ToolContext, ToolRegistry};
use crate::utils::error::{SessionError, SessionResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default bound on tool-call rounds per submission
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

/// Default backend call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a session is in its request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingModel,
    ExecutingTools,
}

impl SessionPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionPhase::AwaitingModel,
            2 => SessionPhase::ExecutingTools,
            _ => SessionPhase::Idle,
        }
    }
}

/// Final result of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Assistant text
    Text(String),
    /// The model declined to answer
    Refused(String),
}

impl Outcome {
    pub fn text(&self) -> &str {
        match self {
            Outcome::Text(text) | Outcome::Refused(text) => text,
        }
    }
}

/// Reply to one `submit`
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub outcome: Outcome,
    /// Whether any completion call of this submission reported usage
    pub usage_reported: bool,
    /// Per-call token breakdown, present while diagnostics are enabled
    pub diagnostics: Option<CallUsage>,
}

impl Reply {
    pub fn text(&self) -> &str {
        self.outcome.text()
    }

    pub fn is_refusal(&self) -> bool {
        matches!(self.outcome, Outcome::Refused(_))
    }
}

struct SessionState {
    transcript: Vec<Turn>,
    usage: UsageCounter,
    diagnostics: bool,
}

/// Clears the busy flag and resets the phase on drop, including when the
/// submission future is cancelled
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
    phase: &'a AtomicU8,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool, phase: &'a AtomicU8) -> SessionResult<Self> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(SessionError::SessionBusy);
        }
        Ok(Self { flag, phase })
    }

    fn enter(&self, phase: SessionPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.phase.store(SessionPhase::Idle as u8, Ordering::Release);
        self.flag.store(false, Ordering::Release);
    }
}

/// Builder for `ConversationSession`
pub struct SessionBuilder {
    backend: Arc<dyn CompletionBackend>,
    model_id: String,
    catalog: Arc<ModelCatalog>,
    system_prompt: Option<String>,
    policies: Vec<String>,
    tools: ToolRegistry,
    max_tool_rounds: u32,
    timeout: Duration,
}

impl SessionBuilder {
    /// Persona or scope instruction, stored as the leading system turn
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Guardrail resent as a system turn after the transcript on every call,
    /// never stored in the transcript
    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.policies.push(policy.into());
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn catalog(mut self, catalog: Arc<ModelCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn max_tool_rounds(mut self, max: u32) -> Self {
        self.max_tool_rounds = max;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the model against the catalog and create the session
    pub fn build(self) -> SessionResult<ConversationSession> {
        let model = self.catalog.get(&self.model_id)?.clone();

        let transcript = self
            .system_prompt
            .filter(|prompt| !prompt.trim().is_empty())
            .map(Turn::system)
            .into_iter()
            .collect();

        info!(
            model = %model.id,
            tools = self.tools.len(),
            policies = self.policies.len(),
            "Conversation session created"
        );

        Ok(ConversationSession {
            backend: self.backend,
            catalog: self.catalog,
            model,
            tools: self.tools,
            policies: self.policies.into_iter().map(Turn::system).collect(),
            max_tool_rounds: self.max_tool_rounds.max(1),
            timeout: self.timeout,
            converter: ApiConverter::new(),
            state: Mutex::new(SessionState {
                transcript,
                usage: UsageCounter::new(),
                diagnostics: false,
            }),
            busy: AtomicBool::new(false),
            phase: AtomicU8::new(SessionPhase::Idle as u8),
        })
    }
}

/// One logical conversation with a completion backend
pub struct ConversationSession {
    backend: Arc<dyn CompletionBackend>,
    catalog: Arc<ModelCatalog>,
    model: ModelProfile,
    tools: ToolRegistry,
    policies: Vec<Turn>,
    max_tool_rounds: u32,
    timeout: Duration,
    converter: ApiConverter,
    state: Mutex<SessionState>,
    busy: AtomicBool,
    phase: AtomicU8,
}

/// Turns and usage produced by one successful submission
pub(crate) struct Exchange {
    pub(crate) outcome: Outcome,
    pub(crate) usage: Option<Usage>,
}

impl ConversationSession {
    pub fn builder(backend: Arc<dyn CompletionBackend>, model_id: impl Into<String>) -> SessionBuilder {
        SessionBuilder {
            backend,
            model_id: model_id.into(),
            catalog: Arc::new(ModelCatalog::builtin()),
            system_prompt: None,
            policies: Vec::new(),
            tools: ToolRegistry::new(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Submit user text and wait for the assistant's answer
    pub async fn submit(&self, user_text: &str) -> SessionResult<Reply> {
        let turn = text_turn(user_text)?;
        self.submit_turn(turn, None).await
    }

    /// Submit a multimodal user turn
    pub async fn submit_parts(&self, parts: Vec<ContentPart>) -> SessionResult<Reply> {
        if parts.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        self.submit_turn(Turn::user_parts(parts), None).await
    }

    /// Like `submit`, aborting with `Cancelled` when the token fires
    pub async fn submit_cancellable(&self, user_text: &str, cancel: CancellationToken) -> SessionResult<Reply> {
        let turn = text_turn(user_text)?;
        self.submit_turn(turn, Some(&cancel)).await
    }

    async fn submit_turn(&self, turn: Turn, cancel: Option<&CancellationToken>) -> SessionResult<Reply> {
        let exchange = self.exchange(turn, None, cancel).await?;
        Ok(self.reply_from(exchange))
    }

    fn reply_from(&self, exchange: Exchange) -> Reply {
        let diagnostics = self.diagnostics_enabled().then(|| match exchange.usage {
            Some(usage) => CallUsage::Reported(usage),
            None => CallUsage::Unavailable,
        });

        Reply {
            outcome: exchange.outcome,
            usage_reported: exchange.usage.is_some(),
            diagnostics,
        }
    }

    /// Run one user turn through the completion and tool loop
    pub(crate) async fn exchange(
        &self,
        user_turn: Turn,
        response_format: Option<OpenAIResponseFormat>,
        cancel: Option<&CancellationToken>,
    ) -> SessionResult<Exchange> {
        let guard = BusyGuard::acquire(&self.busy, &self.phase)?;

        let mut pending = vec![user_turn];
        let mut call_usage: Option<Usage> = None;
        let mut flip_diagnostics = false;
        let mut rounds = 0u32;

        let reply = loop {
            guard.enter(SessionPhase::AwaitingModel);
            let reply = self.complete(&pending, response_format.clone(), cancel).await?;

            match reply.usage {
                Some(usage) => {
                    self.state().usage.record(&usage);
                    call_usage.get_or_insert_with(Usage::default).merge(&usage);
                }
                None => {
                    debug!("Completion returned no usage information");
                    self.state().usage.record_unavailable();
                }
            }

            if reply.tool_calls.is_empty() {
                break reply;
            }

            if rounds >= self.max_tool_rounds {
                warn!(rounds, "Model kept requesting tools, aborting submission");
                return Err(SessionError::ToolLoopExceeded(self.max_tool_rounds));
            }
            rounds += 1;

            guard.enter(SessionPhase::ExecutingTools);
            self.run_tools(reply, &mut pending, &mut flip_diagnostics, cancel).await?;
        };

        let outcome = match reply.refusal {
            Some(reason) => {
                info!("Model refused to answer");
                Outcome::Refused(reason)
            }
            None => Outcome::Text(reply.content.unwrap_or_default()),
        };
        pending.push(Turn::assistant(outcome.text()));

        let mut state = self.state();
        state.transcript.extend(pending);
        if flip_diagnostics {
            state.diagnostics = !state.diagnostics;
        }
        debug!(
            transcript_len = state.transcript.len(),
            tool_rounds = rounds,
            "Submission committed"
        );

        Ok(Exchange { outcome, usage: call_usage })
    }

    /// Send transcript + staged turns + policies to the backend
    async fn complete(
        &self,
        pending: &[Turn],
        response_format: Option<OpenAIResponseFormat>,
        cancel: Option<&CancellationToken>,
    ) -> SessionResult<AssistantReply> {
        let request = {
            let state = self.state();
            let turns = state.transcript.iter().chain(pending).chain(&self.policies);
            self.converter
                .build_request(&self.model.id, turns, self.tools.declarations(), response_format)
        };

        let call = tokio::time::timeout(self.timeout, self.backend.chat_complete(request));
        let response = match self.cancellable(call, cancel).await? {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(SessionError::Backend(e)),
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Completion call timed out");
                return Err(SessionError::Timeout(self.timeout));
            }
        };

        self.converter
            .convert_response(response)
            .map_err(SessionError::Backend)
    }

    /// Validate every requested call, then execute them in order
    ///
    /// A diagnostics toggle made by a tool is staged in `flip_diagnostics`
    /// and only reaches the session when the submission commits.
    async fn run_tools(
        &self,
        reply: AssistantReply,
        pending: &mut Vec<Turn>,
        flip_diagnostics: &mut bool,
        cancel: Option<&CancellationToken>,
    ) -> SessionResult<()> {
        let prepared = reply
            .tool_calls
            .iter()
            .map(|call| self.tools.prepare(call))
            .collect::<SessionResult<Vec<_>>>()?;

        pending.push(Turn::tool_calls(reply.content, reply.tool_calls));

        let (usage, diagnostics_before) = {
            let state = self.state();
            (state.usage.clone(), state.diagnostics ^ *flip_diagnostics)
        };
        let mut diagnostics = diagnostics_before;

        for call in prepared {
            debug!(tool = %call.name, id = %call.id, "Executing tool");
            let mut ctx = ToolContext::new(&usage, &self.model, &mut diagnostics);
            let output = match self.cancellable(call.handler.call(&call.arguments, &mut ctx), cancel).await? {
                Ok(output) => output,
                Err(e) => {
                    warn!(tool = %call.name, "Tool handler failed: {:#}", e);
                    format!("Error: {:#}", e)
                }
            };
            pending.push(Turn::tool_result(call.id, output));
        }

        if diagnostics != diagnostics_before {
            *flip_diagnostics = !*flip_diagnostics;
        }

        Ok(())
    }

    async fn cancellable<F: Future>(&self, future: F, cancel: Option<&CancellationToken>) -> SessionResult<F::Output> {
        match cancel {
            Some(token) => tokio::select! {
                output = future => Ok(output),
                _ = token.cancelled() => {
                    info!("Submission cancelled");
                    Err(SessionError::Cancelled)
                }
            },
            None => Ok(future.await),
        }
    }

    /// Current totals with estimated cost for the session's model
    pub fn usage_summary(&self) -> SessionResult<UsageSummary> {
        let totals = self.state().usage.totals();
        let estimated_cost = self
            .catalog
            .price_of(&self.model.id, totals.prompt_tokens, totals.completion_tokens)?;

        Ok(UsageSummary {
            model_id: self.model.id.clone(),
            prompt_tokens: totals.prompt_tokens,
            completion_tokens: totals.completion_tokens,
            total_tokens: totals.total_tokens,
            estimated_cost,
        })
    }

    /// Flip per-call token breakdowns on replies, returning the new value
    pub fn toggle_diagnostics(&self) -> bool {
        let mut state = self.state();
        state.diagnostics = !state.diagnostics;
        state.diagnostics
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.state().diagnostics
    }

    /// Snapshot of the transcript
    pub fn transcript(&self) -> Vec<Turn> {
        self.state().transcript.clone()
    }

    pub fn transcript_len(&self) -> usize {
        self.state().transcript.len()
    }

    pub fn model(&self) -> &ModelProfile {
        &self.model
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn max_tool_rounds(&self) -> u32 {
        self.max_tool_rounds
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // state is never left half-updated, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn text_turn(user_text: &str) -> SessionResult<Turn> {
    if user_text.trim().is_empty() {
        return Err(SessionError::EmptyInput);
    }
    Ok(Turn::user(user_text))
}
