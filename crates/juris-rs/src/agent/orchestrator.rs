//! The agent loop: a small state machine on top of a [`ChatModel`].
//!
//! ```text
//! Idle ──▶ Thinking ──(tool calls)──▶ ToolCall ──▶ Thinking ...
//!             │
//!             └──(text only)──▶ Done ──▶ Idle
//! ```
//!
//! Each `Thinking` step is one chat completion offering the tools in the
//! [`ToolSet`]. Any tool error aborts the run. Running out of iterations is
//! [`QueryError::MaxIterations`], never a partial answer.

use serde::Serialize;
use tracing::{debug, info};

use super::config::AgentConfig;
use super::events::{AgentEvent, AgentResponse, EventHandler, NoopHandler};
use crate::api::generation::ChatModel;
use crate::api::retry::retry_with_backoff;
use crate::api::tracing::generate_trace_id;
use crate::tools::core::ToolSet;
use crate::{ChatRequest, Message, QueryError, ToolDef};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgentState {
    Idle,
    Thinking,
    ToolCall,
    Done,
}

/// Drives one query through the model and its tools.
///
/// `Orchestrator<'a>` borrows the chat model, tools and event handler; bind
/// them before building it:
///
/// ```ignore
/// let handler = LoggingHandler;
/// let response = Orchestrator::new(&client, &tools, &config)
///     .with_event_handler(&handler)
///     .run(&[], "Is an organ transplant covered?")
///     .await?;
/// ```
pub struct Orchestrator<'a> {
    chat: &'a dyn ChatModel,
    tools: &'a ToolSet,
    config: &'a AgentConfig,
    event_handler: &'a dyn EventHandler,
    state: AgentState,
}

impl<'a> Orchestrator<'a> {
    pub fn new(chat: &'a dyn ChatModel, tools: &'a ToolSet, config: &'a AgentConfig) -> Self {
        Self {
            chat,
            tools,
            config,
            event_handler: &NoopHandler,
            state: AgentState::Idle,
        }
    }

    /// Attach an event handler.
    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.event_handler = handler;
        self
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Answer `query` given prior conversation `history` (user/assistant
    /// messages, oldest first). The orchestrator is back in
    /// [`AgentState::Idle`] when this returns, whatever the outcome.
    pub async fn run(&mut self, history: &[Message], query: &str) -> Result<AgentResponse, QueryError> {
        let trace_id = generate_trace_id();
        info!("[{trace_id}] Agent run started: {}", preview(query));

        let result = self.run_inner(&trace_id, history, query).await;
        self.transition(AgentState::Idle);

        match &result {
            Ok(response) => info!(
                "[{trace_id}] Agent run finished in {} iteration(s), {} tokens",
                response.iterations_used,
                response.total_tokens()
            ),
            Err(e) => info!("[{trace_id}] Agent run failed: {e}"),
        }
        result
    }

    async fn run_inner(
        &mut self,
        trace_id: &str,
        history: &[Message],
        query: &str,
    ) -> Result<AgentResponse, QueryError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&self.config.system_prompt));
        messages.extend_from_slice(history);
        messages.push(Message::user(query));

        let tool_defs = self.tools.definitions();
        let tools_option = non_empty_tools(&tool_defs);
        let max_iterations = self.config.max_iterations;

        let mut prompt_tokens = 0u32;
        let mut completion_tokens = 0u32;

        self.transition(AgentState::Thinking);

        for iteration in 1..=max_iterations {
            self.event_handler.on_event(&AgentEvent::IterationStart {
                iteration,
                max_iterations,
            });

            let body = ChatRequest {
                model: Some(self.config.model.clone()),
                messages: messages.clone(),
                max_tokens: self.config.max_tokens,
                temperature: Some(self.config.temperature),
                tools: tools_option.clone(),
                ..Default::default()
            };
            let chat = self.chat;
            let completion = retry_with_backoff(&self.config.retry, || chat.complete(&body)).await?;

            if let Some(ref u) = completion.usage {
                let pt = u.prompt_tokens.unwrap_or(0);
                let ct = u.completion_tokens.unwrap_or(0);
                prompt_tokens = prompt_tokens.saturating_add(pt);
                completion_tokens = completion_tokens.saturating_add(ct);
                self.event_handler.on_event(&AgentEvent::TokenUsage {
                    prompt_tokens: pt,
                    completion_tokens: ct,
                });
            }

            let text = completion
                .content
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty());
            if let Some(text) = text {
                self.event_handler.on_event(&AgentEvent::Text(text));
            }

            if completion.tool_calls.is_empty() {
                let Some(text) = text else {
                    // Costs an iteration, so the loop stays bounded.
                    self.event_handler
                        .on_event(&AgentEvent::EmptyResponse { iteration });
                    continue;
                };
                self.transition(AgentState::Done);
                self.event_handler.on_event(&AgentEvent::Finished);
                return Ok(AgentResponse {
                    trace_id: trace_id.to_string(),
                    text: text.to_string(),
                    iterations_used: iteration,
                    prompt_tokens,
                    completion_tokens,
                    retrievals: Vec::new(),
                });
            }

            self.event_handler.on_event(&AgentEvent::ToolCallsReceived {
                iteration,
                count: completion.tool_calls.len(),
            });
            self.transition(AgentState::ToolCall);
            messages.push(Message::assistant_tool_calls(
                completion.content.clone(),
                completion.tool_calls.clone(),
            ));

            for call in &completion.tool_calls {
                let name = call.function.name.as_str();
                let arguments = call.function.arguments.as_str();
                self.event_handler
                    .on_event(&AgentEvent::ToolExecuting { name, arguments });

                let result = self.tools.execute(name, arguments).await?;

                self.event_handler.on_event(&AgentEvent::ToolResult {
                    name,
                    call_id: &call.id,
                    result: &result,
                });
                messages.push(Message::tool_result(&call.id, result));
            }

            self.transition(AgentState::Thinking);
        }

        self.event_handler
            .on_event(&AgentEvent::IterationLimitReached { max_iterations });
        Err(QueryError::MaxIterations {
            limit: max_iterations,
        })
    }

    fn transition(&mut self, to: AgentState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!("Agent state {from:?} -> {to:?}");
        self.state = to;
        self.event_handler
            .on_event(&AgentEvent::StateChanged { from, to });
    }
}

fn non_empty_tools(defs: &[ToolDef]) -> Option<Vec<ToolDef>> {
    if defs.is_empty() {
        None
    } else {
        Some(defs.to_vec())
    }
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(80).collect();
    if text.chars().count() > 80 {
        format!("{head}...")
    } else {
        head
    }
}
