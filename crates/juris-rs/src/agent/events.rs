//! Events, handlers, and run results for the [`Orchestrator`](super::orchestrator::Orchestrator).
//!
//! The orchestrator reports every step of a run through [`AgentEvent`]
//! variants. Callers implement [`EventHandler`] to observe them for logging,
//! terminal rendering or tests.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or fire-and-forget runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use serde::Serialize;
use tracing::{debug, info, warn};

use super::orchestrator::AgentState;
use crate::query::types::FinalAnswer;

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the orchestrator during a run.
#[derive(Debug)]
pub enum AgentEvent<'a> {
    /// The run moved between states.
    StateChanged { from: AgentState, to: AgentState },
    /// A new iteration (one chat completion) is starting.
    IterationStart { iteration: u32, max_iterations: u32 },
    /// The model returned text (may be alongside tool calls).
    Text(&'a str),
    /// The model is requesting tool calls this iteration.
    ToolCallsReceived { iteration: u32, count: usize },
    /// A single tool is about to be executed.
    ToolExecuting { name: &'a str, arguments: &'a str },
    /// A single tool finished executing.
    ToolResult {
        name: &'a str,
        call_id: &'a str,
        result: &'a str,
    },
    /// Token usage reported by the API for this iteration.
    TokenUsage {
        prompt_tokens: u32,
        completion_tokens: u32,
    },
    /// The model returned neither text nor tool calls.
    EmptyResponse { iteration: u32 },
    /// The agent produced its final answer.
    Finished,
    /// The agent hit the iteration limit without finishing.
    IterationLimitReached { max_iterations: u32 },
}

/// Observer of [`AgentEvent`]s. The default implementation ignores them.
///
/// ```ignore
/// struct Printer;
///
/// impl EventHandler for Printer {
///     fn on_event(&self, event: &AgentEvent<'_>) {
///         if let AgentEvent::ToolExecuting { name, .. } = event {
///             eprintln!("consulting {name}...");
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &AgentEvent<'_>) {
        let _ = event;
    }
}

/// A handler that ignores every event.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let AgentEvent::Text(text) = event {
///         println!("{text}");
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&AgentEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&AgentEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&AgentEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &AgentEvent<'_>) {
        (self.0)(event)
    }
}

/// Dispatches each event to several handlers in registration order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with_if(show_progress, ProgressHandler);
/// ```
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Add a handler to the chain.
    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Add a handler only when `condition` holds.
    pub fn with_if(self, condition: bool, handler: impl EventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &AgentEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// An event handler that logs events via `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &AgentEvent<'_>) {
        match event {
            AgentEvent::StateChanged { from, to } => {
                debug!("State: {from:?} -> {to:?}");
            }
            AgentEvent::IterationStart {
                iteration,
                max_iterations,
            } => {
                info!("[iteration {iteration}/{max_iterations}]");
            }
            AgentEvent::Text(text) => {
                let preview: String = text.chars().take(200).collect();
                debug!(
                    "LLM text: {preview}{}",
                    if text.chars().count() > 200 { "..." } else { "" }
                );
            }
            AgentEvent::ToolCallsReceived { iteration, count } => {
                debug!("{count} tool call(s) in iteration {iteration}");
            }
            AgentEvent::ToolExecuting { name, .. } => {
                debug!("Executing tool: {name}");
            }
            AgentEvent::ToolResult { name, result, .. } => {
                debug!("Tool {name} result: {} bytes", result.len());
            }
            AgentEvent::TokenUsage {
                prompt_tokens,
                completion_tokens,
            } => {
                debug!("Tokens: prompt={prompt_tokens}, completion={completion_tokens}");
            }
            AgentEvent::EmptyResponse { iteration } => {
                warn!("Empty API response at iteration {iteration} (no content, no tool calls)");
            }
            AgentEvent::Finished => {
                info!("Agent finished (no more tool calls)");
            }
            AgentEvent::IterationLimitReached { max_iterations } => {
                warn!("Agent hit iteration limit ({max_iterations})");
            }
        }
    }
}

// ── Run result ─────────────────────────────────────────────────────

/// The result of a completed agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    /// Unique trace ID for this run.
    pub trace_id: String,
    /// The final answer text.
    pub text: String,
    /// Number of chat completions made.
    pub iterations_used: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    /// Answers the Master Index produced during the run, in call order.
    pub retrievals: Vec<FinalAnswer>,
}

impl AgentResponse {
    /// Total tokens (prompt + completion).
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn composite_dispatches_to_all_handlers() {
        static HITS: AtomicU32 = AtomicU32::new(0);
        let handler = CompositeEventHandler::new()
            .with(NoopHandler)
            .with(FnEventHandler::new(|_| {
                HITS.fetch_add(1, Ordering::SeqCst);
            }))
            .with_if(false, FnEventHandler::new(|_| panic!("disabled handler called")))
            .with(LoggingHandler);

        handler.on_event(&AgentEvent::Finished);
        handler.on_event(&AgentEvent::Text("hello"));
        assert_eq!(HITS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fn_handler_sees_event_payloads() {
        let names = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = names.clone();
        let handler = FnEventHandler::new(move |event| {
            if let AgentEvent::ToolExecuting { name, .. } = event {
                sink.lock().unwrap().push(name.to_string());
            }
        });
        handler.on_event(&AgentEvent::ToolExecuting {
            name: "Index",
            arguments: "{}",
        });
        assert_eq!(*names.lock().unwrap(), vec!["Index"]);
    }

    #[test]
    fn response_total_tokens() {
        let response = AgentResponse {
            trace_id: "tr-1".into(),
            text: "done".into(),
            iterations_used: 1,
            prompt_tokens: 10,
            completion_tokens: 5,
            retrievals: Vec::new(),
        };
        assert_eq!(response.total_tokens(), 15);
    }
}
