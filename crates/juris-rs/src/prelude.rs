//! Convenience re-exports for common `juris-rs` types.
//!
//! ```ignore
//! use juris_rs::prelude::*;
//! ```
//!
//! Covers what a typical front end needs to build a [`Session`]: the client
//! and generation ports, the document tool stack, the query engine and the
//! agent runtime. Prompt rendering and BM25 internals stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{
    ChatRequest, ErrorKind, GenerateError, Message, OpenRouterClient, QueryError, ToolDef,
    json_schema_for,
};

// ── Generation ──────────────────────────────────────────────────────
pub use crate::api::{
    ChatModel, FnGenerator, OpenRouterGenerator, RetryConfig, RetryingGenerator, TextGenerator,
};

// ── Retrieval and document tools ────────────────────────────────────
pub use crate::index::{KeywordIndex, Passage, RetrievalIndex};
pub use crate::tools::core::{Tool, ToolFuture, ToolSet, parse_tool_args};
pub use crate::tools::document::{DocumentTool, QueryEngine, RetrieverQueryEngine, ToolDescriptor};
pub use crate::tools::registry::ToolRegistry;

// ── Sub-question workflow ───────────────────────────────────────────
pub use crate::query::{
    AnswerComposer, FinalAnswer, IndexTool, QuestionDecomposer, SubAnswer, SubQuestion,
    SubQuestionExecutor, SubQuestionQueryEngine,
};

// ── Agent runtime ───────────────────────────────────────────────────
pub use crate::agent::{
    AgentConfig, AgentEvent, AgentResponse, AgentState, CompositeEventHandler, EventHandler,
    FnEventHandler, LoggingHandler, NoopHandler, Orchestrator, Session,
};
