//! Tools at two levels.
//!
//! - [`core`]: the agent-facing [`Tool`](core::Tool) trait and
//!   [`ToolSet`](core::ToolSet) dispatcher used by the orchestrator.
//! - [`document`]: [`DocumentTool`](document::DocumentTool), one per
//!   document index, and the retrieve-then-synthesize engine behind it.
//! - [`registry`]: the ordered, name-unique
//!   [`ToolRegistry`](registry::ToolRegistry) of document tools for a session.

pub mod core;
pub mod document;
pub mod registry;
