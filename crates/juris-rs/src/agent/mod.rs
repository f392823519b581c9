//! Agent runtime: the [`Orchestrator`] loop and its supporting modules.
//!
//! - [`orchestrator::Orchestrator`]: the tool-calling loop and its
//!   [`AgentState`] machine. Start here.
//! - [`config::AgentConfig`]: model, iteration budget, retries, history.
//! - [`events`]: [`EventHandler`] trait and [`AgentEvent`] enum for
//!   observing a run, plus [`AgentResponse`].
//! - [`session::Session`]: a conversation with bounded history whose only
//!   tool is the Master Index.

pub mod config;
pub mod events;
pub mod orchestrator;
pub mod session;

pub use config::AgentConfig;
pub use events::{
    AgentEvent, AgentResponse, CompositeEventHandler, EventHandler, FnEventHandler,
    LoggingHandler, NoopHandler,
};
pub use orchestrator::{AgentState, Orchestrator};
pub use session::Session;
