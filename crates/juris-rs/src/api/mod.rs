//! Everything between the pipeline and the language-model provider.
//!
//! - [`generation`]: the [`TextGenerator`](generation::TextGenerator) and
//!   [`ChatModel`](generation::ChatModel) ports, the OpenRouter-backed
//!   implementations and a retrying wrapper.
//! - [`retry`]: exponential backoff with jitter. Only
//!   [`GenerateError::Transient`](crate::GenerateError::Transient) failures
//!   are retried.
//! - [`tracing`]: per-run correlation ids.

pub mod generation;
pub mod retry;
pub mod tracing;

pub use generation::{
    ChatModel, FnGenerator, OpenRouterGenerator, RetryingGenerator, TextGenerator,
};
pub use retry::RetryConfig;
pub use tracing::generate_trace_id;
