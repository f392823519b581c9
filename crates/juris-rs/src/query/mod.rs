//! The sub-question workflow.
//!
//! ```text
//! question ──▶ QuestionDecomposer ──▶ [SubQuestion] ──▶ SubQuestionExecutor
//!                                                            │
//!          FinalAnswer ◀── AnswerComposer ◀── [SubAnswer] ◀──┘
//! ```
//!
//! [`SubQuestionQueryEngine`](engine::SubQuestionQueryEngine) wires the three
//! stages over one [`ToolRegistry`](crate::tools::registry::ToolRegistry);
//! [`IndexTool`](engine::IndexTool) offers it to the agent as the "Index" tool.

pub mod compose;
pub mod decompose;
pub mod engine;
pub mod execute;
pub mod prompt;
pub mod types;

pub use compose::AnswerComposer;
pub use decompose::QuestionDecomposer;
pub use engine::{IndexTool, SubQuestionQueryEngine};
pub use execute::SubQuestionExecutor;
pub use types::{FinalAnswer, SubAnswer, SubQuestion};
