//! Document-backed tools.
//!
//! A [`DocumentTool`] pairs a [`ToolDescriptor`] with a [`QueryEngine`] that
//! answers questions restricted to one document. The stock engine,
//! [`RetrieverQueryEngine`], retrieves the best passages from a
//! [`RetrievalIndex`] and has the generator answer from them alone.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::generation::TextGenerator;
use crate::index::{Passage, RetrievalIndex};

/// Default number of passages retrieved per sub-question.
pub const DEFAULT_TOP_K: usize = 3;

/// Answer given when retrieval finds nothing relevant in the document.
pub const NO_PASSAGES_ANSWER: &str = "The document contains no passages relevant to this question.";

/// Name and natural-language description of a document tool. The
/// description is what the decomposer reads when routing sub-questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Boxed future returned by [`QueryEngine::answer`]. Errors are plain
/// messages; the executor attaches the tool name.
pub type AnswerFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

/// Answers a question about a single document.
pub trait QueryEngine: Send + Sync {
    fn answer<'a>(&'a self, question: &'a str) -> AnswerFuture<'a>;
}

/// A named, described capability answering questions about one document.
#[derive(Clone)]
pub struct DocumentTool {
    descriptor: ToolDescriptor,
    engine: Arc<dyn QueryEngine>,
}

impl DocumentTool {
    pub fn new(descriptor: ToolDescriptor, engine: impl QueryEngine + 'static) -> Self {
        Self {
            descriptor,
            engine: Arc::new(engine),
        }
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub async fn answer(&self, question: &str) -> Result<String, String> {
        self.engine.answer(question).await
    }
}

impl fmt::Debug for DocumentTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentTool")
            .field("name", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}

// ── RetrieverQueryEngine ───────────────────────────────────────────

/// Retrieve-then-synthesize engine over one [`RetrievalIndex`].
pub struct RetrieverQueryEngine {
    index: Arc<dyn RetrievalIndex>,
    generator: Arc<dyn TextGenerator>,
    top_k: usize,
}

impl RetrieverQueryEngine {
    pub fn new(index: Arc<dyn RetrievalIndex>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            index,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

impl fmt::Debug for RetrieverQueryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrieverQueryEngine")
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl QueryEngine for RetrieverQueryEngine {
    fn answer<'a>(&'a self, question: &'a str) -> AnswerFuture<'a> {
        Box::pin(async move {
            let passages = self
                .index
                .query(question, self.top_k)
                .await
                .map_err(|e| format!("retrieval failed: {e}"))?;
            debug!("Retrieved {} passage(s) for {question:?}", passages.len());

            if passages.is_empty() {
                return Ok(NO_PASSAGES_ANSWER.to_string());
            }

            let prompt = render_synthesis_prompt(question, &passages);
            self.generator
                .generate(&prompt, None)
                .await
                .map_err(|e| e.to_string())
        })
    }
}

/// Prompt asking the generator to answer strictly from retrieved passages.
pub fn render_synthesis_prompt(question: &str, passages: &[Passage]) -> String {
    let mut context = String::new();
    for (i, passage) in passages.iter().enumerate() {
        match &passage.source {
            Some(source) => context.push_str(&format!("[{}] ({source}) {}\n\n", i + 1, passage.text)),
            None => context.push_str(&format!("[{}] {}\n\n", i + 1, passage.text)),
        }
    }

    format!(
        "Context information from the document is below.\n\
         ---------------------\n\
         {}\n\
         ---------------------\n\
         Using only the context information and no prior knowledge, answer the question. \
         Cite the section or source label of each passage you rely on.\n\
         Question: {question}\n\
         Answer: ",
        context.trim_end()
    )
}
