//! Retrieval over a single document collection.
//!
//! [`RetrievalIndex`] is the port a [`RetrieverQueryEngine`](crate::tools::document::RetrieverQueryEngine)
//! reads from. [`keyword::KeywordIndex`] is the bundled in-memory
//! implementation loaded from an index directory.

pub mod keyword;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;

pub use keyword::KeywordIndex;

/// One ranked retrieval hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub text: String,
    pub score: f32,
    /// Where the passage came from, e.g. a section number or page label.
    pub source: Option<String>,
}

/// Boxed future returned by [`RetrievalIndex::query`].
pub type RetrieveFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Passage>, String>> + Send + 'a>>;

/// A searchable document index.
pub trait RetrievalIndex: Send + Sync {
    /// Return at most `top_k` passages, best first.
    fn query<'a>(&'a self, question: &'a str, top_k: usize) -> RetrieveFuture<'a>;
}

impl<I: RetrievalIndex + ?Sized> RetrievalIndex for Arc<I> {
    fn query<'a>(&'a self, question: &'a str, top_k: usize) -> RetrieveFuture<'a> {
        (**self).query(question, top_k)
    }
}
