//! Sub-question dispatch.

use futures::{StreamExt, TryStreamExt, stream};
use tracing::debug;

use super::types::{SubAnswer, SubQuestion};
use crate::QueryError;
use crate::tools::registry::ToolRegistry;

/// Default number of sub-questions answered at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Runs each sub-question against its tool with bounded concurrency.
///
/// Answers come back in input order whatever order the tools finish in. The
/// first failure cancels every call still in flight and is returned alone.
#[derive(Debug, Clone, Copy)]
pub struct SubQuestionExecutor {
    concurrency: usize,
}

impl Default for SubQuestionExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl SubQuestionExecutor {
    /// `concurrency` of 1 (or 0) runs sub-questions strictly one at a time.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn execute(
        &self,
        sub_questions: &[SubQuestion],
        registry: &ToolRegistry,
    ) -> Result<Vec<SubAnswer>, QueryError> {
        // Resolve every tool up front so a bad name fails before any call.
        let jobs = sub_questions
            .iter()
            .map(|sq| {
                registry
                    .get(&sq.tool_name)
                    .cloned()
                    .map(|tool| (sq.clone(), tool))
                    .ok_or_else(|| QueryError::UnknownTool(sq.tool_name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Completion order is free so an early error short-circuits at once;
        // the index restores input order afterwards.
        let mut answers: Vec<(usize, SubAnswer)> = stream::iter(jobs.into_iter().enumerate())
            .map(|(i, (sq, tool))| async move {
                debug!("[{}] answering: {}", tool.name(), sq.question);
                let answer = tool
                    .answer(&sq.question)
                    .await
                    .map_err(|message| QueryError::tool_invocation(tool.name(), message))?;
                debug!("[{}] A: {}", tool.name(), answer);
                Ok::<_, QueryError>((
                    i,
                    SubAnswer {
                        sub_question: sq,
                        answer,
                    },
                ))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        answers.sort_by_key(|(i, _)| *i);
        Ok(answers.into_iter().map(|(_, answer)| answer).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::document::{AnswerFuture, DocumentTool, QueryEngine, ToolDescriptor};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers after a fixed delay, tracking peak concurrency.
    struct Delayed {
        delay: Duration,
        reply: Result<&'static str, &'static str>,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
    }

    impl QueryEngine for Delayed {
        fn answer<'a>(&'a self, question: &'a str) -> AnswerFuture<'a> {
            Box::pin(async move {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                self.finished.fetch_add(1, Ordering::SeqCst);
                self.reply
                    .map(|r| format!("{r}: {question}"))
                    .map_err(str::to_string)
            })
        }
    }

    struct Harness {
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                active: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
                finished: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn tool(&self, name: &str, ms: u64, reply: Result<&'static str, &'static str>) -> DocumentTool {
            DocumentTool::new(
                ToolDescriptor::new(name, name),
                Delayed {
                    delay: Duration::from_millis(ms),
                    reply,
                    active: self.active.clone(),
                    peak: self.peak.clone(),
                    finished: self.finished.clone(),
                },
            )
        }
    }

    #[tokio::test]
    async fn preserves_input_order_when_completion_order_differs() {
        let h = Harness::new();
        let registry = ToolRegistry::from_tools(vec![
            h.tool("Slow", 60, Ok("slow")),
            h.tool("Fast", 5, Ok("fast")),
        ])
        .unwrap();
        let subs = vec![
            SubQuestion::new("one", "Slow"),
            SubQuestion::new("two", "Fast"),
            SubQuestion::new("three", "Fast"),
        ];

        let answers = SubQuestionExecutor::new(3).execute(&subs, &registry).await.unwrap();
        let texts: Vec<&str> = answers.iter().map(|a| a.answer.as_str()).collect();
        assert_eq!(texts, vec!["slow: one", "fast: two", "fast: three"]);
        assert_eq!(answers[1].sub_question, subs[1]);
        assert!(h.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn concurrency_of_one_is_sequential() {
        let h = Harness::new();
        let registry = ToolRegistry::from_tools(vec![h.tool("A", 5, Ok("a"))]).unwrap();
        let subs: Vec<SubQuestion> = (0..4).map(|i| SubQuestion::new(format!("q{i}"), "A")).collect();

        let answers = SubQuestionExecutor::new(1).execute(&subs, &registry).await.unwrap();
        assert_eq!(answers.len(), 4);
        assert_eq!(h.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_failure_fails_the_batch() {
        let h = Harness::new();
        let registry = ToolRegistry::from_tools(vec![
            h.tool("Good", 200, Ok("good")),
            h.tool("Bad", 5, Err("index offline")),
        ])
        .unwrap();
        let subs = vec![
            SubQuestion::new("one", "Good"),
            SubQuestion::new("two", "Bad"),
            SubQuestion::new("three", "Good"),
        ];

        let err = SubQuestionExecutor::new(4).execute(&subs, &registry).await.unwrap_err();
        match err {
            QueryError::ToolInvocation { tool, message } => {
                assert_eq!(tool, "Bad");
                assert_eq!(message, "index offline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The slow calls were dropped, not awaited.
        assert_eq!(h.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_tool_fails_before_dispatch() {
        let h = Harness::new();
        let registry = ToolRegistry::from_tools(vec![h.tool("A", 1, Ok("a"))]).unwrap();
        let subs = vec![SubQuestion::new("q", "A"), SubQuestion::new("q", "Missing")];

        let err = SubQuestionExecutor::default().execute(&subs, &registry).await.unwrap_err();
        assert!(matches!(err, QueryError::UnknownTool(ref name) if name == "Missing"));
        assert_eq!(h.finished.load(Ordering::SeqCst), 0);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn execute_future_is_send() {
        // Tool futures must be Send, and the Master Index awaits this one inside its own.
        let h = Harness::new();
        let registry = ToolRegistry::from_tools(vec![h.tool("A", 1, Ok("a"))]).unwrap();
        let subs = vec![SubQuestion::new("q", "A")];
        let executor = SubQuestionExecutor::default();
        let fut = executor.execute(&subs, &registry);
        assert_send(&fut);
        assert_eq!(fut.await.unwrap()[0].answer, "a: q");
    }

    #[tokio::test]
    async fn empty_input_yields_no_answers() {
        let registry = ToolRegistry::new();
        let answers = SubQuestionExecutor::default().execute(&[], &registry).await.unwrap();
        assert!(answers.is_empty());
    }
}
