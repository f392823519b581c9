//! The composite sub-question engine and the agent tool that exposes it.

use std::sync::{Arc, Mutex};

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use super::compose::AnswerComposer;
use super::decompose::QuestionDecomposer;
use super::execute::SubQuestionExecutor;
use super::types::FinalAnswer;
use crate::api::generation::TextGenerator;
use crate::tools::core::{Tool, ToolFuture, parse_tool_args};
use crate::tools::registry::ToolRegistry;
use crate::{QueryError, ToolDef, json_schema_for};

/// Name of the composite tool offered to the agent.
pub const INDEX_TOOL_NAME: &str = "Index";

/// Description of the composite tool offered to the agent.
pub const INDEX_TOOL_DESCRIPTION: &str = "This tool is the Master Index and the source for your \
answers. Add as much information about the query as possible so the tool excels.";

/// Decompose, execute and compose over one [`ToolRegistry`].
pub struct SubQuestionQueryEngine {
    registry: Arc<ToolRegistry>,
    decomposer: QuestionDecomposer,
    executor: SubQuestionExecutor,
    composer: AnswerComposer,
}

impl SubQuestionQueryEngine {
    /// Engine with the bundled decomposition example and default concurrency.
    pub fn new(
        registry: Arc<ToolRegistry>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self, QueryError> {
        Ok(Self {
            registry,
            decomposer: QuestionDecomposer::new(generator.clone())?,
            executor: SubQuestionExecutor::default(),
            composer: AnswerComposer::new(generator),
        })
    }

    /// Assemble from explicitly configured parts.
    pub fn from_parts(
        registry: Arc<ToolRegistry>,
        decomposer: QuestionDecomposer,
        executor: SubQuestionExecutor,
        composer: AnswerComposer,
    ) -> Self {
        Self {
            registry,
            decomposer,
            executor,
            composer,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer `question` from the registered documents.
    pub async fn query(&self, question: &str) -> Result<FinalAnswer, QueryError> {
        let sub_questions = self
            .decomposer
            .decompose(question, &self.registry.descriptors())
            .await?;
        let sub_answers = self.executor.execute(&sub_questions, &self.registry).await?;
        let answer = self.composer.compose(question, sub_answers).await?;
        info!(
            "Composed answer from {} source(s)",
            answer.cited_tools().len()
        );
        Ok(answer)
    }
}

// ── IndexTool ──────────────────────────────────────────────────────

/// Answers produced by an [`IndexTool`], shared with whoever built it.
#[derive(Debug, Clone, Default)]
pub struct AnswerLog {
    answers: Arc<Mutex<Vec<FinalAnswer>>>,
}

impl AnswerLog {
    fn record(&self, answer: FinalAnswer) {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push(answer);
        }
    }

    /// Take every recorded answer, oldest first.
    pub fn drain(&self) -> Vec<FinalAnswer> {
        self.answers
            .lock()
            .map(|mut answers| std::mem::take(&mut *answers))
            .unwrap_or_default()
    }
}

/// Arguments of the composite tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexArgs {
    /// The full question to research, with all relevant facts from the conversation.
    pub input: String,
}

/// Agent-facing wrapper around a [`SubQuestionQueryEngine`].
pub struct IndexTool {
    engine: Arc<SubQuestionQueryEngine>,
    log: AnswerLog,
}

impl IndexTool {
    pub fn new(engine: Arc<SubQuestionQueryEngine>) -> Self {
        Self {
            engine,
            log: AnswerLog::default(),
        }
    }

    /// Handle for collecting the answers this tool produces.
    pub fn answer_log(&self) -> AnswerLog {
        self.log.clone()
    }
}

impl Tool for IndexTool {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            INDEX_TOOL_NAME,
            INDEX_TOOL_DESCRIPTION,
            json_schema_for::<IndexArgs>(),
        )
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let args = parse_tool_args::<IndexArgs>(arguments);
        Box::pin(async move {
            let args = match args {
                Ok(a) => a,
                Err(e) => return Ok(e),
            };
            let answer = self.engine.query(&args.input).await?;
            let text = answer.text.clone();
            self.log.record(answer);
            Ok(text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::generation::FnGenerator;
    use crate::tools::document::{AnswerFuture, DocumentTool, QueryEngine, ToolDescriptor};

    struct Fixed(&'static str);

    impl QueryEngine for Fixed {
        fn answer<'a>(&'a self, _question: &'a str) -> AnswerFuture<'a> {
            let text = self.0.to_string();
            Box::pin(async move { Ok(text) })
        }
    }

    /// Stub generator: decomposes to one sub-question per tool and composes
    /// by echoing the sub-answers it was shown.
    fn scripted() -> Arc<dyn TextGenerator> {
        Arc::new(FnGenerator::new(|prompt, hint| {
            if hint.is_some() {
                Ok(r#"```json
{"items": [
  {"sub_question": "What does A say?", "tool_name": "ToolA"},
  {"sub_question": "What does B say?", "tool_name": "ToolB"}
]}
```"#
                    .into())
            } else {
                let a = prompt.contains("Answer: alpha");
                let b = prompt.contains("Answer: beta");
                Ok(format!("A={a} B={b}"))
            }
        }))
    }

    fn registry() -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::from_tools(vec![
                DocumentTool::new(ToolDescriptor::new("ToolA", "Covers topic A"), Fixed("alpha")),
                DocumentTool::new(ToolDescriptor::new("ToolB", "Covers topic B"), Fixed("beta")),
            ])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn end_to_end_across_two_tools() {
        let engine = SubQuestionQueryEngine::new(registry(), scripted()).unwrap();
        let answer = engine.query("Compare A and B").await.unwrap();

        assert!(answer.text.starts_with("A=true B=true"));
        assert!(answer.text.contains(
            "Sources:\n- ToolA\n  - q: What does A say?\n    a: alpha\n- ToolB"
        ));
        assert_eq!(answer.cited_tools(), vec!["ToolA", "ToolB"]);
        let answers: Vec<&str> = answer.derived_from.iter().map(|s| s.answer.as_str()).collect();
        assert_eq!(answers, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn employer_transplant_question_cites_both_laws() {
        let registry = Arc::new(
            ToolRegistry::from_tools(vec![
                DocumentTool::new(
                    ToolDescriptor::new("ToolA", "insurance law"),
                    Fixed("Insurers must cover hospitalisation under group policies."),
                ),
                DocumentTool::new(
                    ToolDescriptor::new("ToolB", "organ transplant law"),
                    Fixed("Transplants require authorisation committee approval."),
                ),
            ])
            .unwrap(),
        );
        // The composer stub ignores the evidence entirely.
        let generator: Arc<dyn TextGenerator> = Arc::new(FnGenerator::new(|_, hint| {
            if hint.is_some() {
                Ok(r#"[
                    {"sub_question": "Does employer-sponsored insurance cover transplants?", "tool_name": "ToolA"},
                    {"sub_question": "What approvals does a transplant need?", "tool_name": "ToolB"}
                ]"#
                .into())
            } else {
                Ok("Summary.".into())
            }
        }));
        let engine = SubQuestionQueryEngine::new(registry, generator).unwrap();

        let answer = engine
            .query("Does my employer-sponsored health insurance cover an organ transplant?")
            .await
            .unwrap();

        let a = answer.text.find("- ToolA").unwrap();
        let fact_a = answer
            .text
            .find("Insurers must cover hospitalisation under group policies.")
            .unwrap();
        let b = answer.text.find("- ToolB").unwrap();
        let fact_b = answer
            .text
            .find("Transplants require authorisation committee approval.")
            .unwrap();
        assert!(a < fact_a && fact_a < b && b < fact_b, "{}", answer.text);
    }

    #[tokio::test]
    async fn index_tool_returns_text_and_logs_answer() {
        let engine = Arc::new(SubQuestionQueryEngine::new(registry(), scripted()).unwrap());
        let tool = IndexTool::new(engine);
        let log = tool.answer_log();

        assert_eq!(tool.name(), INDEX_TOOL_NAME);
        let text = tool.execute(r#"{"input": "Compare A and B"}"#).await.unwrap();
        assert!(text.starts_with("A=true B=true"));

        let logged = log.drain();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].text, text);
        assert!(log.drain().is_empty());
    }

    #[tokio::test]
    async fn index_tool_reports_bad_arguments_to_the_model() {
        let engine = Arc::new(SubQuestionQueryEngine::new(registry(), scripted()).unwrap());
        let tool = IndexTool::new(engine);
        let text = tool.execute(r#"{"query": "wrong key"}"#).await.unwrap();
        assert!(text.starts_with("Error: invalid tool arguments"));
    }

    #[tokio::test]
    async fn pipeline_errors_propagate() {
        let generator: Arc<dyn TextGenerator> = Arc::new(FnGenerator::new(|_, _| {
            Ok(r#"[{"sub_question": "q", "tool_name": "ToolZ"}]"#.into())
        }));
        let engine = SubQuestionQueryEngine::new(registry(), generator).unwrap();
        let err = engine.query("q").await.unwrap_err();
        assert!(matches!(err, QueryError::Decomposition(_)));
    }
}
