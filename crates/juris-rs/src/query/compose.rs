//! Answer composition.

use std::sync::Arc;

use tracing::debug;

use super::prompt::{CompositionPromptParams, render_composition_prompt};
use super::types::{FinalAnswer, SubAnswer};
use crate::QueryError;
use crate::api::generation::TextGenerator;

/// Returned when there is nothing to compose from.
pub const NO_BASIS_ANSWER: &str =
    "No retrievable basis was found in the available sources to answer this question.";

/// Synthesizes one cited answer from ordered sub-answers.
pub struct AnswerComposer {
    generator: Arc<dyn TextGenerator>,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Compose the final answer. The generated text is followed by a
    /// `Sources:` footer listing each tool with the sub-questions it answered
    /// and its answers.
    ///
    /// With no sub-answers the generator is not called and the answer says
    /// no basis was found.
    pub async fn compose(
        &self,
        question: &str,
        sub_answers: Vec<SubAnswer>,
    ) -> Result<FinalAnswer, QueryError> {
        if sub_answers.is_empty() {
            return Ok(FinalAnswer {
                text: NO_BASIS_ANSWER.to_string(),
                derived_from: Vec::new(),
            });
        }

        let prompt = render_composition_prompt(&CompositionPromptParams {
            question,
            sub_answers: &sub_answers,
        });
        debug!(
            "Composing from {} sub-answer(s), prompt {} bytes",
            sub_answers.len(),
            prompt.len()
        );
        let body = self.generator.generate(&prompt, None).await?;

        let mut answer = FinalAnswer {
            text: String::new(),
            derived_from: sub_answers,
        };
        answer.text = format!("{}{}", body.trim_end(), sources_footer(&answer));
        Ok(answer)
    }
}

/// Deterministic citation footer for a composed answer. Every sub-answer is
/// quoted under the tool that produced it.
///
/// ```text
///
///
/// Sources:
/// - Insurance Act, 1938
///   - q: What must an insurer deposit?
///     a: A deposit with the Reserve Bank under section 7.
/// ```
pub fn sources_footer(answer: &FinalAnswer) -> String {
    let mut footer = String::from("\n\nSources:");
    for tool in answer.cited_tools() {
        footer.push_str("\n- ");
        footer.push_str(tool);
        for sub in answer
            .derived_from
            .iter()
            .filter(|s| s.sub_question.tool_name == tool)
        {
            footer.push_str("\n  - q: ");
            footer.push_str(&sub.sub_question.question);
            footer.push_str("\n    a: ");
            let mut lines = sub.answer.trim().lines();
            footer.push_str(lines.next().unwrap_or_default());
            for line in lines {
                footer.push_str("\n       ");
                footer.push_str(line);
            }
        }
    }
    footer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenerateError;
    use crate::api::generation::FnGenerator;
    use crate::query::types::SubQuestion;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sub(q: &str, tool: &str, a: &str) -> SubAnswer {
        SubAnswer {
            sub_question: SubQuestion::new(q, tool),
            answer: a.into(),
        }
    }

    #[tokio::test]
    async fn empty_input_skips_generation() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let composer = AnswerComposer::new(Arc::new(FnGenerator::new(move |_, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok("should not happen".into())
        })));

        let answer = composer.compose("Anything?", Vec::new()).await.unwrap();
        assert_eq!(answer.text, NO_BASIS_ANSWER);
        assert!(answer.derived_from.is_empty());
        assert!(!answer.text.contains("Sources:"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn appends_grouped_sources() {
        let composer = AnswerComposer::new(Arc::new(FnGenerator::new(|prompt, _| {
            assert!(prompt.contains("[2] Source: ToolB"));
            Ok("Combined answer.\n".into())
        })));
        let subs = vec![
            sub("q1", "ToolA", "a1"),
            sub("q2", "ToolB", "b1"),
            sub("q3", "ToolA", "a2"),
        ];

        let answer = composer.compose("Compare", subs.clone()).await.unwrap();
        assert_eq!(
            answer.text,
            "Combined answer.\n\nSources:\n\
             - ToolA\n  - q: q1\n    a: a1\n  - q: q3\n    a: a2\n\
             - ToolB\n  - q: q2\n    a: b1"
        );
        assert_eq!(answer.derived_from, subs);
    }

    #[test]
    fn footer_indents_multiline_answers() {
        let answer = FinalAnswer {
            text: String::new(),
            derived_from: vec![sub("q", "ToolA", "line one\nline two\n")],
        };
        assert_eq!(
            sources_footer(&answer),
            "\n\nSources:\n- ToolA\n  - q: q\n    a: line one\n       line two"
        );
    }

    #[tokio::test]
    async fn generation_failure_surfaces() {
        let composer = AnswerComposer::new(Arc::new(FnGenerator::new(|_, _| {
            Err(GenerateError::Content("refused".into()))
        })));
        let err = composer
            .compose("q", vec![sub("q", "ToolA", "a")])
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Upstream(_)));
    }
}
