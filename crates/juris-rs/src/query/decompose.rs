//! Question decomposition: one user question into tool-tagged sub-questions.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use super::prompt::{DecompositionExample, DecompositionPromptParams, render_decomposition_prompt};
use super::types::{SubQuestion, SubQuestionList};
use crate::api::generation::TextGenerator;
use crate::tools::document::ToolDescriptor;
use crate::{QueryError, json_schema_for};

/// Asks the generator to split a question across the available tools.
pub struct QuestionDecomposer {
    generator: Arc<dyn TextGenerator>,
    example: DecompositionExample,
    schema: serde_json::Value,
}

impl QuestionDecomposer {
    /// Decomposer using the bundled worked example.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self, QueryError> {
        Ok(Self::with_example(generator, DecompositionExample::builtin()?))
    }

    pub fn with_example(generator: Arc<dyn TextGenerator>, example: DecompositionExample) -> Self {
        Self {
            generator,
            example,
            schema: json_schema_for::<SubQuestionList>(),
        }
    }

    pub fn example(&self) -> &DecompositionExample {
        &self.example
    }

    /// Produce sub-questions for `question`, each naming a tool in `tools`.
    ///
    /// Fails with [`QueryError::Decomposition`] when `tools` is empty or has
    /// duplicate names (checked before generating), when the output is not
    /// a valid list, when the list is empty, or when it names an unknown tool.
    pub async fn decompose(
        &self,
        question: &str,
        tools: &[ToolDescriptor],
    ) -> Result<Vec<SubQuestion>, QueryError> {
        check_tools(tools)?;

        let prompt = render_decomposition_prompt(&DecompositionPromptParams {
            example: &self.example,
            tools,
            question,
        });
        let schema_hint = serde_json::to_string(&self.schema)
            .map_err(|e| QueryError::decomposition(format!("cannot encode schema: {e}")))?;

        debug!(
            "Decomposing over {} tool(s), prompt {} bytes",
            tools.len(),
            prompt.len()
        );
        let raw = self.generator.generate(&prompt, Some(&schema_hint)).await?;

        let sub_questions = parse_sub_questions(&raw, &self.schema)?;
        if let Some(unknown) = sub_questions
            .iter()
            .find(|sq| !tools.iter().any(|t| t.name == sq.tool_name))
        {
            return Err(QueryError::decomposition(format!(
                "sub-question {:?} routed to unknown tool '{}'",
                unknown.question, unknown.tool_name
            )));
        }

        info!("Generated {} sub-question(s)", sub_questions.len());
        for sq in &sub_questions {
            info!("[{}] Q: {}", sq.tool_name, sq.question);
        }
        Ok(sub_questions)
    }
}

fn check_tools(tools: &[ToolDescriptor]) -> Result<(), QueryError> {
    if tools.is_empty() {
        return Err(QueryError::decomposition("no tools available"));
    }
    let mut seen = HashSet::new();
    for tool in tools {
        if !seen.insert(tool.name.as_str()) {
            return Err(QueryError::decomposition(format!(
                "duplicate tool name '{}'",
                tool.name
            )));
        }
    }
    Ok(())
}

/// Parse model output into sub-questions.
///
/// Accepts the `{"items": [...]}` envelope or a bare list, optionally inside
/// a markdown code fence, with `question` accepted for `sub_question`.
pub fn parse_sub_questions(
    raw: &str,
    schema: &serde_json::Value,
) -> Result<Vec<SubQuestion>, QueryError> {
    let body = strip_code_fence(raw);
    let mut value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| QueryError::decomposition(format!("output is not valid JSON: {e}")))?;

    if value.is_array() {
        value = serde_json::json!({ "items": value });
    }
    if let Some(items) = value.get_mut("items").and_then(|v| v.as_array_mut()) {
        for item in items.iter_mut().filter_map(|i| i.as_object_mut()) {
            if !item.contains_key("sub_question")
                && let Some(q) = item.remove("question")
            {
                item.insert("sub_question".to_string(), q);
            }
        }
    }

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| QueryError::decomposition(format!("invalid output schema: {e}")))?;
    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| format!("{}: {e}", e.instance_path()))
        .collect();
    if !errors.is_empty() {
        return Err(QueryError::decomposition(format!(
            "output does not match schema: {}",
            errors.join("; ")
        )));
    }

    let list: SubQuestionList = serde_json::from_value(value)
        .map_err(|e| QueryError::decomposition(format!("malformed sub-questions: {e}")))?;
    if list.items.is_empty() {
        return Err(QueryError::decomposition("no sub-questions generated"));
    }
    if let Some(blank) = list.items.iter().find(|sq| sq.question.trim().is_empty()) {
        return Err(QueryError::decomposition(format!(
            "empty sub-question for tool '{}'",
            blank.tool_name
        )));
    }
    Ok(list.items)
}

/// Return the contents of the first fenced code block, or the trimmed input.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = trimmed.get(start + 3..).unwrap_or_default();
    // Skip the info string ("json") up to the end of the line.
    let body = match after.find('\n') {
        Some(nl) => after.get(nl + 1..).unwrap_or_default(),
        None => after,
    };
    match body.find("```") {
        Some(end) => body.get(..end).unwrap_or(body).trim(),
        None => body.trim(),
    }
}
