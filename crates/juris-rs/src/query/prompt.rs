//! Prompt rendering for decomposition and composition.
//!
//! Prompts are built by plain functions over typed parameter structs. The
//! worked decomposition example is data: the bundled
//! `assets/decomposition_example.json` unless a replacement file is loaded.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{SubAnswer, SubQuestion, SubQuestionList};
use crate::QueryError;
use crate::tools::document::ToolDescriptor;

/// The bundled worked example.
pub const BUILTIN_EXAMPLE: &str = include_str!("../../assets/decomposition_example.json");

const DECOMPOSITION_PREAMBLE: &str = "Given a user question, and a list of tools, output a list of \
relevant sub-questions (don't ask generic questions about the document until the user question \
needs it) in json markdown that when composed can help answer the full user question:";

/// One worked decomposition: a question, the tools on offer and the
/// expected sub-questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionExample {
    pub question: String,
    pub tools: Vec<ToolDescriptor>,
    pub output: Vec<SubQuestion>,
}

impl DecompositionExample {
    /// The example compiled into the crate.
    pub fn builtin() -> Result<Self, QueryError> {
        Self::parse(BUILTIN_EXAMPLE)
    }

    /// Load a replacement example from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("cannot read example {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    /// Parse and check that every example sub-question names an example tool.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let example: Self = serde_json::from_str(raw)
            .map_err(|e| QueryError::configuration(format!("malformed decomposition example: {e}")))?;
        if example.tools.is_empty() || example.output.is_empty() {
            return Err(QueryError::configuration(
                "decomposition example needs at least one tool and one sub-question",
            ));
        }
        if let Some(stray) = example
            .output
            .iter()
            .find(|sq| !example.tools.iter().any(|t| t.name == sq.tool_name))
        {
            return Err(QueryError::configuration(format!(
                "decomposition example routes to unlisted tool '{}'",
                stray.tool_name
            )));
        }
        Ok(example)
    }
}

/// Render tool descriptors as a pretty JSON object `{name: description}`,
/// keeping the given order.
pub fn render_tools_json(descriptors: &[ToolDescriptor]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = descriptors
        .iter()
        .map(|d| (d.name.clone(), serde_json::Value::String(d.description.clone())))
        .collect();
    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
}

/// Inputs for [`render_decomposition_prompt`].
#[derive(Debug, Clone, Copy)]
pub struct DecompositionPromptParams<'a> {
    pub example: &'a DecompositionExample,
    pub tools: &'a [ToolDescriptor],
    pub question: &'a str,
}

pub fn render_decomposition_prompt(params: &DecompositionPromptParams<'_>) -> String {
    let example = params.example;
    let example_output = serde_json::to_string_pretty(&SubQuestionList {
        items: example.output.clone(),
    })
    .unwrap_or_else(|_| "{}".to_string());

    format!(
        "{preamble}\n\n\
         # Example 1\n\
         <Tools>\n\
         ```json\n{example_tools}\n```\n\n\
         <User Question>\n{example_question}\n\n\n\
         <Output>\n\
         ```json\n{example_output}\n```\n\n\
         # Example 2\n\
         <Tools>\n\
         ```json\n{tools}\n```\n\n\
         <User Question>\n{question}\n\n\
         <Output>\n",
        preamble = DECOMPOSITION_PREAMBLE,
        example_tools = render_tools_json(&example.tools),
        example_question = example.question,
        example_output = example_output,
        tools = render_tools_json(params.tools),
        question = params.question,
    )
}

/// Inputs for [`render_composition_prompt`].
#[derive(Debug, Clone, Copy)]
pub struct CompositionPromptParams<'a> {
    pub question: &'a str,
    pub sub_answers: &'a [SubAnswer],
}

pub fn render_composition_prompt(params: &CompositionPromptParams<'_>) -> String {
    let mut evidence = String::new();
    for (i, sub) in params.sub_answers.iter().enumerate() {
        evidence.push_str(&format!(
            "[{n}] Source: {tool}\nSub-question: {q}\nAnswer: {a}\n\n",
            n = i + 1,
            tool = sub.sub_question.tool_name,
            q = sub.sub_question.question,
            a = sub.answer.trim(),
        ));
    }

    format!(
        "You are composing the final answer to a legal question from answers retrieved \
         from individual legal sources.\n\n\
         Question: {question}\n\n\
         Retrieved answers:\n{evidence}\
         Write one coherent answer to the question. Attribute every claim to the source it \
         came from by naming that source, for example (Source: {example_tool}). Do not assert \
         anything the retrieved answers do not support; where they leave part of the question \
         open, say so.\n\n\
         Answer:",
        question = params.question,
        example_tool = params
            .sub_answers
            .first()
            .map_or("<source>", |s| s.sub_question.tool_name.as_str()),
    )
}
