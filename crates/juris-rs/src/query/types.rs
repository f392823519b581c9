//! Values flowing through one decomposition run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A narrower question answerable by exactly one document tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubQuestion {
    /// The question to put to the tool.
    #[serde(rename = "sub_question", alias = "question")]
    pub question: String,
    /// Name of the tool that should answer it.
    pub tool_name: String,
}

impl SubQuestion {
    pub fn new(question: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            tool_name: tool_name.into(),
        }
    }
}

/// The structured envelope the decomposer asks the model for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubQuestionList {
    /// Sub-questions in the order they should be answered.
    pub items: Vec<SubQuestion>,
}

/// A sub-question together with the answer its tool produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubAnswer {
    pub sub_question: SubQuestion,
    pub answer: String,
}

/// The composed answer to a user question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalAnswer {
    pub text: String,
    /// Sub-answers the text was composed from, in decomposition order.
    pub derived_from: Vec<SubAnswer>,
}

impl FinalAnswer {
    /// Distinct tool names cited, in first-appearance order.
    pub fn cited_tools(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for sub in &self.derived_from {
            let name = sub.sub_question.tool_name.as_str();
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_question_wire_form() {
        let sq = SubQuestion::new("What is covered?", "ESI Act");
        let json = serde_json::to_value(&sq).unwrap();
        assert_eq!(json["sub_question"], "What is covered?");
        assert_eq!(json["tool_name"], "ESI Act");

        let aliased: SubQuestion =
            serde_json::from_str(r#"{"question": "Q", "tool_name": "T"}"#).unwrap();
        assert_eq!(aliased, SubQuestion::new("Q", "T"));
    }

    #[test]
    fn cited_tools_are_distinct_and_ordered() {
        let answer = FinalAnswer {
            text: String::new(),
            derived_from: vec![
                SubAnswer {
                    sub_question: SubQuestion::new("q1", "B"),
                    answer: "a1".into(),
                },
                SubAnswer {
                    sub_question: SubQuestion::new("q2", "A"),
                    answer: "a2".into(),
                },
                SubAnswer {
                    sub_question: SubQuestion::new("q3", "B"),
                    answer: "a3".into(),
                },
            ],
        };
        assert_eq!(answer.cited_tools(), vec!["B", "A"]);
    }
}
