//! Desk configuration: the session template and startup settings.
//!
//! [`Template`] is the `template.json` document naming the indexes a session
//! serves. [`DeskConfig`] holds everything else the front end decides at
//! startup and turns both into juris-rs types via
//! [`build_registry`](DeskConfig::build_registry) and
//! [`build_agent_config`](DeskConfig::build_agent_config).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use juris_rs::agent::config::{AgentConfig, DEFAULT_MAX_ITERATIONS};
use juris_rs::api::generation::TextGenerator;
use juris_rs::index::KeywordIndex;
use juris_rs::query::execute::DEFAULT_CONCURRENCY;
use juris_rs::tools::document::{DEFAULT_TOP_K, DocumentTool, RetrieverQueryEngine, ToolDescriptor};
use juris_rs::tools::registry::ToolRegistry;
use juris_rs::QueryError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::prompt::attorney_system_prompt;

/// Directory the index names are resolved against unless overridden.
pub const DEFAULT_INDEX_ROOT: &str = "RAG Generator/";

/// Appended to every index summary to form its tool description.
const DESCRIPTION_SUFFIX: &str = "Properly frame question as it will match relevance to compute answer.";

/// The session template: which indexes to load and how to present them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub title: String,
    /// Index directory names, also used as tool names.
    pub index_names: Vec<String>,
    /// One summary per index, same order as `index_names`.
    pub summaries: Vec<String>,
    /// Model for the agent and every generation call.
    pub model_choice: String,
}

impl Template {
    /// Read and validate a template file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("cannot read template {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let template: Template = serde_json::from_str(raw)
            .map_err(|e| QueryError::configuration(format!("malformed template: {e}")))?;
        template.validate()?;
        Ok(template)
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.index_names.is_empty() {
            return Err(QueryError::configuration("template lists no indexes"));
        }
        if self.index_names.len() != self.summaries.len() {
            return Err(QueryError::configuration(format!(
                "template has {} index name(s) but {} summar{}",
                self.index_names.len(),
                self.summaries.len(),
                if self.summaries.len() == 1 { "y" } else { "ies" }
            )));
        }
        if self.model_choice.trim().is_empty() {
            return Err(QueryError::configuration("template model_choice is empty"));
        }
        Ok(())
    }

    /// `(index name, summary)` pairs in template order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.index_names
            .iter()
            .map(String::as_str)
            .zip(self.summaries.iter().map(String::as_str))
    }
}

/// Tool description shown to the decomposer for an index summary.
pub fn tool_description(summary: &str) -> String {
    format!("{} {DESCRIPTION_SUFFIX}", summary.trim_end())
}

/// Startup settings for a desk session.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// Directory holding one subdirectory per index. Default: `"RAG Generator/"`.
    pub index_root: PathBuf,
    /// Agent iteration budget. Default: `10`.
    pub max_iterations: u32,
    /// Sub-questions answered at once. Default: `4`.
    pub concurrency: usize,
    /// Retries for transient provider failures. Default: `2`.
    pub retries: u32,
    /// Passages retrieved per sub-question. Default: `3`.
    pub top_k: usize,
    /// Replacement decomposition example.
    pub example_file: Option<PathBuf>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            index_root: PathBuf::from(DEFAULT_INDEX_ROOT),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            concurrency: DEFAULT_CONCURRENCY,
            retries: 2,
            top_k: DEFAULT_TOP_K,
            example_file: None,
        }
    }
}

impl DeskConfig {
    /// Load every template index and wrap each in a [`DocumentTool`].
    pub fn build_registry(
        &self,
        template: &Template,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<ToolRegistry, QueryError> {
        let mut registry = ToolRegistry::new();
        for (name, summary) in template.entries() {
            let index = KeywordIndex::load(self.index_root.join(name))?;
            info!("Loaded index '{name}' ({} passages)", index.len());
            let engine = RetrieverQueryEngine::new(Arc::new(index), generator.clone())
                .with_top_k(self.top_k);
            registry.register(DocumentTool::new(
                ToolDescriptor::new(name, tool_description(summary)),
                engine,
            ))?;
        }
        Ok(registry)
    }

    pub fn build_agent_config(&self, template: &Template) -> AgentConfig {
        AgentConfig::new(template.model_choice.clone(), attorney_system_prompt())
            .with_max_iterations(self.max_iterations)
            .with_retries(self.retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use juris_rs::api::generation::FnGenerator;
    use juris_rs::ErrorKind;

    const TEMPLATE: &str = r#"{
        "title": "Desk",
        "index_names": ["ActA", "ActB"],
        "summaries": ["About A.", "About B."],
        "model_choice": "openai/gpt-4"
    }"#;

    fn write_index(root: &Path, name: &str, passages: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("passages.json"), passages).unwrap();
    }

    fn generator() -> Arc<dyn TextGenerator> {
        Arc::new(FnGenerator::new(|_, _| Ok("answer".into())))
    }

    #[test]
    fn parses_valid_template() {
        let template = Template::parse(TEMPLATE).unwrap();
        assert_eq!(template.title, "Desk");
        let entries: Vec<_> = template.entries().collect();
        assert_eq!(entries, vec![("ActA", "About A."), ("ActB", "About B.")]);
    }

    #[test]
    fn rejects_invalid_templates() {
        for raw in [
            "not json",
            r#"{"title": "t", "index_names": [], "summaries": [], "model_choice": "m"}"#,
            r#"{"title": "t", "index_names": ["a", "b"], "summaries": ["x"], "model_choice": "m"}"#,
            r#"{"title": "t", "index_names": ["a"], "summaries": ["x"], "model_choice": " "}"#,
            r#"{"title": "t", "index_names": ["a"], "summaries": ["x"]}"#,
        ] {
            let err = Template::parse(raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{raw}");
        }
    }

    #[test]
    fn missing_template_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Template::load(dir.path().join("template.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn description_appends_framing_hint() {
        assert_eq!(
            tool_description("About A. "),
            "About A. Properly frame question as it will match relevance to compute answer."
        );
    }

    #[test]
    fn builds_registry_in_template_order() {
        let root = tempfile::tempdir().unwrap();
        write_index(root.path(), "ActA", r#"[{"text": "Section 1 of Act A."}]"#);
        write_index(root.path(), "ActB", r#"[{"text": "Section 1 of Act B.", "source": "s. 1"}]"#);

        let config = DeskConfig {
            index_root: root.path().to_path_buf(),
            ..Default::default()
        };
        let template = Template::parse(TEMPLATE).unwrap();
        let registry = config.build_registry(&template, generator()).unwrap();

        let names: Vec<String> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["ActA", "ActB"]);
        assert!(registry.get("ActA").unwrap().descriptor().description.starts_with("About A. "));
    }

    #[test]
    fn missing_index_directory_fails_startup() {
        let root = tempfile::tempdir().unwrap();
        write_index(root.path(), "ActA", r#"[{"text": "Section 1 of Act A."}]"#);

        let config = DeskConfig {
            index_root: root.path().to_path_buf(),
            ..Default::default()
        };
        let template = Template::parse(TEMPLATE).unwrap();
        let err = config.build_registry(&template, generator()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn agent_config_uses_template_model() {
        let config = DeskConfig {
            max_iterations: 4,
            retries: 1,
            ..Default::default()
        };
        let agent = config.build_agent_config(&Template::parse(TEMPLATE).unwrap());
        assert_eq!(agent.model, "openai/gpt-4");
        assert_eq!(agent.max_iterations, 4);
        assert_eq!(agent.retry.max_retries, 1);
        assert!(agent.system_prompt.contains("insurance attorney"));
    }
}
