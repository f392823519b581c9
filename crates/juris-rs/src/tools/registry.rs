//! The ordered set of document tools available to one session.

use std::collections::HashMap;

use super::document::{DocumentTool, ToolDescriptor};
use crate::QueryError;

/// Document tools keyed by unique name, iterated in registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<DocumentTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate names.
    pub fn from_tools(tools: impl IntoIterator<Item = DocumentTool>) -> Result<Self, QueryError> {
        tools
            .into_iter()
            .try_fold(Self::new(), |registry, tool| registry.with(tool))
    }

    /// Add a tool. A second tool with an existing name is a configuration error.
    pub fn register(&mut self, tool: DocumentTool) -> Result<(), QueryError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(QueryError::configuration("tool name must not be empty"));
        }
        if self.by_name.contains_key(&name) {
            return Err(QueryError::configuration(format!(
                "duplicate tool name '{name}'"
            )));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Register a tool (builder pattern).
    pub fn with(mut self, tool: DocumentTool) -> Result<Self, QueryError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&DocumentTool> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor().clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentTool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
