//! Configuration for the [`Orchestrator`](super::orchestrator::Orchestrator).
//!
//! ```ignore
//! let config = AgentConfig::new("openai/gpt-4", "You are a seasoned insurance attorney...")
//!     .with_max_iterations(6)
//!     .with_temperature(0.1)
//!     .with_retries(3);
//! ```

use crate::api::retry::RetryConfig;

/// Default iteration budget for one agent run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Default number of past exchanges kept in a session.
pub const DEFAULT_HISTORY_TURNS: usize = 10;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub system_prompt: String,
    /// Chat completions allowed before the run fails.
    pub max_iterations: u32,
    pub max_tokens: u32,
    pub temperature: f32,
    pub retry: RetryConfig,
    /// Past user/assistant exchanges replayed to the model on each run.
    pub history_turns: usize,
}

impl AgentConfig {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.retry = RetryConfig::with_retries(max_retries);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: crate::DEFAULT_MODEL.to_string(),
            system_prompt: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tokens: 1024,
            temperature: 0.1,
            retry: RetryConfig::default(),
            history_turns: DEFAULT_HISTORY_TURNS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AgentConfig::new("test-model", "prompt");
        assert_eq!(config.model, "test-model");
        assert_eq!(config.system_prompt, "prompt");
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.history_turns, 10);
    }

    #[test]
    fn builder_chain() {
        let config = AgentConfig::new("m", "p")
            .with_max_iterations(3)
            .with_max_tokens(512)
            .with_temperature(0.0)
            .with_retries(2)
            .with_history_turns(0);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.history_turns, 0);
    }
}
