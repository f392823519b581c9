//! A conversation with the agent.
//!
//! [`Session`] owns the chat model, the Master Index tool and a bounded
//! history of past exchanges. Each [`ask`](Session::ask) runs one
//! [`Orchestrator`] pass and records the exchange on success.

use std::sync::Arc;

use tracing::debug;

use super::config::AgentConfig;
use super::events::{AgentResponse, EventHandler};
use super::orchestrator::Orchestrator;
use crate::api::generation::ChatModel;
use crate::query::engine::{AnswerLog, IndexTool, SubQuestionQueryEngine};
use crate::tools::core::ToolSet;
use crate::tools::registry::ToolRegistry;
use crate::{Message, QueryError};

pub struct Session {
    chat: Arc<dyn ChatModel>,
    engine: Arc<SubQuestionQueryEngine>,
    tools: ToolSet,
    config: AgentConfig,
    answer_log: AnswerLog,
    history: Vec<Message>,
}

impl Session {
    /// Session whose only tool is the Master Index over `engine`.
    pub fn new(chat: Arc<dyn ChatModel>, engine: SubQuestionQueryEngine, config: AgentConfig) -> Self {
        let engine = Arc::new(engine);
        let index = IndexTool::new(engine.clone());
        let answer_log = index.answer_log();
        let tools = ToolSet::new().with_arg_validation(true).with(index);
        Self {
            chat,
            engine,
            tools,
            config,
            answer_log,
            history: Vec::new(),
        }
    }

    /// Answer `query` in the context of earlier exchanges.
    ///
    /// A failed run leaves the history untouched.
    pub async fn ask(
        &mut self,
        query: &str,
        handler: &dyn EventHandler,
    ) -> Result<AgentResponse, QueryError> {
        // Answers left over from a failed run belong to nobody.
        let stale = self.answer_log.drain();
        if !stale.is_empty() {
            debug!("Discarding {} stale index answer(s)", stale.len());
        }

        let mut orchestrator = Orchestrator::new(self.chat.as_ref(), &self.tools, &self.config)
            .with_event_handler(handler);
        let result = orchestrator.run(&self.history, query).await;
        let retrievals = self.answer_log.drain();

        let mut response = result?;
        response.retrievals = retrievals;

        self.history.push(Message::user(query));
        self.history.push(Message::assistant_text(&response.text));
        self.trim_history();
        Ok(response)
    }

    fn trim_history(&mut self) {
        let keep = self.config.history_turns.saturating_mul(2);
        if self.history.len() > keep {
            let excess = self.history.len() - keep;
            self.history.drain(..excess);
        }
    }

    /// Past user/assistant messages, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.engine.registry()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
