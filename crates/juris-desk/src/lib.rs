//! Terminal legal Q&A desk powered by juris-rs.
//!
//! `juris-desk` loads a `template.json`, opens one keyword index per listed
//! document, and answers questions through a juris-rs [`Session`] whose
//! agent speaks as an insurance attorney.
//!
//! # Library usage
//!
//! ```ignore
//! use juris_desk::{DeskConfig, Template, build_session, desk_event_handler};
//!
//! let template = Template::load("template.json")?;
//! let client = Arc::new(OpenRouterClient::new(api_key)?);
//! let mut session = build_session(&DeskConfig::default(), &template, client)?;
//! let response = session.ask("Is an organ transplant covered?", &desk_event_handler(false)).await?;
//! ```
//!
//! # Binary
//!
//! ```sh
//! # Interactive mode
//! juris-desk --template template.json
//!
//! # One-shot mode
//! juris-desk --query "Must my employer insure me under the ESI Act?"
//! ```

pub mod config;
pub mod prompt;

use std::sync::Arc;

use juris_rs::agent::events::{AgentEvent, CompositeEventHandler, EventHandler, LoggingHandler};
use juris_rs::agent::session::Session;
use juris_rs::api::generation::{ChatModel, OpenRouterGenerator, RetryingGenerator, TextGenerator};
use juris_rs::api::retry::RetryConfig;
use juris_rs::query::prompt::DecompositionExample;
use juris_rs::query::{AnswerComposer, QuestionDecomposer, SubQuestionExecutor, SubQuestionQueryEngine};
use juris_rs::{OpenRouterClient, QueryError};

pub use config::{DeskConfig, Template};
pub use prompt::attorney_system_prompt;

/// Wire a session against OpenRouter using the template's model everywhere.
pub fn build_session(
    config: &DeskConfig,
    template: &Template,
    client: Arc<OpenRouterClient>,
) -> Result<Session, QueryError> {
    let generator: Arc<dyn TextGenerator> = Arc::new(RetryingGenerator::new(
        OpenRouterGenerator::new(client.clone(), template.model_choice.clone()),
        RetryConfig::with_retries(config.retries),
    ));
    build_session_with(config, template, client, generator)
}

/// Wire a session from explicit chat and generation backends.
pub fn build_session_with(
    config: &DeskConfig,
    template: &Template,
    chat: Arc<dyn ChatModel>,
    generator: Arc<dyn TextGenerator>,
) -> Result<Session, QueryError> {
    let registry = Arc::new(config.build_registry(template, generator.clone())?);

    let decomposer = match &config.example_file {
        Some(path) => {
            QuestionDecomposer::with_example(generator.clone(), DecompositionExample::load(path)?)
        }
        None => QuestionDecomposer::new(generator.clone())?,
    };
    let engine = SubQuestionQueryEngine::from_parts(
        registry,
        decomposer,
        SubQuestionExecutor::new(config.concurrency),
        AnswerComposer::new(generator),
    );

    Ok(Session::new(chat, engine, config.build_agent_config(template)))
}

/// Progress lines on stderr, plus `tracing` logs of every agent event when
/// `verbose` is set.
pub fn desk_event_handler(verbose: bool) -> CompositeEventHandler {
    CompositeEventHandler::new()
        .with(DeskEventHandler)
        .with_if(verbose, LoggingHandler)
}

/// Progress lines on stderr while the agent works.
pub struct DeskEventHandler;

impl EventHandler for DeskEventHandler {
    fn on_event(&self, event: &AgentEvent<'_>) {
        match event {
            AgentEvent::ToolExecuting { name, .. } => {
                eprintln!("  ... consulting the {name}");
            }
            AgentEvent::IterationLimitReached { max_iterations } => {
                eprintln!("  ... gave up after {max_iterations} steps");
            }
            _ => {}
        }
    }
}
