//! agent-chat - terminal chat with a hosted chat-completions model
//!
//! Conversations are persisted in a session store, so every run picks up
//! where the previous one stopped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use agent_chat::{Agent, FileSession, ModelConfig, ModelHandle, Runner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), agent_chat::ChatError> {
//!     // Reads GEMINI_API_KEY
//!     let model = Arc::new(ModelHandle::from_config(&ModelConfig::default())?);
//!     let agent = Agent::new("Assistant", "Reply very concisely.", model);
//!     let session = FileSession::open("conversation_123", "conversation_history_1.json");
//!
//!     let result = Runner::new().run(&agent, "What is the capital of France?", &session).await?;
//!     println!("Assistant: {}", result.final_output);
//!     Ok(())
//! }
//! ```

mod agent;
mod app;
mod auth;
mod chat;
mod config;
mod error;
mod llm;
mod runner;
mod session;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod testing;

// Re-export the public API
pub use agent::Agent;
pub use app::App;
pub use auth::ApiKey;
pub use chat::{is_exit, ChatLoop, LoopState, RenderMode, EXIT_COMMAND, PROMPT};
pub use config::{AgentConfig, AgentOverride, Config, ModelConfig, SessionConfig};
pub use error::ChatError;
pub use llm::{
    ChatMessage, ChatModel, Completion, ModelEvent, ModelHandle, ModelStream, Role, Usage,
};
pub use runner::{RunEvent, RunResult, Runner};
pub use session::{FileSession, MemorySession, Session, SessionError, SessionItem};
