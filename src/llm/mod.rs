//! Model client: the `ChatModel` seam and its chat-completions implementation

mod client;
mod stream;
mod types;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ChatError;

pub use client::ModelHandle;
pub use stream::ModelEvent;
pub use types::{ChatMessage, Role, Usage};

/// Lazy, finite stream of model events for one request
pub type ModelStream = BoxStream<'static, Result<ModelEvent, ChatError>>;

/// Result of a non-streaming request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

/// A remote (or scripted) model that can answer a list of messages
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier sent with each request
    fn name(&self) -> &str;

    /// Resolve the whole answer in one call
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ChatError>;

    /// Start a streaming request; the returned stream yields text deltas as
    /// they are decoded
    async fn stream(&self, messages: &[ChatMessage]) -> Result<ModelStream, ChatError>;
}
