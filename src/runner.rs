//! Dispatching one turn to an agent
//!
//! A turn sends `[system instructions] + session history + [user input]` to
//! the agent's model. The user input and the answer are appended to the
//! session only once the answer is complete, so a failed turn leaves the
//! history untouched.

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use tracing::{debug, info};

use crate::agent::Agent;
use crate::error::ChatError;
use crate::llm::{ChatMessage, ModelEvent, Usage};
use crate::session::{Session, SessionItem};

/// Outcome of a blocking turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub final_output: String,
    /// Name of the agent that answered
    pub agent_name: String,
    pub usage: Option<Usage>,
}

/// Events yielded by a streamed turn, in order:
/// `AgentUpdated`, any number of `RawResponse`, then `MessageOutput`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    AgentUpdated { name: String },
    RawResponse(ModelEvent),
    /// Full answer, emitted after it has been recorded in the session
    MessageOutput(String),
}

impl RunEvent {
    /// Text fragment carried by this event, if any
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            RunEvent::RawResponse(event) => event.text_delta(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Runner {
    history_limit: Option<usize>,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only send the most recent `limit` session items as context
    pub fn with_history_limit(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self
    }

    async fn prepare(
        &self,
        agent: &Agent,
        input: &str,
        session: &dyn Session,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let history = session.get_items(self.history_limit).await?;
        debug!(
            "Session {}: {} prior items",
            session.session_id(),
            history.len()
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(agent.system_message());
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(input));
        Ok(messages)
    }

    /// Run one turn and wait for the whole answer
    pub async fn run(
        &self,
        agent: &Agent,
        input: &str,
        session: &dyn Session,
    ) -> Result<RunResult, ChatError> {
        info!("Running agent {} (blocking)", agent.name());
        let messages = self.prepare(agent, input, session).await?;
        let completion = agent.model().complete(&messages).await?;

        session
            .add_items(vec![
                SessionItem::user(input),
                SessionItem::assistant(completion.text.clone()),
            ])
            .await?;
        if let Some(usage) = completion.usage {
            info!(
                "Usage: prompt={}, completion={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(RunResult {
            final_output: completion.text,
            agent_name: agent.name().to_string(),
            usage: completion.usage,
        })
    }

    /// Run one turn, yielding events as the model produces them
    ///
    /// Nothing is sent until the stream is first polled. The stream is
    /// finite and cannot be restarted; it must be drained for the turn to be
    /// recorded.
    pub fn run_streamed<'a>(
        &'a self,
        agent: &'a Agent,
        input: &'a str,
        session: &'a dyn Session,
    ) -> impl Stream<Item = Result<RunEvent, ChatError>> + Send + 'a {
        try_stream! {
            info!("Running agent {} (streaming)", agent.name());
            let messages = self.prepare(agent, input, session).await?;
            yield RunEvent::AgentUpdated { name: agent.name().to_string() };

            let mut events = agent.model().stream(&messages).await?;
            let mut output = String::new();
            while let Some(event) = events.next().await {
                let event = event?;
                if let Some(text) = event.text_delta() {
                    output.push_str(text);
                }
                yield RunEvent::RawResponse(event);
            }

            session
                .add_items(vec![
                    SessionItem::user(input),
                    SessionItem::assistant(output.clone()),
                ])
                .await?;
            debug!("Streamed answer complete ({} chars)", output.len());
            yield RunEvent::MessageOutput(output);
        }
    }
}
