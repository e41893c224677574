//! Test doubles shared by unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;

use crate::error::ChatError;
use crate::llm::{ChatMessage, ChatModel, Completion, ModelEvent, ModelStream};

/// Deterministic model answering from a fixed script
///
/// Each request consumes the next answer; when the script runs out the last
/// answer repeats. Streaming splits the answer after every space so the
/// fragments concatenate back to the exact text.
pub struct ScriptedModel {
    answers: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    fail: bool,
    /// Fragment streamed before a mid-stream failure
    partial: Option<String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            last: Mutex::new(String::new()),
            fail: false,
            partial: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model whose every request fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    /// A model whose streams yield `fragment`, then fail
    pub fn failing_mid_stream(fragment: impl Into<String>) -> Self {
        Self {
            partial: Some(fragment.into()),
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Messages received by each request so far
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    fn next_answer(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.fail {
            return Err(ChatError::Stream("scripted failure".to_string()));
        }
        let mut last = self.last.lock().unwrap();
        if let Some(answer) = self.answers.lock().unwrap().pop_front() {
            *last = answer;
        }
        Ok(last.clone())
    }
}

/// Split after each space, keeping the separator with the fragment
pub fn fragments(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ChatError> {
        Ok(Completion {
            text: self.next_answer(messages)?,
            usage: None,
        })
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<ModelStream, ChatError> {
        if let Some(ref fragment) = self.partial {
            self.requests.lock().unwrap().push(messages.to_vec());
            let events = vec![
                Ok(ModelEvent::TextDelta(fragment.clone())),
                Err(ChatError::Stream("scripted failure".to_string())),
            ];
            return Ok(Box::pin(stream::iter(events)));
        }
        let answer = self.next_answer(messages)?;
        let mut events: Vec<Result<ModelEvent, ChatError>> = fragments(&answer)
            .into_iter()
            .map(|f| Ok(ModelEvent::TextDelta(f)))
            .collect();
        events.push(Ok(ModelEvent::Finish {
            reason: "stop".to_string(),
        }));
        Ok(Box::pin(stream::iter(events)))
    }
}
