//! Agent descriptors
//!
//! An `Agent` is an immutable bundle of a display name, the system
//! instructions sent with every request, and the model that answers.

use std::sync::Arc;

use crate::config::{AgentConfig, AgentOverride};
use crate::llm::{ChatMessage, ChatModel};

#[derive(Clone)]
pub struct Agent {
    name: String,
    instructions: String,
    model: Arc<dyn ChatModel>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            model,
        }
    }

    /// Build from the `[agents.*]` config section
    pub fn from_config(config: &AgentConfig, model: Arc<dyn ChatModel>) -> Self {
        Self::new(config.name.clone(), config.instructions.clone(), model)
    }

    /// Derive a new descriptor, replacing whichever fields are given
    ///
    /// `self` is left untouched; the model handle is shared.
    pub fn clone_with(&self, name: Option<&str>, instructions: Option<&str>) -> Self {
        Self {
            name: name.map_or_else(|| self.name.clone(), str::to_string),
            instructions: instructions.map_or_else(|| self.instructions.clone(), str::to_string),
            model: Arc::clone(&self.model),
        }
    }

    /// Derive using a config override block
    pub fn derive(&self, overrides: &AgentOverride) -> Self {
        self.clone_with(overrides.name.as_deref(), overrides.instructions.as_deref())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> &dyn ChatModel {
        self.model.as_ref()
    }

    /// System message carrying the instructions
    pub fn system_message(&self) -> ChatMessage {
        ChatMessage::system(self.instructions.clone())
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("instructions", &self.instructions)
            .field("model", &self.model.name())
            .finish()
    }
}
