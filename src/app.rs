use std::sync::Arc;

use tokio::io::{AsyncWrite, BufReader};
use tracing::info;

use crate::agent::Agent;
use crate::chat::{render_answer, render_stream, ChatLoop, RenderMode};
use crate::config::Config;
use crate::error::ChatError;
use crate::llm::{ChatModel, ModelHandle};
use crate::runner::Runner;
use crate::session::{FileSession, Session};

/// Everything a turn needs, wired once at startup
pub struct App {
    config: Config,
    mode: RenderMode,
    runner: Runner,
    model: Arc<dyn ChatModel>,
    session: Arc<dyn Session>,
    /// Built once; the streaming front end derives from it every turn
    base_agent: Agent,
}

impl App {
    /// Wire the model endpoint and the file-backed session from `config`
    ///
    /// The credential is checked first, so a missing variable fails before
    /// any HTTP client is built or any prompt is shown.
    pub fn new(config: Config, mode: RenderMode) -> Result<Self, ChatError> {
        let model = ModelHandle::from_config(&config.model)?;
        let session = FileSession::open(config.session.id.clone(), config.session.path.clone());
        info!(
            "Session {} stored in {}",
            session.session_id(),
            session.path().display()
        );
        Ok(Self::with_parts(config, mode, Arc::new(model), Arc::new(session)))
    }

    /// Wire from explicit parts (alternate model or session backends)
    pub fn with_parts(
        config: Config,
        mode: RenderMode,
        model: Arc<dyn ChatModel>,
        session: Arc<dyn Session>,
    ) -> Self {
        let base_agent = Agent::from_config(&config.agents.assistant, Arc::clone(&model));
        let runner = Runner::new().with_history_limit(config.session.history_limit);
        Self {
            config,
            mode,
            runner,
            model,
            session,
            base_agent,
        }
    }

    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    /// Run one turn in the configured mode, writing the answer to `output`
    pub async fn run_turn<W>(&self, input: &str, output: &mut W) -> Result<(), ChatError>
    where
        W: AsyncWrite + Unpin,
    {
        match self.mode {
            RenderMode::Blocking => self.blocking_turn(input, output).await,
            RenderMode::Streaming => self.streaming_turn(input, output).await,
        }
    }

    async fn blocking_turn<W>(&self, input: &str, output: &mut W) -> Result<(), ChatError>
    where
        W: AsyncWrite + Unpin,
    {
        let agent = Agent::from_config(&self.config.agents.assistant, Arc::clone(&self.model));
        let result = self.runner.run(&agent, input, self.session.as_ref()).await?;
        render_answer(output, &result).await
    }

    async fn streaming_turn<W>(&self, input: &str, output: &mut W) -> Result<(), ChatError>
    where
        W: AsyncWrite + Unpin,
    {
        let agent = self.base_agent.derive(&self.config.agents.streaming);
        let events = self.runner.run_streamed(&agent, input, self.session.as_ref());
        render_stream(output, events).await
    }

    /// Run the prompt loop on stdin/stdout
    pub async fn run(&self) -> Result<usize, ChatError> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut chat = ChatLoop::new(stdin, tokio::io::stdout());
        chat.run(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    #[test]
    fn test_missing_credential_fails_before_wiring() {
        let config = Config {
            model: ModelConfig {
                api_key_env: "AGENT_CHAT_TEST_UNSET_APP_KEY".to_string(),
                ..ModelConfig::default()
            },
            ..Config::default()
        };

        match App::new(config, RenderMode::Streaming) {
            Err(ChatError::MissingCredential(var)) => {
                assert_eq!(var, "AGENT_CHAT_TEST_UNSET_APP_KEY")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("app built without a credential"),
        }
    }

    #[test]
    fn test_missing_credential_checked_before_base_url() {
        // An invalid URL would be reported second
        let config = Config {
            model: ModelConfig {
                api_key_env: "AGENT_CHAT_TEST_UNSET_APP_KEY_2".to_string(),
                base_url: "::not a url::".to_string(),
                ..ModelConfig::default()
            },
            ..Config::default()
        };
        assert!(matches!(
            App::new(config, RenderMode::Blocking),
            Err(ChatError::MissingCredential(_))
        ));
    }
}
