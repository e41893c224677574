//! Chat-completions API client

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};
use url::Url;

use super::stream::decode_stream;
use super::types::*;
use super::{ChatModel, Completion, ModelStream};
use crate::auth::ApiKey;
use crate::config::ModelConfig;
use crate::error::ChatError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle to a remote chat-completions model
///
/// Building one performs no network I/O.
pub struct ModelHandle {
    http_client: reqwest::Client,
    credential: ApiKey,
    model: String,
    endpoint: Url,
    timeout: Duration,
}

impl ModelHandle {
    /// Create a handle for `model` served under `base_url`
    pub fn new(
        credential: ApiKey,
        model: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Self::with_client(http_client, credential, model, base_url, timeout)
    }

    /// Like `new`, reusing a caller-configured HTTP client
    pub fn with_client(
        http_client: reqwest::Client,
        credential: ApiKey,
        model: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let endpoint = chat_completions_url(base_url)?;
        Ok(Self {
            http_client,
            credential,
            model: model.into(),
            endpoint,
            timeout,
        })
    }

    /// Read the credential, then build the handle
    ///
    /// Fails with `MissingCredential` before any HTTP client exists.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ChatError> {
        let credential = ApiKey::from_env(&config.api_key_env)?;
        let handle = Self::new(
            credential,
            config.name.clone(),
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!("Model handle ready: {} at {}", handle.model, handle.endpoint);
        Ok(handle)
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        stream: bool,
    ) -> Result<reqwest::Response, ChatError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            stream,
        };
        debug!(
            "POST {} (messages={}, stream={})",
            self.endpoint,
            messages.len(),
            stream
        );

        let mut builder = self
            .http_client
            .post(self.endpoint.clone())
            .header(reqwest::header::AUTHORIZATION, self.credential.auth_header())
            .json(&request);
        // A whole-request timeout would cut long streams short
        if !stream {
            builder = builder.timeout(self.timeout);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&error_text)
                .ok()
                .and_then(ApiErrorBody::message)
                .unwrap_or(error_text);
            error!("API error ({}): {}", status, message);
            return Err(ChatError::Api { status, message });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for ModelHandle {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, ChatError> {
        let response = self.send(messages, false).await?;
        let body = response.bytes().await?;
        let parsed: CompletionResponse = serde_json::from_slice(&body)?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(ChatError::EmptyResponse)?;
        if let Some(ref reason) = choice.finish_reason {
            debug!("Completion finished: {}", reason);
        }

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            usage: parsed.usage,
        })
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<ModelStream, ChatError> {
        let response = self.send(messages, true).await?;
        Ok(Box::pin(decode_stream(response)))
    }
}

/// `{base_url}/chat/completions`, tolerating a missing trailing slash
fn chat_completions_url(base_url: &str) -> Result<Url, ChatError> {
    let invalid = |source| ChatError::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    };

    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    };
    Url::parse(&normalized)
        .and_then(|base| base.join("chat/completions"))
        .map_err(invalid)
}
