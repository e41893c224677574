//! API key authentication

use crate::error::ChatError;

/// Default variable holding the endpoint credential
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Bearer credential for the chat-completions endpoint
#[derive(Clone)]
pub struct ApiKey {
    api_key: String,
}

impl ApiKey {
    /// Create from an API key string
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Load the API key from the named environment variable
    ///
    /// An empty value counts as unset.
    pub fn from_env(var: &str) -> Result<Self, ChatError> {
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => Ok(Self::new(value)),
            _ => Err(ChatError::MissingCredential(var.to_string())),
        }
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Value for the `Authorization` header
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey").field("api_key", &"<redacted>").finish()
    }
}
