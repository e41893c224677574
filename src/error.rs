//! Error types shared by the model client, runner and chat loop

use crate::session::SessionError;

/// Errors that end a turn (and, at the top level, the whole run)
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Required credential variable is unset or empty
    #[error("{0} environment variable is not set")]
    MissingCredential(String),

    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Error event sent in the middle of a streamed response
    #[error("stream error: {0}")]
    Stream(String),

    #[error("response contained no choices")]
    EmptyResponse,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
