//! Load balancer error types.

use thiserror::Error;

/// Invalid startup configuration. Fatal: the proxy must not start serving.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A dispatcher needs at least one backend.
    #[error("no backends configured")]
    NoBackends,

    /// The backend address is not an absolute http(s) URL.
    #[error("invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The forwarding client for a backend could not be built.
    #[error("failed to build forwarding client: {0}")]
    Client(#[from] reqwest::Error),
}

/// A single backend exchange failed. Not retried.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The backend did not answer within the configured deadline.
    #[error("backend {backend} timed out")]
    Timeout { backend: String },

    /// The connection to the backend could not be established.
    #[error("failed to connect to backend {backend}: {source}")]
    Connect {
        backend: String,
        #[source]
        source: reqwest::Error,
    },

    /// The exchange broke after the connection was established.
    #[error("transport error from backend {backend}: {source}")]
    Transport {
        backend: String,
        #[source]
        source: reqwest::Error,
    },

    /// The inbound request could not be rewritten for the backend.
    #[error("cannot forward request to backend {backend}: {reason}")]
    InvalidRequest { backend: String, reason: String },
}

impl ForwardError {
    /// Classify a client error raised while talking to `backend`.
    pub fn from_client(backend: &str, err: reqwest::Error) -> Self {
        let backend = backend.to_string();
        if err.is_timeout() {
            ForwardError::Timeout { backend }
        } else if err.is_connect() {
            ForwardError::Connect { backend, source: err }
        } else if err.is_builder() {
            ForwardError::InvalidRequest {
                backend,
                reason: err.to_string(),
            }
        } else {
            ForwardError::Transport { backend, source: err }
        }
    }

    /// Address of the backend the failed exchange targeted.
    pub fn backend(&self) -> &str {
        match self {
            ForwardError::Timeout { backend }
            | ForwardError::Connect { backend, .. }
            | ForwardError::Transport { backend, .. }
            | ForwardError::InvalidRequest { backend, .. } => backend,
        }
    }
}
