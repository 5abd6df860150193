use thiserror::Error;

/// Coarse failure classes. None of them are fatal to an engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProviderUnavailable,
    ProviderAuthFailed,
    ProviderTimeout,
    ProviderMalformedResponse,
    ProviderProcessFailed,
}

/// Why a provider call produced nothing usable
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("remote provider unreachable: {0}")]
    Unavailable(String),

    #[error("remote provider rejected credentials (HTTP {status})")]
    AuthFailed { status: u16 },

    #[error("no API key configured for the remote provider")]
    MissingApiKey,

    #[error("provider timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("remote provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("worker could not be started: {0}")]
    ProcessSpawn(String),

    #[error("worker exited with {code:?}: {stderr}")]
    ProcessFailed { code: Option<i32>, stderr: String },

    #[error("worker output is not a suggestion array: {0}")]
    MalformedOutput(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Unavailable(_) | ProviderError::Http { .. } => {
                ErrorKind::ProviderUnavailable
            }
            ProviderError::AuthFailed { .. } | ProviderError::MissingApiKey => {
                ErrorKind::ProviderAuthFailed
            }
            ProviderError::Timeout { .. } => ErrorKind::ProviderTimeout,
            ProviderError::MalformedResponse(_) => ErrorKind::ProviderMalformedResponse,
            ProviderError::ProcessSpawn(_)
            | ProviderError::ProcessFailed { .. }
            | ProviderError::MalformedOutput(_) => ErrorKind::ProviderProcessFailed,
        }
    }

    /// Classify a transport error from the HTTP client
    pub(crate) fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout { secs: timeout_secs }
        } else if err.is_decode() {
            ProviderError::MalformedResponse(err.to_string())
        } else {
            ProviderError::Unavailable(err.to_string())
        }
    }
}
