use thiserror::Error;

use crate::validate::ValidationError;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response. `message` is the server's `detail`, or a generic
    /// fallback naming the status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// HTTP 401. Routes admin views back to their login state.
    #[error("{0}")]
    Unauthorized(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Rejected locally; no request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(err.to_string())
    }
}
