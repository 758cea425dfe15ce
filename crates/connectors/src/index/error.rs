use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Index responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    pub fn status(&self) -> Option<u16> {
        match self {
            IndexError::Status { status, .. } => Some(*status),
            IndexError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the request might succeed if sent again later.
    pub fn is_transient(&self) -> bool {
        match self {
            IndexError::Transport(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
            IndexError::Status { status, .. } => *status == 429 || *status >= 500,
            IndexError::Io(_) => true,
            IndexError::InvalidUrl(_) | IndexError::Decode(_) | IndexError::Serialization(_) => {
                false
            }
        }
    }
}
