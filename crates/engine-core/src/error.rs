use connectors::{file::error::FileError, index::error::IndexError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open partition {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: FileError,
    },

    #[error("Failed to read record from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: FileError,
    },

    #[error("Query against {url} failed: {source}")]
    Query {
        url: String,
        #[source]
        source: IndexError,
    },
}

impl SourceError {
    pub fn path(&self) -> &str {
        match self {
            SourceError::Open { path, .. } | SourceError::Read { path, .. } => path,
            SourceError::Query { url, .. } => url,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{key}: unsupported content: {reason}")]
    Unsupported { key: String, reason: String },

    #[error("{key}: malformed content: {reason}")]
    Malformed { key: String, reason: String },

    #[error("{key}: parse cancelled")]
    Cancelled { key: String },

    #[error("{key}: worker panicked")]
    Panicked { key: String },
}

impl ParseError {
    pub fn key(&self) -> &str {
        match self {
            ParseError::Unsupported { key, .. }
            | ParseError::Malformed { key, .. }
            | ParseError::Cancelled { key }
            | ParseError::Panicked { key } => key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Unsupported { .. } => "Unsupported",
            ParseError::Malformed { .. } => "Malformed",
            ParseError::Cancelled { .. } => "Cancelled",
            ParseError::Panicked { .. } => "Panicked",
        }
    }
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Sink responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    #[error("Sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document {id} rejected: {reason}")]
    Rejected { id: String, reason: String },

    #[error("Failed to encode document: {0}")]
    Encode(String),

    #[error("Sink error: {0}")]
    Other(String),
}

impl From<IndexError> for SinkError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Status { status, body } => SinkError::Status {
                status,
                message: body,
            },
            IndexError::Transport(err) => match err.status() {
                Some(status) => SinkError::Status {
                    status: status.as_u16(),
                    message: err.to_string(),
                },
                None => SinkError::Unavailable(err.to_string()),
            },
            IndexError::Io(err) => SinkError::Io(err),
            IndexError::Serialization(err) => SinkError::Encode(err.to_string()),
            IndexError::Decode(msg) | IndexError::InvalidUrl(msg) => SinkError::Other(msg),
        }
    }
}
