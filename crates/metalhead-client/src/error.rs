use metalhead_shared::{ErrorKind, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Failure of a single remote call, as reported by the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The transport could not reach the backend's network entry point.
    #[error("{0}")]
    Gateway(String),

    /// The backend executed the call and rejected it. `kind` is `None` when
    /// the backend only sent text.
    #[error("{message}")]
    Rejected {
        kind: Option<ErrorKind>,
        message: String,
    },
}

impl RemoteError {
    pub fn rejected(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Rejected {
            kind: Some(kind),
            message: message.into(),
        }
    }

    /// A rejection carrying only text, as older backends send.
    pub fn legacy(message: impl Into<String>) -> Self {
        Self::Rejected {
            kind: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            RemoteError::Gateway(_) => None,
            RemoteError::Rejected { kind, .. } => kind.as_ref(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RemoteError::Gateway(message) => message,
            RemoteError::Rejected { message, .. } => message,
        }
    }
}

/// A failure turned into something safe to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedError {
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl std::fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NormalizedError {}

/// Errors returned by the data-access layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Actor not available")]
    ActorUnavailable,

    #[error("Request superseded by a newer one")]
    Superseded,

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Remote(NormalizedError),
}

impl ClientError {
    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            ClientError::Remote(normalized) => normalized.kind.as_ref(),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
