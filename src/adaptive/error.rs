use thiserror::Error;

use crate::adaptive::decision::ProviderError;
use crate::content::{ContentError, ItemId};

/// Caller-visible failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidRequest,
    ProviderFailure,
    Internal,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("item {0} not found")]
    ItemNotFound(ItemId),
    #[error("no unanswered items remain")]
    Exhausted,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("decision provider failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("item repository failed: {0}")]
    Repository(ContentError),
}

impl SessionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::SessionNotFound(_)
            | SessionError::ItemNotFound(_)
            | SessionError::Exhausted => ErrorKind::NotFound,
            SessionError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            SessionError::Provider(_) => ErrorKind::ProviderFailure,
            SessionError::Repository(_) => ErrorKind::Internal,
        }
    }
}

impl From<ContentError> for SessionError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::NotFound(id) => SessionError::ItemNotFound(id),
            other => SessionError::Repository(other),
        }
    }
}
