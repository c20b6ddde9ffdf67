//! Shared error types for the services crate.

use std::time::Duration;

use quiz_core::model::{AnswerError, QuestionId};
use quiz_core::normalize::NormalizeError;
use quiz_core::validation::ValidationErrors;
use thiserror::Error;

/// Errors emitted by the REST collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizApiError {
    #[error("quiz request failed: {0}")]
    Http(String),
    #[error("quiz request failed with status {0}")]
    HttpStatus(u16),
    #[error("quiz response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for QuizApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Fatal failure to bring a session from `Loading` to `Answering`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    #[error("no task or preview questions to load")]
    MissingSource,
    #[error("loading questions timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Api(#[from] QuizApiError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    /// The owner went away while a request was in flight; the result is dropped.
    #[error("quiz was closed before loading finished")]
    Stale,
}

/// Rejected session operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot {action} while the quiz is {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    /// Full validation failed; `first_invalid` is the question to focus.
    #[error("{} question(s) are incomplete", .errors.len())]
    Incomplete {
        errors: ValidationErrors,
        first_invalid: QuestionId,
    },
    #[error(transparent)]
    Answer(#[from] AnswerError),
}
