//! # AppError
//!
//! Centralized error handling for the Rusty-Forum core.
//! Storage plugins translate their native failures into these variants at the
//! port boundary, so nothing above a repository ever sees a raw store code.

use thiserror::Error;

/// Coarse classification used by transports to pick a stable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    ReferenceViolation,
    Invalid,
    Internal,
}

/// The primary error type for all rf-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Thread token was a slug and no thread carries it.
    #[error("can't find thread with slug: {0}")]
    ThreadNotFoundBySlug(String),

    /// Thread token was numeric and no thread has that id.
    #[error("can't find thread with id: {0}")]
    ThreadNotFoundById(i64),

    #[error("can't find post with id: {0}")]
    PostNotFound(i64),

    #[error("can't find user by nickname: {0}")]
    UserNotFound(String),

    /// A post in a batch names an author that does not exist.
    #[error("can't find post author by nickname: {0}")]
    AuthorNotFound(String),

    #[error("can't find parent post with id: {0}")]
    ParentNotFound(i64),

    /// The parent post lives in another thread (or another forum).
    #[error("parent post {parent} was created in another thread than {thread}")]
    CrossThreadParent { parent: i64, thread: i64 },

    /// The store reported a uniqueness violation while inserting a batch.
    #[error("duplicate post in batch")]
    DuplicateInBatch,

    /// The `since` cursor names a post that does not exist.
    #[error("can't find cursor post with id: {0}")]
    CursorNotFound(i64),

    /// The `since` cursor names a post of another thread.
    #[error("cursor post {since} was created in another thread than {thread}")]
    CursorOutsideThread { since: i64, thread: i64 },

    /// Validation failure (e.g., vote value outside -1/+1)
    #[error("validation error: {0}")]
    Validation(String),

    /// Infrastructure failure (e.g., DB down, pool exhausted)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ThreadNotFoundBySlug(_)
            | AppError::ThreadNotFoundById(_)
            | AppError::PostNotFound(_)
            | AppError::UserNotFound(_)
            | AppError::CursorNotFound(_) => ErrorKind::NotFound,
            AppError::CrossThreadParent { .. }
            | AppError::CursorOutsideThread { .. }
            | AppError::DuplicateInBatch => ErrorKind::Conflict,
            AppError::AuthorNotFound(_) | AppError::ParentNotFound(_) => {
                ErrorKind::ReferenceViolation
            }
            AppError::Validation(_) => ErrorKind::Invalid,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn internal<T: ToString>(msg: T) -> Self {
        AppError::Internal(msg.to_string())
    }
}

/// A specialized Result type for Rusty-Forum logic.
pub type Result<T> = std::result::Result<T, AppError>;
