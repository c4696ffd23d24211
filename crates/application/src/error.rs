use domain::{DomainError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("domain error: {0}")]
    Domain(DomainError),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl ApplicationError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ApplicationError::NotFound(what.into())
    }
}

impl From<DomainError> for ApplicationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::ValidationError { field, message } => {
                ApplicationError::Validation(format!("{field}: {message}"))
            }
            other => ApplicationError::Domain(other),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::PostNotFound(id) => ApplicationError::not_found(format!("post {id}")),
            RepositoryError::CommentNotFound(id) => {
                ApplicationError::not_found(format!("comment {id}"))
            }
            RepositoryError::NotCommentable(id) => {
                ApplicationError::Domain(DomainError::CommentsDisabled(id))
            }
            RepositoryError::Storage { message } => ApplicationError::Persistence(message),
        }
    }
}
