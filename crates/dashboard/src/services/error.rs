//! Service error types.

use thiserror::Error;

use flipledger_core::{ComputationError, NotFoundError, ValidationError};

use crate::db::RepositoryError;

/// Errors returned by the record services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One or more fields were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// A derived value could not be computed.
    #[error(transparent)]
    Computation(#[from] ComputationError),

    /// Storage failed.
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(field) => {
                Self::Validation(ValidationError::field(field, "already exists"))
            }
            other => Self::Repository(other),
        }
    }
}

impl ServiceError {
    /// `NotFound` for a record looked up by `key`.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound(NotFoundError::new(entity, key.to_string()))
    }
}

/// Name the record when the store reports a missing row.
pub(crate) trait NotFoundExt<T> {
    fn or_not_found(self, entity: &'static str, key: impl ToString) -> Result<T, ServiceError>;
}

impl<T> NotFoundExt<T> for Result<T, RepositoryError> {
    fn or_not_found(self, entity: &'static str, key: impl ToString) -> Result<T, ServiceError> {
        self.map_err(|error| match error {
            RepositoryError::NotFound => ServiceError::not_found(entity, key),
            other => other.into(),
        })
    }
}
