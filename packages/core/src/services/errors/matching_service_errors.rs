use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum MatchingServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Match not found: {0}")]
    MatchNotFound(String),
    #[error(transparent)]
    StoreError(#[from] StoreError),
}
