pub mod clock;
pub mod identity;
pub mod page;

/// Errors surfaced by the persistence collaborators. `Conflict` is reserved
/// for serialization/lock conflicts so callers can classify retryability.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("transaction conflict")]
    Conflict,
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
