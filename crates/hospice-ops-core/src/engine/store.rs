//! Storage seam between the mutation engine and its backend.

use thiserror::Error;

/// Errors surfaced by an aggregate store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence port for one aggregate type.
///
/// The engine loads a fresh copy per operation, mutates it, and writes the
/// whole aggregate back. Implementations must make `save_with_token` one
/// atomic unit: the token record and the aggregate write land together or
/// not at all.
pub trait AggregateStore<A> {
    /// Load an aggregate by id.
    fn load(&self, id: &str) -> StoreResult<Option<A>>;

    /// Insert a newly created aggregate.
    fn insert(&self, aggregate: &A) -> StoreResult<()>;

    /// Persist the current state of an existing aggregate.
    fn save(&self, aggregate: &A) -> StoreResult<()>;

    /// Persist and record an idempotency token in the same unit.
    fn save_with_token(&self, aggregate: &A, token: &str) -> StoreResult<()>;

    /// Whether an idempotency token has already been applied.
    fn token_seen(&self, token: &str) -> StoreResult<bool>;

    /// Delete an aggregate. Returns false when the id was absent.
    fn delete(&self, id: &str) -> StoreResult<bool>;
}
