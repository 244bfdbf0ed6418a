//! Repository Module
//!
//! Typed data access over the SQLite pool. All order mutations go through
//! [`OrderRepository`] so the per-order CAS discipline has a single
//! chokepoint.

pub mod order;
pub mod product;

pub use order::OrderRepository;
pub use product::ProductRepository;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data integrity error: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
