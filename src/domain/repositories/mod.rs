// Repository ports for the persistence gateway.
//
// The storage backend offers no multi-row transactions across these tables,
// so correctness rests on the unique constraints surfaced here as
// `RepositoryError::Duplicate` plus the orchestrator's compensating deletes.

pub mod company_repository;
pub mod payment_repository;
pub mod user_repository;

pub use company_repository::CompanyRepository;
pub use payment_repository::PaymentRepository;
pub use user_repository::{User, UserRepository};

use thiserror::Error;

/// Errors surfaced by repository implementations
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write. This is the idempotency
    /// anchor: two racing provisioning attempts for the same company email
    /// or customer id resolve here.
    #[error("unique constraint violated: {constraint}")]
    Duplicate { constraint: String },

    #[error("row not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),
}

impl RepositoryError {
    /// True when the error is a unique-constraint rejection
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RepositoryError::Duplicate { .. })
    }
}
