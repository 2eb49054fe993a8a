use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::company::Company;
use crate::domain::user::value_objects::Email;

/// Repository trait for the Company aggregate
///
/// `find_by_email_or_customer_id` plus the unique constraints on both
/// columns are what make company provisioning idempotent: callers look up
/// before inserting, and a racing insert resolves to
/// `RepositoryError::Duplicate` rather than a second row.
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Insert a new company row
    async fn insert(&self, company: &Company) -> Result<(), RepositoryError>;

    /// Find a company by its ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError>;

    /// Find a company by either idempotency anchor
    async fn find_by_email_or_customer_id(
        &self,
        email: &Email,
        stripe_customer_id: &str,
    ) -> Result<Option<Company>, RepositoryError>;

    /// Backfill the owner reference after the owner user is created
    async fn set_owner(&self, company_id: Uuid, owner_id: Uuid) -> Result<(), RepositoryError>;

    /// Compensating delete used by the provisioning saga rollback
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
