use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::user::value_objects::{Email, UserRole};

/// User data for persistence
///
/// The id is allocated by the external identity provider; this service
/// only stores it. A user belongs to exactly one company.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: Email,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
}

/// Repository trait for users
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user, returning its id
    async fn create(&self, user: User) -> Result<Uuid, RepositoryError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    /// Find a user by email address
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Compensating delete used by the provisioning saga rollback
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
