use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::payment::PaymentRecord;

/// Repository trait for payment records
///
/// Payments are insert-then-update only. A record is inserted in `pending`
/// state before any charge attempt and updated in place as the charge
/// resolves; there is no delete.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a new pending payment row
    async fn insert(&self, payment: &PaymentRecord) -> Result<(), RepositoryError>;

    /// Persist the current state of an existing payment row
    async fn update(&self, payment: &PaymentRecord) -> Result<(), RepositoryError>;

    /// Find a payment by its ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentRecord>, RepositoryError>;

    /// Find a payment by the provider's payment-intent/transfer id, the key
    /// the settlement webhook carries
    async fn find_by_intent_id(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentRecord>, RepositoryError>;
}
