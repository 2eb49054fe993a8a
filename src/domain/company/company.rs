use super::value_objects::{SubscriptionStatus, SubscriptionTier};
use crate::domain::user::value_objects::Email;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Company aggregate root
///
/// Represents a customer company provisioned at the end of a successful
/// signup. Enforces the naming and uniqueness-related invariants that the
/// provisioning saga relies on.
///
/// # Invariants
/// - Name length is between 2 and 100 characters
/// - Email and Stripe customer id are the idempotency anchors: the
///   persistence layer enforces uniqueness on both
/// - `owner_id` is nullable only during the provisioning window between
///   company insert and owner backfill
#[derive(Debug, Clone)]
pub struct Company {
    id: Uuid,
    company_code: String,
    name: String,
    email: Email,
    owner_id: Option<Uuid>,
    stripe_customer_id: String,
    subscription_tier: SubscriptionTier,
    subscription_status: SubscriptionStatus,
    onboarding_complete: bool,
    created_at: DateTime<Utc>,
}

impl Company {
    /// Creates a new Company aggregate
    ///
    /// # Business Rules Enforced
    /// - Name must be 2-100 characters after trimming
    /// - Initial subscription status is always Pending
    /// - Owner is unset; it is backfilled once the owner user exists
    pub fn new(
        name: impl Into<String>,
        email: Email,
        stripe_customer_id: impl Into<String>,
        subscription_tier: SubscriptionTier,
    ) -> Result<Self, String> {
        let name = name.into().trim().to_string();
        let name_chars = name.chars().count();
        if name_chars < 2 || name_chars > 100 {
            return Err("Company name must be between 2 and 100 characters".to_string());
        }

        let stripe_customer_id = stripe_customer_id.into();
        if stripe_customer_id.is_empty() {
            return Err("Stripe customer id cannot be empty".to_string());
        }

        let id = Uuid::new_v4();
        let company_code = Self::derive_code(&name, id);

        Ok(Self {
            id,
            company_code,
            name,
            email,
            owner_id: None,
            stripe_customer_id,
            subscription_tier,
            subscription_status: SubscriptionStatus::Pending,
            onboarding_complete: false,
            created_at: Utc::now(),
        })
    }

    /// Builds the human-readable company code shown in the dashboard,
    /// e.g. "ACME-3F9A2C" for "Acme Plumbing".
    fn derive_code(name: &str, id: Uuid) -> String {
        let prefix: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(4)
            .collect::<String>()
            .to_uppercase();
        let prefix = if prefix.is_empty() {
            "CO".to_string()
        } else {
            prefix
        };
        let suffix = id.simple().to_string()[..6].to_uppercase();
        format!("{}-{}", prefix, suffix)
    }

    /// Backfills the owner reference once the owner user row exists
    pub fn assign_owner(&mut self, user_id: Uuid) -> Result<(), String> {
        if self.owner_id.is_some() {
            return Err("Company already has an owner".to_string());
        }
        self.owner_id = Some(user_id);
        Ok(())
    }

    /// Activates the subscription after the first charge settles
    pub fn activate_subscription(&mut self) -> Result<(), String> {
        let next = SubscriptionStatus::Active;
        if !self.subscription_status.can_transition_to(next) {
            return Err(format!(
                "Cannot activate subscription in {:?} status",
                self.subscription_status
            ));
        }
        self.subscription_status = next;
        Ok(())
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn company_code(&self) -> &str {
        &self.company_code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }

    pub fn stripe_customer_id(&self) -> &str {
        &self.stripe_customer_id
    }

    pub fn subscription_tier(&self) -> SubscriptionTier {
        self.subscription_tier
    }

    pub fn subscription_status(&self) -> SubscriptionStatus {
        self.subscription_status
    }

    pub fn onboarding_complete(&self) -> bool {
        self.onboarding_complete
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Reconstructs a Company from persistence layer data
    ///
    /// Bypasses business rules validation since the data is already
    /// validated and stored in the database. Only to be used by repository
    /// implementations.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        company_code: String,
        name: String,
        email: Email,
        owner_id: Option<Uuid>,
        stripe_customer_id: String,
        subscription_tier: SubscriptionTier,
        subscription_status: SubscriptionStatus,
        onboarding_complete: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            company_code,
            name,
            email,
            owner_id,
            stripe_customer_id,
            subscription_tier,
            subscription_status,
            onboarding_complete,
            created_at,
        }
    }
}
