use super::value_objects::{AchStatus, PaymentStatus, PaymentType};
use crate::domain::company::value_objects::SubscriptionTier;
use crate::domain::user::value_objects::Email;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Hard ceiling on any single charge, in USD
pub const MAX_CHARGE_AMOUNT: i64 = 1_000_000;

/// Payment aggregate root
///
/// A payment record is inserted in `Pending` state before any charge is
/// submitted to the provider, so that there is always a durable row to
/// reconcile against if the process dies mid-flow. It is updated in place
/// as provider responses arrive and is never deleted.
///
/// The record also captures the signup data (company name/email, owner
/// name, tier) needed to provision the company later, because the webhook
/// that confirms ACH settlement runs in a separate invocation with no
/// access to the original request.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    id: Uuid,
    company_id: Option<Uuid>,
    amount: Decimal,
    status: PaymentStatus,
    payment_type: PaymentType,
    ach_status: AchStatus,
    stripe_customer_id: String,
    payment_method_id: Option<String>,
    payment_intent_id: Option<String>,
    charge_id: Option<String>,
    company_name: String,
    company_email: Email,
    owner_name: String,
    subscription_tier: SubscriptionTier,
    billing_period_start: Option<DateTime<Utc>>,
    billing_period_end: Option<DateTime<Utc>>,
    failure_code: Option<String>,
    failure_message: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Creates a new pending payment record
    ///
    /// # Business Rules Enforced
    /// - Amount must be positive and at most 1,000,000 USD
    /// - Initial status is always Pending, ACH sub-status Pending
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        amount: Decimal,
        payment_type: PaymentType,
        stripe_customer_id: impl Into<String>,
        company_name: impl Into<String>,
        company_email: Email,
        owner_name: impl Into<String>,
        subscription_tier: SubscriptionTier,
    ) -> Result<Self, String> {
        if amount <= Decimal::ZERO {
            return Err("Payment amount must be positive".to_string());
        }
        if amount > Decimal::from(MAX_CHARGE_AMOUNT) {
            return Err(format!(
                "Payment amount exceeds the {} USD ceiling",
                MAX_CHARGE_AMOUNT
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            company_id: None,
            amount,
            status: PaymentStatus::Pending,
            payment_type,
            ach_status: AchStatus::Pending,
            stripe_customer_id: stripe_customer_id.into(),
            payment_method_id: None,
            payment_intent_id: None,
            charge_id: None,
            company_name: company_name.into(),
            company_email,
            owner_name: owner_name.into(),
            subscription_tier,
            billing_period_start: None,
            billing_period_end: None,
            failure_code: None,
            failure_message: None,
            created_at: Utc::now(),
            processed_at: None,
            failed_at: None,
        })
    }

    fn transition(&mut self, next: PaymentStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Invalid payment transition from {} to {}",
                self.status, next
            ));
        }
        self.status = next;
        Ok(())
    }

    /// Records the attached payment method before the charge is submitted
    pub fn set_payment_method(&mut self, payment_method_id: impl Into<String>) {
        self.payment_method_id = Some(payment_method_id.into());
    }

    /// Marks the charge as submitted and awaiting ACH settlement
    pub fn mark_processing(&mut self, payment_intent_id: impl Into<String>) -> Result<(), String> {
        self.transition(PaymentStatus::Processing)?;
        self.payment_intent_id = Some(payment_intent_id.into());
        Ok(())
    }

    /// Marks the payment settled; sets the billing period to one month
    /// starting now
    pub fn mark_succeeded(&mut self, payment_intent_id: Option<String>) -> Result<(), String> {
        self.transition(PaymentStatus::Succeeded)?;
        if let Some(intent) = payment_intent_id {
            self.payment_intent_id = Some(intent);
        }
        self.ach_status = AchStatus::Cleared;
        let now = Utc::now();
        self.processed_at = Some(now);
        self.billing_period_start = Some(now);
        self.billing_period_end = Some(now + chrono::Duration::days(30));
        Ok(())
    }

    /// Marks the payment failed with the sanitized provider failure code
    pub fn mark_failed(
        &mut self,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), String> {
        self.transition(PaymentStatus::Failed)?;
        self.failure_code = Some(code.into());
        self.failure_message = Some(message.into());
        self.failed_at = Some(Utc::now());
        Ok(())
    }

    /// Marks the transfer cancelled before settlement
    pub fn mark_cancelled(&mut self) -> Result<(), String> {
        self.transition(PaymentStatus::Cancelled)?;
        self.failed_at = Some(Utc::now());
        Ok(())
    }

    /// Links the record to the company provisioned from it
    pub fn attach_company(&mut self, company_id: Uuid) {
        self.company_id = Some(company_id);
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn company_id(&self) -> Option<Uuid> {
        self.company_id
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Amount in cents, as the charge provider expects it
    pub fn amount_cents(&self) -> i64 {
        (self.amount * Decimal::from(100)).trunc().try_into().unwrap_or(0)
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn payment_type(&self) -> PaymentType {
        self.payment_type
    }

    pub fn ach_status(&self) -> AchStatus {
        self.ach_status
    }

    pub fn stripe_customer_id(&self) -> &str {
        &self.stripe_customer_id
    }

    pub fn payment_method_id(&self) -> Option<&str> {
        self.payment_method_id.as_deref()
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent_id.as_deref()
    }

    pub fn charge_id(&self) -> Option<&str> {
        self.charge_id.as_deref()
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn company_email(&self) -> &Email {
        &self.company_email
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn subscription_tier(&self) -> SubscriptionTier {
        self.subscription_tier
    }

    pub fn billing_period_start(&self) -> Option<DateTime<Utc>> {
        self.billing_period_start
    }

    pub fn billing_period_end(&self) -> Option<DateTime<Utc>> {
        self.billing_period_end
    }

    pub fn failure_code(&self) -> Option<&str> {
        self.failure_code.as_deref()
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn failed_at(&self) -> Option<DateTime<Utc>> {
        self.failed_at
    }

    /// Reconstructs a PaymentRecord from persistence layer data
    ///
    /// Bypasses business rules validation; only to be used by repository
    /// implementations.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persistence(
        id: Uuid,
        company_id: Option<Uuid>,
        amount: Decimal,
        status: PaymentStatus,
        payment_type: PaymentType,
        ach_status: AchStatus,
        stripe_customer_id: String,
        payment_method_id: Option<String>,
        payment_intent_id: Option<String>,
        charge_id: Option<String>,
        company_name: String,
        company_email: Email,
        owner_name: String,
        subscription_tier: SubscriptionTier,
        billing_period_start: Option<DateTime<Utc>>,
        billing_period_end: Option<DateTime<Utc>>,
        failure_code: Option<String>,
        failure_message: Option<String>,
        created_at: DateTime<Utc>,
        processed_at: Option<DateTime<Utc>>,
        failed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            company_id,
            amount,
            status,
            payment_type,
            ach_status,
            stripe_customer_id,
            payment_method_id,
            payment_intent_id,
            charge_id,
            company_name,
            company_email,
            owner_name,
            subscription_tier,
            billing_period_start,
            billing_period_end,
            failure_code,
            failure_message,
            created_at,
            processed_at,
            failed_at,
        }
    }
}
