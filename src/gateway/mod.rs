//! Payment provider gateway.
//!
//! The single seam through which all bank-linking and charging operations
//! pass. The orchestrator is provider-agnostic: it talks to the
//! [`PaymentGateway`] trait, and every provider-specific failure is
//! classified into the closed [`GatewayError`] taxonomy at this boundary.

pub mod error;
pub mod plaid;
pub mod stripe;
pub mod types;

pub use error::{decline_message, mask_secrets, GatewayError};
pub use types::{
    AccountHolderType, ChargeOutcome, ChargeStatus, LinkExchange, LinkSession, SubscriptionOutcome,
};

use async_trait::async_trait;
use std::collections::HashMap;

use self::plaid::PlaidClient;
use self::stripe::StripeClient;

/// Port for the bank-verification and charge providers
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Issue a single-use bank-link session for the client (4-hour expiry)
    async fn create_bank_link_session(
        &self,
        user_ref: &str,
        company_name: &str,
    ) -> Result<LinkSession, GatewayError>;

    /// Exchange the client's short-lived public token (30-minute lifetime)
    /// for long-lived access. Expiry is surfaced as `ExpiredArtifact`;
    /// there is no retry.
    async fn exchange_link_artifact(
        &self,
        public_token: &str,
        account_id: &str,
    ) -> Result<LinkExchange, GatewayError>;

    /// Bridge the verified bank account to a charge-provider processor token
    async fn create_charge_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, GatewayError>;

    /// Look up an existing customer by email; callers dedupe before creating
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>, GatewayError>;

    /// Create a charging-provider customer, returning its id
    async fn create_customer(
        &self,
        email: &str,
        display_name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, GatewayError>;

    /// Create a bank-account payment method from a processor token, attach
    /// it to the customer and set it as the default
    async fn create_payment_method(
        &self,
        customer_id: &str,
        processor_token: &str,
        holder_type: AccountHolderType,
    ) -> Result<String, GatewayError>;

    /// Submit a charge. The idempotency key is forwarded to the provider so
    /// retried calls for the same logical attempt never double-charge.
    async fn create_charge(
        &self,
        customer_id: &str,
        payment_method_id: &str,
        amount_cents: i64,
        idempotency_key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<ChargeOutcome, GatewayError>;

    /// Create a subscription in default-incomplete mode; the returned
    /// client secret belongs to the pending intent whose confirmation
    /// completes activation
    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        payment_method_types: &[&str],
    ) -> Result<SubscriptionOutcome, GatewayError>;
}

/// Production gateway composed of the Plaid client (bank linking) and the
/// Stripe client (customers, payment methods, charges, subscriptions).
///
/// Constructed once per process in `main` and injected into the
/// orchestrator; never a hidden global.
pub struct ProviderGateway {
    stripe: StripeClient,
    plaid: PlaidClient,
}

impl ProviderGateway {
    pub fn new(stripe: StripeClient, plaid: PlaidClient) -> Self {
        Self { stripe, plaid }
    }
}

#[async_trait]
impl PaymentGateway for ProviderGateway {
    async fn create_bank_link_session(
        &self,
        user_ref: &str,
        company_name: &str,
    ) -> Result<LinkSession, GatewayError> {
        self.plaid.create_link_token(user_ref, company_name).await
    }

    async fn exchange_link_artifact(
        &self,
        public_token: &str,
        _account_id: &str,
    ) -> Result<LinkExchange, GatewayError> {
        self.plaid.exchange_public_token(public_token).await
    }

    async fn create_charge_token(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<String, GatewayError> {
        self.plaid
            .create_stripe_processor_token(access_token, account_id)
            .await
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>, GatewayError> {
        self.stripe.find_customer_by_email(email).await
    }

    async fn create_customer(
        &self,
        email: &str,
        display_name: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, GatewayError> {
        self.stripe.create_customer(email, display_name, metadata).await
    }

    async fn create_payment_method(
        &self,
        customer_id: &str,
        processor_token: &str,
        holder_type: AccountHolderType,
    ) -> Result<String, GatewayError> {
        let pm_id = self
            .stripe
            .create_bank_payment_method(processor_token, holder_type)
            .await?;
        self.stripe.attach_payment_method(&pm_id, customer_id).await?;
        self.stripe
            .set_default_payment_method(customer_id, &pm_id)
            .await?;
        Ok(pm_id)
    }

    async fn create_charge(
        &self,
        customer_id: &str,
        payment_method_id: &str,
        amount_cents: i64,
        idempotency_key: &str,
        metadata: HashMap<String, String>,
    ) -> Result<ChargeOutcome, GatewayError> {
        self.stripe
            .create_payment_intent(
                customer_id,
                payment_method_id,
                amount_cents,
                idempotency_key,
                metadata,
            )
            .await
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        payment_method_types: &[&str],
    ) -> Result<SubscriptionOutcome, GatewayError> {
        self.stripe
            .create_subscription(customer_id, price_id, payment_method_types)
            .await
    }
}
