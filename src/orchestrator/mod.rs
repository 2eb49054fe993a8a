//! Signup orchestration.
//!
//! Sequences validation -> bank verification -> customer/payment-method
//! creation -> first-charge attempt -> record creation, with compensating
//! rollback on failure. There is no two-phase commit across Plaid, Stripe
//! and the datastore; correctness rests on idempotent lookups, unique
//! constraints and ordered compensating deletes.

pub mod provisioning;

pub use provisioning::{provision_company, Provisioned};

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::payment::value_objects::{PaymentStatus, PaymentType};
use crate::domain::payment::PaymentRecord;
use crate::domain::repositories::{
    CompanyRepository, PaymentRepository, RepositoryError, UserRepository,
};
use crate::gateway::{
    decline_message, AccountHolderType, ChargeStatus, GatewayError, LinkSession, PaymentGateway,
};
use crate::validation::{validate_amount, ValidatedCompleteSignup, ValidatedSignup};

/// Errors surfaced by the orchestrator
#[derive(Debug, Error)]
pub enum SignupError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Persistence(#[from] RepositoryError),

    /// The charge was declined; `message` is already sanitized for clients
    #[error("charge declined [{code}]: {message}")]
    ChargeDeclined { code: String, message: String },

    /// Provisioning failed after rows were created; compensating deletes ran
    #[error("provisioning rolled back: {0}")]
    RolledBack(String),
}

/// Outcome of a completed (or pending) signup charge
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub payment_id: Uuid,
    pub payment_intent_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub company_created: bool,
    pub company_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// Result of signup initiation: a default-incomplete subscription awaiting
/// payment-method confirmation
#[derive(Debug, Clone)]
pub struct SignupInitiated {
    pub customer_id: String,
    pub subscription_id: String,
    pub client_secret: Option<String>,
}

/// Derives the charge idempotency key for one logical signup attempt.
///
/// Deterministic over (customer id, amount, caller-supplied session id) so
/// a retried invocation for the same attempt reuses the same key and the
/// provider deduplicates the charge.
pub fn charge_idempotency_key(customer_id: &str, amount_cents: i64, session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(customer_id.as_bytes());
    hasher.update(b":");
    hasher.update(amount_cents.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(session_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// The central signup workflow.
///
/// Holds the provider gateway and the persistence ports; constructed once
/// per process and shared via the router state.
pub struct SignupOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    companies: Arc<dyn CompanyRepository>,
    users: Arc<dyn UserRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl SignupOrchestrator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        companies: Arc<dyn CompanyRepository>,
        users: Arc<dyn UserRepository>,
        payments: Arc<dyn PaymentRepository>,
    ) -> Self {
        Self {
            gateway,
            companies,
            users,
            payments,
        }
    }

    /// Issues a bank-link session for the client to start account linking
    pub async fn create_link_session(
        &self,
        user_ref: &str,
        company_name: &str,
    ) -> Result<LinkSession, SignupError> {
        Ok(self
            .gateway
            .create_bank_link_session(user_ref, company_name)
            .await?)
    }

    /// Signup initiation: create-or-reuse the customer and open a
    /// default-incomplete subscription whose intent the client confirms.
    pub async fn initiate(
        &self,
        signup: &ValidatedSignup,
        price_id: &str,
    ) -> Result<SignupInitiated, SignupError> {
        let customer_id = self.find_or_create_customer(signup).await?;

        let subscription = self
            .gateway
            .create_subscription(&customer_id, price_id, &["us_bank_account"])
            .await?;

        tracing::info!(
            customer_id = %customer_id,
            subscription_id = %subscription.subscription_id,
            tier = %signup.subscription_tier,
            "signup initiated"
        );

        Ok(SignupInitiated {
            customer_id,
            subscription_id: subscription.subscription_id,
            client_secret: subscription.client_secret,
        })
    }

    async fn find_or_create_customer(
        &self,
        signup: &ValidatedSignup,
    ) -> Result<String, SignupError> {
        // Dedup at the provider mirrors the persistence-level idempotency:
        // look up by email first, create only if absent.
        if let Some(existing) = self
            .gateway
            .find_customer_by_email(signup.company_email.as_str())
            .await?
        {
            return Ok(existing);
        }

        let mut metadata = HashMap::new();
        metadata.insert("company_name".to_string(), signup.company_name.clone());
        metadata.insert(
            "subscription_tier".to_string(),
            signup.subscription_tier.to_string(),
        );
        Ok(self
            .gateway
            .create_customer(
                signup.company_email.as_str(),
                &signup.company_name,
                metadata,
            )
            .await?)
    }

    /// The main state machine: bank link -> customer -> pending record ->
    /// charge -> provision (or pending/failed).
    pub async fn complete(
        &self,
        request: &ValidatedCompleteSignup,
    ) -> Result<SignupOutcome, SignupError> {
        // VALIDATED -> BANK_LINKED. Failures here are terminal for the
        // attempt but clean: no charge submitted, nothing to roll back.
        let exchange = self
            .gateway
            .exchange_link_artifact(&request.public_token, &request.account_id)
            .await?;
        let processor_token = self
            .gateway
            .create_charge_token(&exchange.access_token, &request.account_id)
            .await?;

        // BANK_LINKED -> CUSTOMER_READY
        let customer_id = match &request.customer_id {
            Some(id) => id.clone(),
            None => {
                let signup = ValidatedSignup {
                    company_name: request.company_name.clone(),
                    company_email: request.company_email.clone(),
                    owner_name: request.owner_name.clone(),
                    phone: None,
                    subscription_tier: request.subscription_tier,
                };
                self.find_or_create_customer(&signup).await?
            }
        };
        let payment_method_id = self
            .gateway
            .create_payment_method(&customer_id, &processor_token, AccountHolderType::Company)
            .await?;

        // CUSTOMER_READY -> CHARGE_SUBMITTED. The pending row goes in
        // before the charge so a crash mid-flow leaves a record to
        // reconcile against.
        // Amounts are fixed server-side per tier, but the charge ceiling is
        // still enforced before anything is submitted
        let amount = request.subscription_tier.monthly_amount();
        validate_amount(amount).map_err(RepositoryError::Database)?;
        let mut payment = PaymentRecord::new(
            amount,
            PaymentType::InitialSubscription,
            customer_id.clone(),
            request.company_name.clone(),
            request.company_email.clone(),
            request.owner_name.clone(),
            request.subscription_tier,
        )
        .map_err(RepositoryError::Database)?;
        payment.set_payment_method(payment_method_id.clone());
        self.payments.insert(&payment).await?;

        let idempotency_key =
            charge_idempotency_key(&customer_id, payment.amount_cents(), &request.session_id);
        let mut metadata = HashMap::new();
        metadata.insert("payment_id".to_string(), payment.id().to_string());
        metadata.insert("company_email".to_string(), request.company_email.to_string());
        metadata.insert(
            "subscription_tier".to_string(),
            request.subscription_tier.to_string(),
        );

        let charge = self
            .gateway
            .create_charge(
                &customer_id,
                &payment_method_id,
                payment.amount_cents(),
                &idempotency_key,
                metadata,
            )
            .await;

        match charge {
            Ok(outcome) => {
                self.resolve_charge(payment, outcome.payment_intent_id, outcome.status)
                    .await
            }
            Err(GatewayError::Terminal { code, message }) => {
                let user_message = decline_message(&code).to_string();
                tracing::warn!(
                    payment_id = %payment.id(),
                    code = %code,
                    "charge declined: {}",
                    crate::gateway::mask_secrets(&message)
                );
                payment
                    .mark_failed(&code, &user_message)
                    .map_err(RepositoryError::Database)?;
                self.payments.update(&payment).await?;
                Err(SignupError::ChargeDeclined {
                    code,
                    message: user_message,
                })
            }
            Err(err) => {
                // Unknown outcome (timeout, rate limit). The charge may have
                // gone through, so the record is parked in processing for
                // webhook reconciliation; a retry must reuse the same
                // idempotency key.
                tracing::error!(payment_id = %payment.id(), "charge outcome unknown: {}", err);
                payment
                    .mark_processing(format!("unknown:{}", payment.id()))
                    .map_err(RepositoryError::Database)?;
                self.payments.update(&payment).await?;
                Err(err.into())
            }
        }
    }

    async fn resolve_charge(
        &self,
        mut payment: PaymentRecord,
        payment_intent_id: String,
        status: ChargeStatus,
    ) -> Result<SignupOutcome, SignupError> {
        match status {
            ChargeStatus::Succeeded => {
                // CHARGE_SUCCEEDED: rare for ACH but possible; provision now
                payment
                    .mark_succeeded(Some(payment_intent_id.clone()))
                    .map_err(RepositoryError::Database)?;
                self.payments.update(&payment).await?;

                let provisioned = self.provision_from_payment(&mut payment).await?;
                Ok(SignupOutcome {
                    payment_id: payment.id(),
                    payment_intent_id: Some(payment_intent_id),
                    payment_status: PaymentStatus::Succeeded,
                    company_created: !provisioned.already_existed,
                    company_id: Some(provisioned.company_id),
                    user_id: provisioned.user_id,
                })
            }
            ChargeStatus::Processing => {
                // CHARGE_PENDING_ASYNC: the expected ACH path. Provisioning
                // happens later when the settlement webhook arrives.
                payment
                    .mark_processing(payment_intent_id.clone())
                    .map_err(RepositoryError::Database)?;
                self.payments.update(&payment).await?;
                tracing::info!(
                    payment_id = %payment.id(),
                    intent_id = %payment_intent_id,
                    "charge pending ACH settlement"
                );
                Ok(SignupOutcome {
                    payment_id: payment.id(),
                    payment_intent_id: Some(payment_intent_id),
                    payment_status: PaymentStatus::Processing,
                    company_created: false,
                    company_id: None,
                    user_id: None,
                })
            }
            ChargeStatus::RequiresAction | ChargeStatus::Failed => {
                let code = "payment_intent_payment_attempt_failed";
                let user_message = decline_message(code).to_string();
                payment
                    .mark_failed(code, &user_message)
                    .map_err(RepositoryError::Database)?;
                self.payments.update(&payment).await?;
                Err(SignupError::ChargeDeclined {
                    code: code.to_string(),
                    message: user_message,
                })
            }
        }
    }

    /// Provisions the company from the data captured on the payment record
    /// and links the record to the new company row.
    async fn provision_from_payment(
        &self,
        payment: &mut PaymentRecord,
    ) -> Result<Provisioned, SignupError> {
        let provisioned = provision_company(
            self.companies.as_ref(),
            self.users.as_ref(),
            payment.company_name(),
            payment.company_email().clone(),
            payment.owner_name(),
            payment.stripe_customer_id(),
            payment.subscription_tier(),
        )
        .await?;

        payment.attach_company(provisioned.company_id);
        self.payments.update(payment).await?;
        Ok(provisioned)
    }

    /// Webhook-driven completion: settle the payment found by intent id and
    /// provision the company it captured at creation time.
    ///
    /// Safe to race the synchronous path: an already-settled record with a
    /// company attached is a no-op, and provisioning itself resolves to the
    /// existing company via the email/customer-id lookup.
    pub async fn settle_transfer(&self, payment_intent_id: &str) -> Result<SignupOutcome, SignupError> {
        let mut payment = self
            .payments
            .find_by_intent_id(payment_intent_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("payment for intent {}", payment_intent_id))
            })?;

        if payment.status() == PaymentStatus::Succeeded && payment.company_id().is_some() {
            tracing::info!(payment_id = %payment.id(), "settlement replay ignored");
            return Ok(SignupOutcome {
                payment_id: payment.id(),
                payment_intent_id: Some(payment_intent_id.to_string()),
                payment_status: PaymentStatus::Succeeded,
                company_created: false,
                company_id: payment.company_id(),
                user_id: None,
            });
        }

        // Out-of-order delivery: a completed event for a payment already
        // failed or cancelled. Acknowledge so the provider stops
        // redelivering; the record keeps its terminal state.
        if payment.status().is_terminal() && payment.status() != PaymentStatus::Succeeded {
            tracing::warn!(
                payment_id = %payment.id(),
                status = %payment.status(),
                "settlement for terminal payment ignored"
            );
            return Ok(SignupOutcome {
                payment_id: payment.id(),
                payment_intent_id: Some(payment_intent_id.to_string()),
                payment_status: payment.status(),
                company_created: false,
                company_id: payment.company_id(),
                user_id: None,
            });
        }

        if payment.status() != PaymentStatus::Succeeded {
            payment
                .mark_succeeded(Some(payment_intent_id.to_string()))
                .map_err(RepositoryError::Database)?;
            self.payments.update(&payment).await?;
        }

        let provisioned = self.provision_from_payment(&mut payment).await?;
        Ok(SignupOutcome {
            payment_id: payment.id(),
            payment_intent_id: Some(payment_intent_id.to_string()),
            payment_status: PaymentStatus::Succeeded,
            company_created: !provisioned.already_existed,
            company_id: Some(provisioned.company_id),
            user_id: provisioned.user_id,
        })
    }

    /// Webhook-driven failure: mark the payment failed, no provisioning
    pub async fn fail_transfer(
        &self,
        payment_intent_id: &str,
        code: &str,
        message: &str,
    ) -> Result<(), SignupError> {
        let mut payment = self
            .payments
            .find_by_intent_id(payment_intent_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("payment for intent {}", payment_intent_id))
            })?;

        if payment.status().is_terminal() {
            return Ok(());
        }
        payment
            .mark_failed(code, message)
            .map_err(RepositoryError::Database)?;
        self.payments.update(&payment).await?;
        Ok(())
    }

    /// Webhook-driven cancellation: mark the payment cancelled
    pub async fn cancel_transfer(&self, payment_intent_id: &str) -> Result<(), SignupError> {
        let mut payment = self
            .payments
            .find_by_intent_id(payment_intent_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("payment for intent {}", payment_intent_id))
            })?;

        if payment.status().is_terminal() {
            return Ok(());
        }
        payment.mark_cancelled().map_err(RepositoryError::Database)?;
        self.payments.update(&payment).await?;
        Ok(())
    }
}
