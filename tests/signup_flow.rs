//! End-to-end signup orchestration tests against in-memory fakes.
//!
//! Cover the immediate-success path, the ACH processing-then-webhook path,
//! declines, link-artifact expiry, charge idempotency on retry, and the
//! provisioning saga's rollback behavior.

mod common;

use std::sync::atomic::Ordering;

use crewbase_api::domain::company::value_objects::{SubscriptionStatus, SubscriptionTier};
use crewbase_api::domain::payment::value_objects::PaymentStatus;
use crewbase_api::domain::repositories::RepositoryError;
use crewbase_api::domain::user::value_objects::{Email, UserRole};
use crewbase_api::gateway::{ChargeStatus, GatewayError};
use crewbase_api::orchestrator::{provision_company, SignupError};
use crewbase_api::validation::{ValidatedCompleteSignup, ValidatedSignup};

use common::harness;

fn complete_request() -> ValidatedCompleteSignup {
    ValidatedCompleteSignup {
        customer_id: None,
        public_token: "public-sandbox-token".to_string(),
        account_id: "acct_456".to_string(),
        company_name: "Acme Plumbing".to_string(),
        company_email: Email::new("owner@acme.com").unwrap(),
        owner_name: "Jo Owner".to_string(),
        subscription_tier: SubscriptionTier::Growth,
        session_id: "acct_456".to_string(),
    }
}

fn signup_request() -> ValidatedSignup {
    ValidatedSignup {
        company_name: "Acme Plumbing".to_string(),
        company_email: Email::new("owner@acme.com").unwrap(),
        owner_name: "Jo Owner".to_string(),
        phone: None,
        subscription_tier: SubscriptionTier::Growth,
    }
}

#[tokio::test]
async fn immediate_success_provisions_company_and_owner() {
    let h = harness();
    h.gateway.set_charge_status(ChargeStatus::Succeeded);

    let outcome = h
        .orchestrator
        .complete(&complete_request())
        .await
        .expect("signup completes");

    assert_eq!(outcome.payment_status, PaymentStatus::Succeeded);
    assert!(outcome.company_created);
    let company_id = outcome.company_id.expect("company id");
    let user_id = outcome.user_id.expect("user id");

    let companies = h.companies.rows.lock().unwrap();
    assert_eq!(companies.len(), 1);
    let company = &companies[0];
    assert_eq!(company.id(), company_id);
    assert_eq!(company.name(), "Acme Plumbing");
    assert_eq!(company.email().as_str(), "owner@acme.com");
    assert_eq!(company.subscription_tier(), SubscriptionTier::Growth);
    assert_eq!(company.subscription_status(), SubscriptionStatus::Pending);
    assert_eq!(company.owner_id(), Some(user_id));

    let users = h.users.rows.lock().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].company_id, company_id);
    assert_eq!(users[0].role, UserRole::Owner);

    // Exactly one payment row, settled and linked to the company
    let payments = h.payments.rows.lock().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status(), PaymentStatus::Succeeded);
    assert_eq!(payments[0].company_id(), Some(company_id));
    assert_eq!(payments[0].amount_cents(), 9900);
}

#[tokio::test]
async fn ach_processing_defers_provisioning_to_webhook_settlement() {
    let h = harness();
    h.gateway.set_charge_status(ChargeStatus::Processing);

    let outcome = h
        .orchestrator
        .complete(&complete_request())
        .await
        .expect("charge submits");

    assert_eq!(outcome.payment_status, PaymentStatus::Processing);
    assert!(!outcome.company_created);
    assert!(outcome.company_id.is_none());
    assert!(h.companies.rows.lock().unwrap().is_empty());

    let intent_id = outcome.payment_intent_id.expect("intent id");

    // The settlement webhook arrives later and drives provisioning
    let settled = h
        .orchestrator
        .settle_transfer(&intent_id)
        .await
        .expect("settlement provisions");
    assert!(settled.company_created);
    assert_eq!(h.companies.rows.lock().unwrap().len(), 1);
    assert_eq!(
        h.payments.rows.lock().unwrap()[0].status(),
        PaymentStatus::Succeeded
    );

    // Replayed delivery is a no-op
    let replayed = h
        .orchestrator
        .settle_transfer(&intent_id)
        .await
        .expect("replay acknowledged");
    assert!(!replayed.company_created);
    assert_eq!(replayed.company_id, settled.company_id);
    assert_eq!(h.companies.rows.lock().unwrap().len(), 1);
    assert_eq!(h.users.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn declined_charge_marks_payment_failed_without_provisioning() {
    let h = harness();
    h.gateway.decline_charge.store(true, Ordering::SeqCst);

    let err = h
        .orchestrator
        .complete(&complete_request())
        .await
        .expect_err("charge declines");

    match err {
        SignupError::ChargeDeclined { code, message } => {
            assert_eq!(code, "insufficient_funds");
            // Sanitized message, never the raw provider text
            assert_eq!(message, "Your bank account has insufficient funds.");
        }
        other => panic!("expected ChargeDeclined, got {:?}", other),
    }

    let payments = h.payments.rows.lock().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status(), PaymentStatus::Failed);
    assert_eq!(payments[0].failure_code(), Some("insufficient_funds"));
    assert!(h.companies.rows.lock().unwrap().is_empty());
    assert!(h.users.rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn expired_link_artifact_aborts_before_any_write() {
    let h = harness();
    h.gateway.expire_link_artifact.store(true, Ordering::SeqCst);

    let err = h
        .orchestrator
        .complete(&complete_request())
        .await
        .expect_err("exchange fails");
    assert!(matches!(
        err,
        SignupError::Gateway(GatewayError::ExpiredArtifact(_))
    ));

    // No charge, no records of any kind
    assert!(h.payments.rows.lock().unwrap().is_empty());
    assert!(h.companies.rows.lock().unwrap().is_empty());
    assert_eq!(h.gateway.distinct_charges.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retried_completion_reuses_the_charge_idempotency_key() {
    let h = harness();
    h.gateway.set_charge_status(ChargeStatus::Processing);

    let first = h
        .orchestrator
        .complete(&complete_request())
        .await
        .expect("first attempt");
    let second = h
        .orchestrator
        .complete(&complete_request())
        .await
        .expect("retried attempt");

    // Each invocation leaves its own payment row, but the provider only
    // ever saw one charge for the logical attempt.
    assert_eq!(h.payments.rows.lock().unwrap().len(), 2);
    assert_eq!(h.gateway.distinct_charges.load(Ordering::SeqCst), 1);
    assert_eq!(first.payment_intent_id, second.payment_intent_id);
}

#[tokio::test]
async fn initiation_reuses_an_existing_provider_customer() {
    let h = harness();
    h.gateway
        .customers
        .lock()
        .unwrap()
        .insert("owner@acme.com".to_string(), "cus_existing".to_string());

    let initiated = h
        .orchestrator
        .initiate(&signup_request(), "price_growth")
        .await
        .expect("initiation");

    assert_eq!(initiated.customer_id, "cus_existing");
    assert_eq!(h.gateway.customers.lock().unwrap().len(), 1);
    assert_eq!(initiated.subscription_id, "sub_test_1");
    assert!(initiated.client_secret.is_some());
}

#[tokio::test]
async fn provisioning_is_idempotent_across_invocations() {
    let h = harness();
    let email = Email::new("owner@acme.com").unwrap();

    let first = provision_company(
        h.companies.as_ref(),
        h.users.as_ref(),
        "Acme Plumbing",
        email.clone(),
        "Jo Owner",
        "cus_1",
        SubscriptionTier::Starter,
    )
    .await
    .expect("first provision");
    assert!(!first.already_existed);

    let second = provision_company(
        h.companies.as_ref(),
        h.users.as_ref(),
        "Acme Plumbing",
        email,
        "Jo Owner",
        "cus_1",
        SubscriptionTier::Starter,
    )
    .await
    .expect("second provision");

    assert!(second.already_existed);
    assert_eq!(second.company_id, first.company_id);
    assert_eq!(h.companies.rows.lock().unwrap().len(), 1);
    assert_eq!(h.users.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn owner_creation_failure_rolls_back_the_company() {
    let h = harness();
    h.users.fail_next_create.store(true, Ordering::SeqCst);
    let email = Email::new("owner@acme.com").unwrap();

    let err = provision_company(
        h.companies.as_ref(),
        h.users.as_ref(),
        "Acme Plumbing",
        email.clone(),
        "Jo Owner",
        "cus_1",
        SubscriptionTier::Starter,
    )
    .await
    .expect_err("provision fails");
    assert!(matches!(err, SignupError::RolledBack(_)));

    // No partial company survives
    assert!(h.companies.rows.lock().unwrap().is_empty());
    assert!(h.users.rows.lock().unwrap().is_empty());

    // A retry starts clean and succeeds
    let retried = provision_company(
        h.companies.as_ref(),
        h.users.as_ref(),
        "Acme Plumbing",
        email,
        "Jo Owner",
        "cus_1",
        SubscriptionTier::Starter,
    )
    .await
    .expect("retry provisions");
    assert!(!retried.already_existed);
    assert_eq!(h.companies.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn owner_backfill_failure_rolls_back_user_and_company() {
    let h = harness();
    h.companies.fail_next_set_owner.store(true, Ordering::SeqCst);
    let email = Email::new("owner@acme.com").unwrap();

    let err = provision_company(
        h.companies.as_ref(),
        h.users.as_ref(),
        "Acme Plumbing",
        email.clone(),
        "Jo Owner",
        "cus_1",
        SubscriptionTier::Starter,
    )
    .await
    .expect_err("backfill fails");
    assert!(matches!(err, SignupError::RolledBack(_)));

    // Both rows are deleted: a company without an owner never survives
    assert!(h.companies.rows.lock().unwrap().is_empty());
    assert!(h.users.rows.lock().unwrap().is_empty());

    let retried = provision_company(
        h.companies.as_ref(),
        h.users.as_ref(),
        "Acme Plumbing",
        email,
        "Jo Owner",
        "cus_1",
        SubscriptionTier::Starter,
    )
    .await
    .expect("retry provisions");
    assert!(!retried.already_existed);
    assert_eq!(
        h.companies.rows.lock().unwrap()[0].owner_id(),
        retried.user_id
    );
}

#[tokio::test]
async fn settlement_after_failure_is_acknowledged_without_provisioning() {
    let h = harness();
    h.gateway.set_charge_status(ChargeStatus::Processing);
    let outcome = h
        .orchestrator
        .complete(&complete_request())
        .await
        .expect("charge submits");
    let intent_id = outcome.payment_intent_id.expect("intent id");

    h.orchestrator
        .fail_transfer(&intent_id, "R01", "Insufficient funds")
        .await
        .expect("failure recorded");

    // An out-of-order completed event for the failed payment is accepted
    // but changes nothing
    let settled = h
        .orchestrator
        .settle_transfer(&intent_id)
        .await
        .expect("acknowledged");
    assert_eq!(settled.payment_status, PaymentStatus::Failed);
    assert!(!settled.company_created);
    assert!(h.companies.rows.lock().unwrap().is_empty());
    assert_eq!(
        h.payments.rows.lock().unwrap()[0].status(),
        PaymentStatus::Failed
    );
}

#[tokio::test]
async fn settlement_for_unknown_intent_is_not_found() {
    let h = harness();
    let err = h
        .orchestrator
        .settle_transfer("pi_never_seen")
        .await
        .expect_err("nothing to settle");
    assert!(matches!(
        err,
        SignupError::Persistence(RepositoryError::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_transfer_webhook_marks_payment_failed_once() {
    let h = harness();
    h.gateway.set_charge_status(ChargeStatus::Processing);
    let outcome = h
        .orchestrator
        .complete(&complete_request())
        .await
        .expect("charge submits");
    let intent_id = outcome.payment_intent_id.expect("intent id");

    h.orchestrator
        .fail_transfer(&intent_id, "R01", "Insufficient funds")
        .await
        .expect("failure recorded");
    {
        let payments = h.payments.rows.lock().unwrap();
        assert_eq!(payments[0].status(), PaymentStatus::Failed);
        assert_eq!(payments[0].failure_code(), Some("R01"));
    }

    // A redelivered failure for an already-terminal payment is a no-op
    h.orchestrator
        .fail_transfer(&intent_id, "R01", "Insufficient funds")
        .await
        .expect("redelivery acknowledged");
}
