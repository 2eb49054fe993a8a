//! Shared test fixtures: an in-memory payment gateway and repositories
//! substituted for the real Stripe/Plaid clients and Postgres, plus a
//! router builder mirroring the production route table.

use async_trait::async_trait;
use axum::{
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crewbase_api::api::handlers::{signup, webhooks};
use crewbase_api::api::state::AppState;
use crewbase_api::config::Config;
use crewbase_api::domain::company::Company;
use crewbase_api::domain::payment::PaymentRecord;
use crewbase_api::domain::repositories::{
    CompanyRepository, PaymentRepository, RepositoryError, User, UserRepository,
};
use crewbase_api::domain::user::value_objects::Email;
use crewbase_api::gateway::{
    AccountHolderType, ChargeOutcome, ChargeStatus, GatewayError, LinkExchange, LinkSession,
    PaymentGateway, SubscriptionOutcome,
};
use crewbase_api::orchestrator::SignupOrchestrator;

pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";

/// Configurable in-memory payment gateway
#[derive(Default)]
pub struct FakeGateway {
    /// Immediate outcome create_charge reports (default: Succeeded)
    pub charge_status: Mutex<Option<ChargeStatus>>,
    /// When set, exchange_link_artifact fails with ExpiredArtifact
    pub expire_link_artifact: AtomicBool,
    /// When set, create_charge fails with a terminal decline
    pub decline_charge: AtomicBool,
    /// email -> customer id of customers created so far
    pub customers: Mutex<HashMap<String, String>>,
    /// idempotency key -> intent id; repeated keys never create a second
    /// charge
    charges: Mutex<HashMap<String, String>>,
    /// Number of distinct charges actually created
    pub distinct_charges: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_charge_status(&self, status: ChargeStatus) {
        *self.charge_status.lock().unwrap() = Some(status);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_bank_link_session(
        &self,
        _user_ref: &str,
        _company_name: &str,
    ) -> Result<LinkSession, GatewayError> {
        Ok(LinkSession {
            link_token: "link-sandbox-test-token".to_string(),
            expiration: chrono::Utc::now() + chrono::Duration::hours(4),
        })
    }

    async fn exchange_link_artifact(
        &self,
        public_token: &str,
        _account_id: &str,
    ) -> Result<LinkExchange, GatewayError> {
        if self.expire_link_artifact.load(Ordering::SeqCst) {
            return Err(GatewayError::ExpiredArtifact(
                "public token expired".to_string(),
            ));
        }
        Ok(LinkExchange {
            access_token: format!("access-test-{}", public_token),
            item_id: "item_test".to_string(),
        })
    }

    async fn create_charge_token(
        &self,
        _access_token: &str,
        _account_id: &str,
    ) -> Result<String, GatewayError> {
        Ok("btok_test".to_string())
    }

    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>, GatewayError> {
        Ok(self.customers.lock().unwrap().get(email).cloned())
    }

    async fn create_customer(
        &self,
        email: &str,
        _display_name: &str,
        _metadata: HashMap<String, String>,
    ) -> Result<String, GatewayError> {
        let mut customers = self.customers.lock().unwrap();
        let id = format!("cus_{}", customers.len() + 1);
        customers.insert(email.to_string(), id.clone());
        Ok(id)
    }

    async fn create_payment_method(
        &self,
        _customer_id: &str,
        _processor_token: &str,
        _holder_type: AccountHolderType,
    ) -> Result<String, GatewayError> {
        Ok("pm_test".to_string())
    }

    async fn create_charge(
        &self,
        _customer_id: &str,
        _payment_method_id: &str,
        _amount_cents: i64,
        idempotency_key: &str,
        _metadata: HashMap<String, String>,
    ) -> Result<ChargeOutcome, GatewayError> {
        if self.decline_charge.load(Ordering::SeqCst) {
            return Err(GatewayError::Terminal {
                code: "insufficient_funds".to_string(),
                message: "raw provider decline text".to_string(),
            });
        }

        let status = self
            .charge_status
            .lock()
            .unwrap()
            .unwrap_or(ChargeStatus::Succeeded);

        let mut charges = self.charges.lock().unwrap();
        let intent_id = match charges.get(idempotency_key) {
            Some(existing) => existing.clone(),
            None => {
                let n = self.distinct_charges.fetch_add(1, Ordering::SeqCst) + 1;
                let id = format!("pi_test_{}", n);
                charges.insert(idempotency_key.to_string(), id.clone());
                id
            }
        };

        Ok(ChargeOutcome {
            payment_intent_id: intent_id,
            status,
        })
    }

    async fn create_subscription(
        &self,
        _customer_id: &str,
        _price_id: &str,
        _payment_method_types: &[&str],
    ) -> Result<SubscriptionOutcome, GatewayError> {
        Ok(SubscriptionOutcome {
            subscription_id: "sub_test_1".to_string(),
            status: "incomplete".to_string(),
            client_secret: Some("pi_test_secret".to_string()),
        })
    }
}

/// In-memory company store enforcing the same unique constraints as the
/// companies table; `fail_next_set_owner` simulates the datastore
/// rejecting the owner backfill so rollback paths can be exercised
#[derive(Default)]
pub struct InMemoryCompanyRepository {
    pub rows: Mutex<Vec<Company>>,
    pub fail_next_set_owner: AtomicBool,
}

#[async_trait]
impl CompanyRepository for InMemoryCompanyRepository {
    async fn insert(&self, company: &Company) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|c| {
            c.email() == company.email() || c.stripe_customer_id() == company.stripe_customer_id()
        }) {
            return Err(RepositoryError::Duplicate {
                constraint: "companies_email_key".to_string(),
            });
        }
        rows.push(company.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned())
    }

    async fn find_by_email_or_customer_id(
        &self,
        email: &Email,
        stripe_customer_id: &str,
    ) -> Result<Option<Company>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.email() == email || c.stripe_customer_id() == stripe_customer_id)
            .cloned())
    }

    async fn set_owner(&self, company_id: Uuid, owner_id: Uuid) -> Result<(), RepositoryError> {
        if self.fail_next_set_owner.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Database(
                "simulated owner backfill failure".to_string(),
            ));
        }
        let mut rows = self.rows.lock().unwrap();
        let company = rows
            .iter_mut()
            .find(|c| c.id() == company_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("company {}", company_id)))?;
        let mut updated = company.clone();
        updated
            .assign_owner(owner_id)
            .map_err(RepositoryError::Database)?;
        *company = updated;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.rows.lock().unwrap().retain(|c| c.id() != id);
        Ok(())
    }
}

/// In-memory user store; `fail_next_create` simulates the datastore
/// rejecting the owner insert so rollback paths can be exercised
#[derive(Default)]
pub struct InMemoryUserRepository {
    pub rows: Mutex<Vec<User>>,
    pub fail_next_create: AtomicBool,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<Uuid, RepositoryError> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Database(
                "simulated user insert failure".to_string(),
            ));
        }
        let id = user.id;
        self.rows.lock().unwrap().push(user);
        Ok(id)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.rows.lock().unwrap().retain(|u| u.id != id);
        Ok(())
    }
}

/// In-memory payment store
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    pub rows: Mutex<Vec<PaymentRecord>>,
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: &PaymentRecord) -> Result<(), RepositoryError> {
        self.rows.lock().unwrap().push(payment.clone());
        Ok(())
    }

    async fn update(&self, payment: &PaymentRecord) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|p| p.id() == payment.id())
            .ok_or_else(|| RepositoryError::NotFound(format!("payment {}", payment.id())))?;
        *row = payment.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentRecord>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id() == id)
            .cloned())
    }

    async fn find_by_intent_id(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentRecord>, RepositoryError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| {
                p.payment_intent_id() == Some(payment_intent_id)
                    || p.charge_id() == Some(payment_intent_id)
            })
            .cloned())
    }
}

/// Everything a test needs to drive the system and inspect its state
pub struct TestHarness {
    pub gateway: Arc<FakeGateway>,
    pub companies: Arc<InMemoryCompanyRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub payments: Arc<InMemoryPaymentRepository>,
    pub orchestrator: Arc<SignupOrchestrator>,
}

pub fn harness() -> TestHarness {
    let gateway = Arc::new(FakeGateway::new());
    let companies = Arc::new(InMemoryCompanyRepository::default());
    let users = Arc::new(InMemoryUserRepository::default());
    let payments = Arc::new(InMemoryPaymentRepository::default());
    let orchestrator = Arc::new(SignupOrchestrator::new(
        gateway.clone(),
        companies.clone(),
        users.clone(),
        payments.clone(),
    ));
    TestHarness {
        gateway,
        companies,
        users,
        payments,
        orchestrator,
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgresql://localhost/unused".to_string(),
        port: 3000,
        stripe_secret_key: "sk_test_x".to_string(),
        webhook_signing_secret: WEBHOOK_SECRET.to_string(),
        plaid_client_id: "plaid_id".to_string(),
        plaid_secret: "plaid_secret".to_string(),
        plaid_env: "sandbox".to_string(),
        price_id_starter: "price_starter".to_string(),
        price_id_growth: "price_growth".to_string(),
        price_id_enterprise: "price_enterprise".to_string(),
        public_base_url: "http://localhost:3000".to_string(),
    }
}

/// Builds the app router with the same route table as main
pub fn router(harness: &TestHarness) -> Router {
    let state = AppState::new(harness.orchestrator.clone(), Arc::new(test_config()));
    Router::new()
        .route("/health", get(signup::health_check))
        .route("/api/signup/link-token", post(signup::create_link_token))
        .route("/api/signup", post(signup::initiate_signup))
        .route("/api/signup/complete", post(signup::complete_signup))
        .route("/api/webhooks/transfers", post(webhooks::transfers))
        .with_state(state)
}
