//! Integration tests for the Postgres repository layer
//!
//! These run against a real database and are ignored by default; set
//! DATABASE_URL to a migrated test database and run with
//! `cargo test -- --ignored`.

use crewbase_api::domain::company::value_objects::SubscriptionTier;
use crewbase_api::domain::company::Company;
use crewbase_api::domain::payment::value_objects::{PaymentStatus, PaymentType};
use crewbase_api::domain::payment::PaymentRecord;
use crewbase_api::domain::repositories::{
    CompanyRepository, PaymentRepository, User, UserRepository,
};
use crewbase_api::domain::user::value_objects::{Email, UserRole};
use crewbase_api::infrastructure::repositories::{
    PostgresCompanyRepository, PostgresPaymentRepository, PostgresUserRepository,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Set up test database connection pool
async fn setup_test_db() -> PgPool {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database")
}

fn unique_email() -> Email {
    Email::new(format!("it-{}@example.com", Uuid::new_v4().simple())).expect("valid email")
}

fn test_company(email: Email) -> Company {
    Company::new(
        "Integration Test Co",
        email,
        format!("cus_it_{}", Uuid::new_v4().simple()),
        SubscriptionTier::Starter,
    )
    .expect("valid company")
}

/// Clean up test data after each test; users cascade with the company
async fn cleanup_company(pool: &PgPool, company_id: Uuid) {
    sqlx::query("DELETE FROM payments WHERE company_id = $1")
        .bind(company_id)
        .execute(pool)
        .await
        .expect("Failed to cleanup payments");
    sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(company_id)
        .execute(pool)
        .await
        .expect("Failed to cleanup company");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated test database"]
async fn test_company_insert_and_find_by_idempotency_anchors() {
    let pool = setup_test_db().await;
    let repo = PostgresCompanyRepository::new(pool.clone());

    let email = unique_email();
    let company = test_company(email.clone());
    repo.insert(&company).await.expect("Failed to insert company");

    let by_email = repo
        .find_by_email_or_customer_id(&email, "cus_never_matches")
        .await
        .expect("lookup by email")
        .expect("company found by email");
    assert_eq!(by_email.id(), company.id());

    let by_customer = repo
        .find_by_email_or_customer_id(
            &Email::new("other@example.com").unwrap(),
            company.stripe_customer_id(),
        )
        .await
        .expect("lookup by customer id")
        .expect("company found by customer id");
    assert_eq!(by_customer.id(), company.id());

    cleanup_company(&pool, company.id()).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated test database"]
async fn test_duplicate_company_email_surfaces_as_duplicate() {
    let pool = setup_test_db().await;
    let repo = PostgresCompanyRepository::new(pool.clone());

    let email = unique_email();
    let first = test_company(email.clone());
    repo.insert(&first).await.expect("Failed to insert company");

    let second = test_company(email);
    let result = repo.insert(&second).await;
    assert!(result.expect_err("duplicate rejected").is_duplicate());

    cleanup_company(&pool, first.id()).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated test database"]
async fn test_owner_backfill_and_user_roundtrip() {
    let pool = setup_test_db().await;
    let companies = PostgresCompanyRepository::new(pool.clone());
    let users = PostgresUserRepository::new(pool.clone());

    let email = unique_email();
    let company = test_company(email.clone());
    companies.insert(&company).await.expect("insert company");

    let owner = User {
        id: Uuid::new_v4(),
        company_id: company.id(),
        email: email.clone(),
        full_name: "Integration Owner".to_string(),
        role: UserRole::Owner,
        is_active: true,
    };
    let user_id = users.create(owner).await.expect("create owner");

    companies
        .set_owner(company.id(), user_id)
        .await
        .expect("backfill owner");

    let reloaded = companies
        .find_by_id(company.id())
        .await
        .expect("reload company")
        .expect("company exists");
    assert_eq!(reloaded.owner_id(), Some(user_id));

    let found = users
        .find_by_email(&email)
        .await
        .expect("find user")
        .expect("user exists");
    assert_eq!(found.id, user_id);
    assert_eq!(found.role, UserRole::Owner);

    cleanup_company(&pool, company.id()).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a migrated test database"]
async fn test_payment_lifecycle_roundtrip() {
    let pool = setup_test_db().await;
    let payments = PostgresPaymentRepository::new(pool.clone());

    let email = unique_email();
    let mut payment = PaymentRecord::new(
        Decimal::new(4900, 2),
        PaymentType::InitialSubscription,
        format!("cus_it_{}", Uuid::new_v4().simple()),
        "Integration Test Co",
        email,
        "Integration Owner",
        SubscriptionTier::Starter,
    )
    .expect("valid payment");

    payments.insert(&payment).await.expect("insert payment");

    let intent_id = format!("pi_it_{}", Uuid::new_v4().simple());
    payment.mark_processing(intent_id.clone()).expect("processing");
    payments.update(&payment).await.expect("update payment");

    let found = payments
        .find_by_intent_id(&intent_id)
        .await
        .expect("find by intent")
        .expect("payment exists");
    assert_eq!(found.id(), payment.id());
    assert_eq!(found.status(), PaymentStatus::Processing);
    assert_eq!(found.payment_intent_id(), Some(intent_id.as_str()));

    payment.mark_succeeded(None).expect("succeed");
    payments.update(&payment).await.expect("update payment");

    let settled = payments
        .find_by_id(payment.id())
        .await
        .expect("reload")
        .expect("payment exists");
    assert_eq!(settled.status(), PaymentStatus::Succeeded);
    assert!(settled.billing_period_end().is_some());

    sqlx::query("DELETE FROM payments WHERE id = $1")
        .bind(payment.id())
        .execute(&pool)
        .await
        .expect("cleanup payment");
}
