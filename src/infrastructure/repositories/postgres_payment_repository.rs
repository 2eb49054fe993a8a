use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::map_sqlx_error;
use crate::domain::company::value_objects::SubscriptionTier;
use crate::domain::payment::value_objects::{AchStatus, PaymentStatus, PaymentType};
use crate::domain::payment::PaymentRecord;
use crate::domain::repositories::{PaymentRepository, RepositoryError};
use crate::domain::user::value_objects::Email;

/// PostgreSQL implementation of PaymentRepository
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: Uuid,
    company_id: Option<Uuid>,
    amount: Decimal,
    status: String,
    payment_type: String,
    ach_status: String,
    stripe_customer_id: String,
    payment_method_id: Option<String>,
    payment_intent_id: Option<String>,
    charge_id: Option<String>,
    company_name: String,
    company_email: String,
    owner_name: String,
    subscription_tier: String,
    billing_period_start: Option<DateTime<Utc>>,
    billing_period_end: Option<DateTime<Utc>>,
    failure_code: Option<String>,
    failure_message: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_domain(self) -> Result<PaymentRecord, RepositoryError> {
        let status: PaymentStatus = self.status.parse().map_err(RepositoryError::Database)?;
        let payment_type: PaymentType =
            self.payment_type.parse().map_err(RepositoryError::Database)?;
        let ach_status: AchStatus = self.ach_status.parse().map_err(RepositoryError::Database)?;
        let tier: SubscriptionTier = self
            .subscription_tier
            .parse()
            .map_err(RepositoryError::Database)?;
        let email = Email::new(&self.company_email).map_err(RepositoryError::Database)?;

        Ok(PaymentRecord::from_persistence(
            self.id,
            self.company_id,
            self.amount,
            status,
            payment_type,
            ach_status,
            self.stripe_customer_id,
            self.payment_method_id,
            self.payment_intent_id,
            self.charge_id,
            self.company_name,
            email,
            self.owner_name,
            tier,
            self.billing_period_start,
            self.billing_period_end,
            self.failure_code,
            self.failure_message,
            self.created_at,
            self.processed_at,
            self.failed_at,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, company_id, amount, status, payment_type, ach_status, \
     stripe_customer_id, payment_method_id, payment_intent_id, charge_id, \
     company_name, company_email, owner_name, subscription_tier, \
     billing_period_start, billing_period_end, failure_code, failure_message, \
     created_at, processed_at, failed_at";

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &PaymentRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, company_id, amount, status, payment_type, ach_status,
                stripe_customer_id, payment_method_id, payment_intent_id, charge_id,
                company_name, company_email, owner_name, subscription_tier,
                billing_period_start, billing_period_end, failure_code, failure_message,
                created_at, processed_at, failed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(payment.id())
        .bind(payment.company_id())
        .bind(payment.amount())
        .bind(payment.status().to_string())
        .bind(payment.payment_type().to_string())
        .bind(payment.ach_status().to_string())
        .bind(payment.stripe_customer_id())
        .bind(payment.payment_method_id())
        .bind(payment.payment_intent_id())
        .bind(payment.charge_id())
        .bind(payment.company_name())
        .bind(payment.company_email().as_str())
        .bind(payment.owner_name())
        .bind(payment.subscription_tier().to_string())
        .bind(payment.billing_period_start())
        .bind(payment.billing_period_end())
        .bind(payment.failure_code())
        .bind(payment.failure_message())
        .bind(payment.created_at())
        .bind(payment.processed_at())
        .bind(payment.failed_at())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, payment: &PaymentRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                company_id = $2,
                status = $3,
                ach_status = $4,
                payment_method_id = $5,
                payment_intent_id = $6,
                charge_id = $7,
                billing_period_start = $8,
                billing_period_end = $9,
                failure_code = $10,
                failure_message = $11,
                processed_at = $12,
                failed_at = $13
            WHERE id = $1
            "#,
        )
        .bind(payment.id())
        .bind(payment.company_id())
        .bind(payment.status().to_string())
        .bind(payment.ach_status().to_string())
        .bind(payment.payment_method_id())
        .bind(payment.payment_intent_id())
        .bind(payment.charge_id())
        .bind(payment.billing_period_start())
        .bind(payment.billing_period_end())
        .bind(payment.failure_code())
        .bind(payment.failure_message())
        .bind(payment.processed_at())
        .bind(payment.failed_at())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("payment {}", payment.id())));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentRecord>, RepositoryError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(PaymentRow::into_domain).transpose()
    }

    async fn find_by_intent_id(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<PaymentRecord>, RepositoryError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE payment_intent_id = $1 OR charge_id = $1 LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(PaymentRow::into_domain).transpose()
    }
}
