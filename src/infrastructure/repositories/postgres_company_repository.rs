use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::map_sqlx_error;
use crate::domain::company::value_objects::{SubscriptionStatus, SubscriptionTier};
use crate::domain::company::Company;
use crate::domain::repositories::{CompanyRepository, RepositoryError};
use crate::domain::user::value_objects::Email;

/// PostgreSQL implementation of CompanyRepository
///
/// The `companies` table carries unique constraints on `email` and
/// `stripe_customer_id`; inserts that lose a provisioning race surface as
/// `RepositoryError::Duplicate`.
pub struct PostgresCompanyRepository {
    pool: PgPool,
}

impl PostgresCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CompanyRow {
    id: Uuid,
    company_code: String,
    name: String,
    email: String,
    owner_id: Option<Uuid>,
    stripe_customer_id: String,
    subscription_tier: String,
    subscription_status: String,
    onboarding_complete: bool,
    created_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_domain(self) -> Result<Company, RepositoryError> {
        let email = Email::new(&self.email).map_err(RepositoryError::Database)?;
        let tier: SubscriptionTier = self
            .subscription_tier
            .parse()
            .map_err(RepositoryError::Database)?;
        let status: SubscriptionStatus = self
            .subscription_status
            .parse()
            .map_err(RepositoryError::Database)?;
        Ok(Company::from_persistence(
            self.id,
            self.company_code,
            self.name,
            email,
            self.owner_id,
            self.stripe_customer_id,
            tier,
            status,
            self.onboarding_complete,
            self.created_at,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, company_code, name, email, owner_id, stripe_customer_id, \
     subscription_tier, subscription_status, onboarding_complete, created_at";

#[async_trait]
impl CompanyRepository for PostgresCompanyRepository {
    async fn insert(&self, company: &Company) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO companies (
                id, company_code, name, email, owner_id, stripe_customer_id,
                subscription_tier, subscription_status, onboarding_complete, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(company.id())
        .bind(company.company_code())
        .bind(company.name())
        .bind(company.email().as_str())
        .bind(company.owner_id())
        .bind(company.stripe_customer_id())
        .bind(company.subscription_tier().to_string())
        .bind(company.subscription_status().to_string())
        .bind(company.onboarding_complete())
        .bind(company.created_at())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError> {
        let row: Option<CompanyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM companies WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(CompanyRow::into_domain).transpose()
    }

    async fn find_by_email_or_customer_id(
        &self,
        email: &Email,
        stripe_customer_id: &str,
    ) -> Result<Option<Company>, RepositoryError> {
        let row: Option<CompanyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM companies WHERE email = $1 OR stripe_customer_id = $2 LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(email.as_str())
        .bind(stripe_customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(CompanyRow::into_domain).transpose()
    }

    async fn set_owner(&self, company_id: Uuid, owner_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE companies SET owner_id = $2 WHERE id = $1")
            .bind(company_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "company {}",
                company_id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
