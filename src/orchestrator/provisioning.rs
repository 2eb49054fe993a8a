//! Idempotent company provisioning.
//!
//! The only place in the system approximating a transaction. Insert order
//! is Company -> User -> backfill owner_id; rollback order is the reverse
//! (delete User if created, then Company), triggered by the first failure.
//! The datastore offers no multi-row transactions across these tables, so
//! the unique constraints on company email and customer id are what keep
//! racing invocations from provisioning twice.

use uuid::Uuid;

use super::SignupError;
use crate::domain::company::value_objects::SubscriptionTier;
use crate::domain::company::Company;
use crate::domain::repositories::{CompanyRepository, User, UserRepository};
use crate::domain::user::value_objects::{Email, UserRole};

/// Result of a provisioning attempt
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub company_id: Uuid,
    /// None when the company already existed; the owner id of an existing
    /// company is not re-fetched here
    pub user_id: Option<Uuid>,
    /// True when provisioning was a no-op because the company was already
    /// there (replayed webhook, racing signup, duplicate email)
    pub already_existed: bool,
}

/// Create-if-absent company provisioning with saga rollback.
///
/// 1. Look up by email OR customer id; if found, return it with
///    `already_existed = true` and perform no writes.
/// 2. Insert the company, then the owner user, then backfill `owner_id`.
/// 3. On any step failure, delete the rows created so far in reverse
///    order. A failed owner backfill also rolls back both rows -- partial
///    companies never survive an invocation.
pub async fn provision_company(
    companies: &dyn CompanyRepository,
    users: &dyn UserRepository,
    company_name: &str,
    company_email: Email,
    owner_name: &str,
    stripe_customer_id: &str,
    tier: SubscriptionTier,
) -> Result<Provisioned, SignupError> {
    if let Some(existing) = companies
        .find_by_email_or_customer_id(&company_email, stripe_customer_id)
        .await?
    {
        tracing::info!(
            company_id = %existing.id(),
            email = %company_email,
            "company already provisioned"
        );
        return Ok(Provisioned {
            company_id: existing.id(),
            user_id: existing.owner_id(),
            already_existed: true,
        });
    }

    let company = Company::new(company_name, company_email.clone(), stripe_customer_id, tier)
        .map_err(SignupError::RolledBack)?;
    let company_id = company.id();

    match companies.insert(&company).await {
        Ok(()) => {}
        Err(err) if err.is_duplicate() => {
            // Lost the race to a concurrent invocation; resolve to the row
            // that won.
            let existing = companies
                .find_by_email_or_customer_id(&company_email, stripe_customer_id)
                .await?
                .ok_or(err)?;
            return Ok(Provisioned {
                company_id: existing.id(),
                user_id: existing.owner_id(),
                already_existed: true,
            });
        }
        Err(err) => return Err(err.into()),
    }

    // The identity provider allocates user ids; this one stands in until
    // the auth callback links the real subject.
    let owner = User {
        id: Uuid::new_v4(),
        company_id,
        email: company_email.clone(),
        full_name: owner_name.to_string(),
        role: UserRole::Owner,
        is_active: true,
    };

    let user_id = match users.create(owner).await {
        Ok(id) => id,
        Err(err) => {
            tracing::error!(company_id = %company_id, "owner creation failed, rolling back: {}", err);
            rollback(companies, users, company_id, None).await;
            return Err(SignupError::RolledBack(format!(
                "owner user creation failed: {}",
                err
            )));
        }
    };

    if let Err(err) = companies.set_owner(company_id, user_id).await {
        tracing::error!(
            company_id = %company_id,
            user_id = %user_id,
            "owner backfill failed, rolling back: {}",
            err
        );
        rollback(companies, users, company_id, Some(user_id)).await;
        return Err(SignupError::RolledBack(format!(
            "owner backfill failed: {}",
            err
        )));
    }

    tracing::info!(
        company_id = %company_id,
        user_id = %user_id,
        email = %company_email,
        "company provisioned"
    );
    Ok(Provisioned {
        company_id,
        user_id: Some(user_id),
        already_existed: false,
    })
}

/// Best-effort compensating deletes, user first then company.
/// Failures are logged for manual remediation; there is nothing further to
/// unwind.
async fn rollback(
    companies: &dyn CompanyRepository,
    users: &dyn UserRepository,
    company_id: Uuid,
    user_id: Option<Uuid>,
) {
    if let Some(user_id) = user_id {
        if let Err(err) = users.delete(user_id).await {
            tracing::error!(user_id = %user_id, "rollback failed to delete user: {}", err);
        }
    }
    if let Err(err) = companies.delete(company_id).await {
        tracing::error!(company_id = %company_id, "rollback failed to delete company: {}", err);
    }
}
