use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::map_sqlx_error;
use crate::domain::repositories::{RepositoryError, User, UserRepository};
use crate::domain::user::value_objects::{Email, UserRole};

/// PostgreSQL implementation of UserRepository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    company_id: Uuid,
    email: String,
    full_name: String,
    role: String,
    is_active: bool,
}

impl UserRow {
    fn into_domain(self) -> Result<User, RepositoryError> {
        let email = Email::new(&self.email).map_err(RepositoryError::Database)?;
        let role: UserRole = self.role.parse().map_err(RepositoryError::Database)?;
        Ok(User {
            id: self.id,
            company_id: self.company_id,
            email,
            full_name: self.full_name,
            role,
            is_active: self.is_active,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: User) -> Result<Uuid, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, company_id, email, full_name, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(user.company_id)
        .bind(user.email.as_str())
        .bind(&user.full_name)
        .bind(user.role.to_string())
        .bind(user.is_active)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(user.id)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, company_id, email, full_name, role, is_active FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(UserRow::into_domain).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, company_id, email, full_name, role, is_active FROM users WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(UserRow::into_domain).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
