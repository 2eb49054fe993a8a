pub mod postgres_company_repository;
pub mod postgres_payment_repository;
pub mod postgres_user_repository;

pub use postgres_company_repository::PostgresCompanyRepository;
pub use postgres_payment_repository::PostgresPaymentRepository;
pub use postgres_user_repository::PostgresUserRepository;

use crate::domain::repositories::RepositoryError;

/// Maps a sqlx error into the repository taxonomy.
///
/// Unique-constraint violations (SQLSTATE 23505) become `Duplicate`, which
/// the provisioning saga treats as "lost the race", not a failure.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return RepositoryError::Duplicate {
                constraint: db_err
                    .constraint()
                    .unwrap_or("unique constraint")
                    .to_string(),
            };
        }
    }
    RepositoryError::Database(err.to_string())
}
