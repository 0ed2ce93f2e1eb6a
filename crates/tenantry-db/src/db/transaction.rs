//! Transaction wrapper for multi-statement writes

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tenantry_core::AppError;

/// A database transaction that must be explicitly committed.
///
/// Dropping an unfinished guard logs a warning; sqlx rolls the transaction back when the
/// connection returns to the pool.
///
/// ```ignore
/// let mut tx = TransactionGuard::begin(&pool).await?;
/// sqlx::query("INSERT INTO ...").execute(tx.conn()?).await?;
/// tx.commit().await?;
/// ```
pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl TransactionGuard {
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let transaction = pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to begin database transaction");
            AppError::Database(e)
        })?;

        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection to run statements on inside the transaction.
    pub fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        self.transaction
            .as_mut()
            .map(|tx| &mut **tx)
            .ok_or_else(|| AppError::Internal("Transaction already finished".to_string()))
    }

    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to commit database transaction");
                AppError::Database(e)
            })?;
        }
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to rollback database transaction");
                AppError::Database(e)
            })?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}
