use crate::domain::entities::LedgerEntry;
use crate::domain::error::WalletError;
use crate::domain::repository::LedgerRepository;
use crate::domain::types::WalletId;
use crate::infrastructure::persistence::models::LedgerEntryModel;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Repositorio de asientos del libro mayor basado en PostgreSQL.
///
/// Es de solo lectura desde la perspectiva de este puerto: el Wallet Engine
/// inserta asientos directamente dentro de su propia transacción para poder
/// combinarlos con el `SELECT ... FOR UPDATE` de la wallet.
pub struct PostgresLedgerRepository {
    pool: PgPool,
}

impl PostgresLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn find_by_wallet_id(&self, wallet_id: WalletId) -> Result<Vec<LedgerEntry>, WalletError> {
        let models = sqlx::query_as::<_, LedgerEntryModel>(
            r#"
            SELECT id, wallet_id, signed_amount_cents, entry_type, description,
                   transaction_id, balance_after_cents, created_at
            FROM ledger_entries
            WHERE wallet_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(wallet_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(models.into_iter().map(|m| m.into()).collect())
    }

    async fn sum_signed_amount_up_to(
        &self,
        wallet_id: WalletId,
        at: DateTime<Utc>,
    ) -> Result<i64, WalletError> {
        let sum: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(signed_amount_cents)
            FROM ledger_entries
            WHERE wallet_id = $1 AND created_at <= $2
            "#,
        )
        .bind(wallet_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(sum.unwrap_or(0))
    }
}
