use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entities::PixTransfer;
use crate::domain::error::TransferError;
use crate::domain::repository::PixTransferRepository;
use crate::domain::types::TransferId;
use crate::infrastructure::persistence::models::PixTransferModel;

/// Repositorio de transferencias Pix basado en PostgreSQL.
///
/// `create` y las transiciones de estado (`confirm`/`reject`) corren cada una
/// en su propia transacción SERIALIZABLE — el equivalente práctico de
/// REQUIRES_NEW en un pool de conexiones sin contexto transaccional
/// ambiente — igual que `wallet_service::engine::WalletEngine` hace para sus
/// mutaciones.
pub struct PostgresPixTransferRepository {
    pool: PgPool,
}

impl PostgresPixTransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn classify_insert_error(err: sqlx::Error) -> TransferError {
    let msg = err.to_string();
    if msg.contains("pix_transfers_end_to_end_id_key")
        || msg.contains("pix_transfers_idempotency_key_key")
    {
        TransferError::DataIntegrityViolation(msg)
    } else {
        TransferError::RepositoryError(msg)
    }
}

#[async_trait]
impl PixTransferRepository for PostgresPixTransferRepository {
    #[tracing::instrument(name = "PostgresPixTransferRepository::create", skip(self, transfer))]
    async fn create(&self, transfer: PixTransfer) -> Result<PixTransfer, TransferError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        let status = transfer.status();
        let model = sqlx::query_as::<_, PixTransferModel>(
            r#"
            INSERT INTO pix_transfers (
                id, end_to_end_id, idempotency_key, from_wallet_id, to_pix_key,
                amount_cents, status, rejection_reason, version, created_at,
                confirmed_at, rejected_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, end_to_end_id, idempotency_key, from_wallet_id, to_pix_key,
                      amount_cents, status, rejection_reason, version, created_at,
                      confirmed_at, rejected_at
            "#,
        )
        .bind(transfer.id())
        .bind(transfer.end_to_end_id())
        .bind(transfer.idempotency_key())
        .bind(transfer.from_wallet_id())
        .bind(transfer.to_pix_key())
        .bind(transfer.amount().minor_units())
        .bind(PixTransferModel::status_db(status))
        .bind(PixTransferModel::rejection_reason(status))
        .bind(transfer.version())
        .bind(transfer.created_at())
        .bind(PixTransferModel::confirmed_at(status))
        .bind(PixTransferModel::rejected_at(status))
        .fetch_one(&mut *tx)
        .await
        .map_err(classify_insert_error)?;

        tx.commit()
            .await
            .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        Ok(model.into())
    }

    async fn find_by_id(&self, id: TransferId) -> Result<Option<PixTransfer>, TransferError> {
        let model_opt = sqlx::query_as::<_, PixTransferModel>(
            r#"
            SELECT id, end_to_end_id, idempotency_key, from_wallet_id, to_pix_key,
                   amount_cents, status, rejection_reason, version, created_at,
                   confirmed_at, rejected_at
            FROM pix_transfers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    async fn find_by_end_to_end_id(
        &self,
        end_to_end_id: &str,
    ) -> Result<Option<PixTransfer>, TransferError> {
        let model_opt = sqlx::query_as::<_, PixTransferModel>(
            r#"
            SELECT id, end_to_end_id, idempotency_key, from_wallet_id, to_pix_key,
                   amount_cents, status, rejection_reason, version, created_at,
                   confirmed_at, rejected_at
            FROM pix_transfers
            WHERE end_to_end_id = $1
            "#,
        )
        .bind(end_to_end_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    async fn find_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<PixTransfer>, TransferError> {
        let model_opt = sqlx::query_as::<_, PixTransferModel>(
            r#"
            SELECT id, end_to_end_id, idempotency_key, from_wallet_id, to_pix_key,
                   amount_cents, status, rejection_reason, version, created_at,
                   confirmed_at, rejected_at
            FROM pix_transfers
            WHERE idempotency_key = $1
            "#,
        )
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    #[tracing::instrument(name = "PostgresPixTransferRepository::confirm", skip(self))]
    async fn confirm(
        &self,
        end_to_end_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PixTransfer, TransferError> {
        self.transition(end_to_end_id, |transfer| transfer.confirm(at))
            .await
    }

    #[tracing::instrument(name = "PostgresPixTransferRepository::reject", skip(self, reason))]
    async fn reject(
        &self,
        end_to_end_id: &str,
        at: DateTime<Utc>,
        reason: String,
    ) -> Result<PixTransfer, TransferError> {
        self.transition(end_to_end_id, |transfer| transfer.reject(at, reason.clone()))
            .await
    }
}

impl PostgresPixTransferRepository {
    async fn transition<F>(&self, end_to_end_id: &str, apply: F) -> Result<PixTransfer, TransferError>
    where
        F: FnOnce(&mut PixTransfer) -> Result<(), TransferError>,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        let model = sqlx::query_as::<_, PixTransferModel>(
            r#"
            SELECT id, end_to_end_id, idempotency_key, from_wallet_id, to_pix_key,
                   amount_cents, status, rejection_reason, version, created_at,
                   confirmed_at, rejected_at
            FROM pix_transfers
            WHERE end_to_end_id = $1
            FOR UPDATE
            "#,
        )
        .bind(end_to_end_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| TransferError::RepositoryError(e.to_string()))?
        .ok_or_else(|| TransferError::NotFound(TransferId::new()))?;

        let mut transfer: PixTransfer = model.into();
        let previous_version = transfer.version();
        apply(&mut transfer)?;

        let status = transfer.status();
        sqlx::query(
            r#"
            UPDATE pix_transfers
            SET status = $1, rejection_reason = $2, confirmed_at = $3,
                rejected_at = $4, version = $5
            WHERE end_to_end_id = $6 AND version = $7
            "#,
        )
        .bind(PixTransferModel::status_db(status))
        .bind(PixTransferModel::rejection_reason(status))
        .bind(PixTransferModel::confirmed_at(status))
        .bind(PixTransferModel::rejected_at(status))
        .bind(transfer.version())
        .bind(end_to_end_id)
        .bind(previous_version)
        .execute(&mut *tx)
        .await
        .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| TransferError::RepositoryError(e.to_string()))?;

        Ok(transfer)
    }
}
