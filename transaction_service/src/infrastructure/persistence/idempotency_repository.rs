use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entities::IdempotencyRecord;
use crate::domain::error::IdempotencyError;
use crate::domain::repository::IdempotencyRepository;
use crate::infrastructure::persistence::models::IdempotencyRecordModel;

/// Capa persistente del servicio de idempotencia. La cache en memoria de
/// `idempotency::IdempotencyService` vive delante de este repositorio — nunca
/// lo reemplaza, solo evita ir a base de datos en el camino feliz.
pub struct PostgresIdempotencyRepository {
    pool: PgPool,
}

impl PostgresIdempotencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyRepository for PostgresIdempotencyRepository {
    async fn find(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyError> {
        let model_opt = sqlx::query_as::<_, IdempotencyRecordModel>(
            r#"
            SELECT id, scope, idempotency_key, request_hash, response_body,
                   response_status, created_at, expires_at
            FROM idempotency_records
            WHERE scope = $1 AND idempotency_key = $2
            "#,
        )
        .bind(scope)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| IdempotencyError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    #[tracing::instrument(name = "PostgresIdempotencyRepository::insert_or_get_existing", skip(self, record))]
    async fn insert_or_get_existing(
        &self,
        record: IdempotencyRecord,
    ) -> Result<IdempotencyRecord, IdempotencyError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IdempotencyError::RepositoryError(e.to_string()))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| IdempotencyError::RepositoryError(e.to_string()))?;

        let inserted = sqlx::query_as::<_, IdempotencyRecordModel>(
            r#"
            INSERT INTO idempotency_records (
                id, scope, idempotency_key, request_hash, response_body,
                response_status, created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (scope, idempotency_key) DO NOTHING
            RETURNING id, scope, idempotency_key, request_hash, response_body,
                      response_status, created_at, expires_at
            "#,
        )
        .bind(record.id())
        .bind(record.scope())
        .bind(record.key())
        .bind(record.request_hash())
        .bind(record.response_body())
        .bind(record.response_status() as i16)
        .bind(record.created_at())
        .bind(record.expires_at())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| IdempotencyError::RepositoryError(e.to_string()))?;

        let result = match inserted {
            Some(model) => model,
            None => sqlx::query_as::<_, IdempotencyRecordModel>(
                r#"
                SELECT id, scope, idempotency_key, request_hash, response_body,
                       response_status, created_at, expires_at
                FROM idempotency_records
                WHERE scope = $1 AND idempotency_key = $2
                "#,
            )
            .bind(record.scope())
            .bind(record.key())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| IdempotencyError::RepositoryError(e.to_string()))?,
        };

        tx.commit()
            .await
            .map_err(|e| IdempotencyError::RepositoryError(e.to_string()))?;

        Ok(result.into())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyError> {
        let result = sqlx::query("DELETE FROM idempotency_records WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| IdempotencyError::RepositoryError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
