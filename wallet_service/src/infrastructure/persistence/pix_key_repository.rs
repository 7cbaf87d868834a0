use crate::domain::entities::{PixKey, PixKeyType};
use crate::domain::error::PixKeyError;
use crate::domain::repository::PixKeyRepository;
use crate::domain::types::PixKeyId;
use crate::infrastructure::persistence::models::PixKeyModel;
use async_trait::async_trait;
use sqlx::PgPool;

/// Repositorio de claves Pix basado en PostgreSQL.
///
/// La unicidad de una clave activa (`key_value`, `key_type`) se garantiza con
/// un índice único parcial (`WHERE is_active`) en lugar de un `SELECT`
/// previo — el registro concurrente de la misma clave falla limpiamente en
/// el `INSERT` y se traduce a `PixKeyError::AlreadyActive`.
pub struct PostgresPixKeyRepository {
    pool: PgPool,
}

impl PostgresPixKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PixKeyRepository for PostgresPixKeyRepository {
    async fn create(&self, pix_key: PixKey) -> Result<PixKey, PixKeyError> {
        let saved_model = sqlx::query_as::<_, PixKeyModel>(
            r#"
            INSERT INTO pix_keys (id, key_value, key_type, wallet_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, key_value, key_type, wallet_id, is_active, created_at
            "#,
        )
        .bind(pix_key.id())
        .bind(pix_key.key_value())
        .bind(pix_key.key_type())
        .bind(pix_key.wallet_id())
        .bind(pix_key.is_active())
        .bind(pix_key.created_at())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("idx_pix_keys_active_value_type") {
                return PixKeyError::AlreadyActive(pix_key.key_value().to_string());
            }
            PixKeyError::RepositoryError(e.to_string())
        })?;

        Ok(saved_model.into())
    }

    async fn find_active_by_value_and_type(
        &self,
        key_value: &str,
        key_type: PixKeyType,
    ) -> Result<Option<PixKey>, PixKeyError> {
        let model_opt = sqlx::query_as::<_, PixKeyModel>(
            r#"
            SELECT id, key_value, key_type, wallet_id, is_active, created_at
            FROM pix_keys
            WHERE key_value = $1 AND key_type = $2 AND is_active
            "#,
        )
        .bind(key_value)
        .bind(key_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PixKeyError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    async fn find_active_by_value(&self, key_value: &str) -> Result<Option<PixKey>, PixKeyError> {
        let model_opt = sqlx::query_as::<_, PixKeyModel>(
            r#"
            SELECT id, key_value, key_type, wallet_id, is_active, created_at
            FROM pix_keys
            WHERE key_value = $1 AND is_active
            "#,
        )
        .bind(key_value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PixKeyError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    async fn find_by_id(&self, id: PixKeyId) -> Result<Option<PixKey>, PixKeyError> {
        let model_opt = sqlx::query_as::<_, PixKeyModel>(
            r#"
            SELECT id, key_value, key_type, wallet_id, is_active, created_at
            FROM pix_keys
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PixKeyError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }
}
