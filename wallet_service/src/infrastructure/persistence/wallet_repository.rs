use crate::domain::entities::Wallet;
use crate::domain::error::WalletError;
use crate::domain::repository::WalletRepository;
use crate::domain::types::{UserId, WalletId};
use crate::infrastructure::persistence::models::WalletModel;
use async_trait::async_trait;
use sqlx::PgPool;

/// Repositorio de Billeteras basado en PostgreSQL.
///
/// Respalda los casos de uso de lectura/alta de una wallet. Los movimientos de
/// saldo (crédito/débito) no pasan por aquí: los resuelve
/// `crate::engine::WalletEngine` en su propia transacción con bloqueo de fila.
pub struct PostgresWalletRepository {
    pool: PgPool,
}

impl PostgresWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletRepository for PostgresWalletRepository {
    async fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, WalletError> {
        let model_opt = sqlx::query_as::<_, WalletModel>(
            r#"
            SELECT id, user_id, balance_cents, version, created_at, updated_at
            FROM wallets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Wallet>, WalletError> {
        let model_opt = sqlx::query_as::<_, WalletModel>(
            r#"
            SELECT id, user_id, balance_cents, version, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        Ok(model_opt.map(|m| m.into()))
    }

    async fn create(&self, wallet: Wallet) -> Result<Wallet, WalletError> {
        let saved_model = sqlx::query_as::<_, WalletModel>(
            r#"
            INSERT INTO wallets (id, user_id, balance_cents, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, balance_cents, version, created_at, updated_at
            "#,
        )
        .bind(wallet.id())
        .bind(wallet.user_id())
        .bind(wallet.balance().minor_units())
        .bind(wallet.version())
        .bind(wallet.created_at())
        .bind(wallet.updated_at())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("wallets_user_id_key") {
                return WalletError::DuplicateUser(wallet.user_id());
            }
            WalletError::RepositoryError(e.to_string())
        })?;

        Ok(saved_model.into())
    }
}
