use std::sync::Arc;

use crate::domain::entities::{PixKey, PixKeyType};
use crate::domain::error::{PixKeyError, WalletError};
use crate::domain::repository::{PixKeyRepository, WalletRepository};
use crate::domain::types::WalletId;

/// Caso de uso para `POST /wallets/{id}/pix-keys`. La unicidad de
/// `(key_value, key_type)` entre claves activas la garantiza el índice
/// parcial único de la base de datos (§6); este caso de uso no hace una
/// lectura previa para evitar una ventana de carrera entre el `SELECT` y el
/// `INSERT`.
pub struct RegisterPixKeyUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
    pix_key_repo: Arc<dyn PixKeyRepository>,
}

impl RegisterPixKeyUseCase {
    pub fn new(
        wallet_repo: Arc<dyn WalletRepository>,
        pix_key_repo: Arc<dyn PixKeyRepository>,
    ) -> Self {
        Self {
            wallet_repo,
            pix_key_repo,
        }
    }

    #[tracing::instrument(name = "RegisterPixKeyUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        wallet_id: WalletId,
        key_value: String,
        key_type: PixKeyType,
    ) -> Result<PixKey, PixKeyError> {
        self.wallet_repo
            .find_by_id(wallet_id)
            .await
            .map_err(|e| match e {
                WalletError::NotFound(id) => {
                    PixKeyError::InvalidData(format!("wallet {} not found", id))
                }
                other => PixKeyError::RepositoryError(other.to_string()),
            })?
            .ok_or_else(|| PixKeyError::InvalidData(format!("wallet {} not found", wallet_id)))?;

        let pix_key = PixKey::new(key_value, key_type, wallet_id)?;
        self.pix_key_repo.create(pix_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Wallet;
    use crate::domain::repository::{MockPixKeyRepository, MockWalletRepository};
    use crate::domain::types::UserId;

    #[tokio::test]
    async fn registers_a_pix_key_for_an_existing_wallet() {
        let mut wallet_repo = MockWalletRepository::new();
        let mut pix_key_repo = MockPixKeyRepository::new();
        let wallet_id = WalletId::new();

        wallet_repo
            .expect_find_by_id()
            .withf(move |id| *id == wallet_id)
            .returning(move |_| Ok(Some(Wallet::builder().user_id(UserId::new()).build())));

        pix_key_repo.expect_create().returning(|k| Ok(k));

        let use_case = RegisterPixKeyUseCase::new(Arc::new(wallet_repo), Arc::new(pix_key_repo));
        let result = use_case
            .execute(wallet_id, "person@example.com".to_string(), PixKeyType::Email)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn rejects_registration_for_unknown_wallet() {
        let mut wallet_repo = MockWalletRepository::new();
        let pix_key_repo = MockPixKeyRepository::new();
        let wallet_id = WalletId::new();

        wallet_repo.expect_find_by_id().returning(|_| Ok(None));

        let use_case = RegisterPixKeyUseCase::new(Arc::new(wallet_repo), Arc::new(pix_key_repo));
        let result = use_case
            .execute(wallet_id, "person@example.com".to_string(), PixKeyType::Email)
            .await;

        assert!(matches!(result, Err(PixKeyError::InvalidData(_))));
    }
}
