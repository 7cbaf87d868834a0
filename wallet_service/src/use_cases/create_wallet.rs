use crate::domain::{entities::Wallet, error::WalletError, repository::WalletRepository, types::UserId};
use std::sync::Arc;

/// Caso de uso que gestiona la creación de una Wallet para un usuario.
///
/// La unicidad `user_id -> wallet` la garantiza la restricción `UNIQUE` de la
/// columna en BD; este caso de uso no hace una lectura previa para
/// verificarlo, para evitar una ventana de carrera entre el `SELECT` y el
/// `INSERT`.
pub struct CreateWalletUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
}

impl CreateWalletUseCase {
    pub fn new(wallet_repo: Arc<dyn WalletRepository>) -> Self {
        Self { wallet_repo }
    }

    #[tracing::instrument(name = "CreateWalletUseCase::execute", skip(self))]
    pub async fn execute(&self, user_id: UserId) -> Result<Wallet, WalletError> {
        let wallet = Wallet::builder().user_id(user_id).build();
        self.wallet_repo.create(wallet).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockWalletRepository;

    #[tokio::test]
    async fn test_create_wallet_success() {
        let mut mock_wallet_repo = MockWalletRepository::new();
        let user_id = UserId::new();

        mock_wallet_repo
            .expect_create()
            .returning(|w| Ok(w));

        let use_case = CreateWalletUseCase::new(Arc::new(mock_wallet_repo));
        let result = use_case.execute(user_id).await;

        assert!(result.is_ok());
        let wallet = result.unwrap();
        assert_eq!(wallet.user_id(), user_id);
        assert!(wallet.balance().is_zero());
    }

    #[tokio::test]
    async fn test_create_wallet_user_already_has_wallet() {
        let mut mock_wallet_repo = MockWalletRepository::new();
        let user_id = UserId::new();

        mock_wallet_repo
            .expect_create()
            .returning(move |w| Err(WalletError::DuplicateUser(w.user_id())));

        let use_case = CreateWalletUseCase::new(Arc::new(mock_wallet_repo));
        let result = use_case.execute(user_id).await;

        assert!(matches!(result, Err(WalletError::DuplicateUser(_))));
    }
}
