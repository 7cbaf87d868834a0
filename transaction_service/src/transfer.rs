use std::sync::Arc;

use common::{Clock, Money};

use crate::domain::entities::{PixTransfer, TransferStatus};
use crate::domain::error::TransferError;
use crate::domain::gateways::WalletGateway;
use crate::domain::repository::PixTransferRepository;
use crate::domain::types::{TransferId, WalletId};
use crate::state::TransferStateCache;

/// Estado objetivo de una transición (§4.4): únicamente los dos terminales
/// son válidos, así que la validación de "targetStatus ∈ {CONFIRMED,
/// REJECTED}" de §4.5 paso 1 es estructural — esta enumeración no tiene un
/// tercer miembro para violarla.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    Confirmed,
    Rejected,
}

/// Orquesta la iniciación de transferencias y sus transiciones de estado con
/// el efecto financiero completo (§4.5). Generaliza el
/// `ProcessMovementUseCase` del profesor (chequeo de idempotencia → guardar
/// PENDING → llamar al gateway → actualizar COMPLETED/FAILED) hacia el
/// algoritmo completo de reserva en memoria + débito + persistencia +
/// compensación, y hacia el CAS + relectura + efecto post-commit de
/// `transitionTo`.
pub struct AtomicTransferService {
    transfer_repo: Arc<dyn PixTransferRepository>,
    wallet_gateway: Arc<dyn WalletGateway>,
    state_cache: Arc<TransferStateCache>,
    clock: Arc<dyn Clock>,
}

impl AtomicTransferService {
    pub fn new(
        transfer_repo: Arc<dyn PixTransferRepository>,
        wallet_gateway: Arc<dyn WalletGateway>,
        state_cache: Arc<TransferStateCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transfer_repo,
            wallet_gateway,
            state_cache,
            clock,
        }
    }

    /// §4.5 "Initiation". Garantiza a lo sumo una fila `PixTransfer` por
    /// `idempotencyKey`, a lo sumo un débito por iniciación exitosa, y que
    /// una violación de restricción única no deje un cambio de saldo neto
    /// sin compensar.
    #[tracing::instrument(name = "AtomicTransferService::create_transfer", skip(self))]
    pub async fn create_transfer(
        &self,
        end_to_end_id: String,
        idempotency_key: String,
        from_wallet_id: WalletId,
        to_pix_key: String,
        amount: Money,
    ) -> Result<PixTransfer, TransferError> {
        if let Some(existing) = self
            .transfer_repo
            .find_by_idempotency_key(&idempotency_key)
            .await?
        {
            return Ok(existing);
        }

        if !self.state_cache.reserve_pending(&end_to_end_id) {
            if let Some(existing) = self
                .transfer_repo
                .find_by_end_to_end_id(&end_to_end_id)
                .await?
            {
                return Ok(existing);
            }
            return Err(TransferError::TransientConflict(format!(
                "concurrent initiation already in flight for {}",
                end_to_end_id
            )));
        }

        let debit_result = self
            .wallet_gateway
            .debit(
                from_wallet_id,
                amount,
                format!("pix transfer {}", end_to_end_id),
                end_to_end_id.clone(),
            )
            .await;

        if let Err(err) = debit_result {
            self.state_cache.drop_reservation(&end_to_end_id);
            return Err(err);
        }

        let transfer = PixTransfer::new(
            end_to_end_id.clone(),
            idempotency_key.clone(),
            from_wallet_id,
            to_pix_key,
            amount,
            self.clock.now(),
        );

        match self.transfer_repo.create(transfer).await {
            Ok(created) => {
                self.state_cache.put(&end_to_end_id, created.status().clone());
                Ok(created)
            }
            Err(TransferError::DataIntegrityViolation(msg)) => {
                tracing::warn!(
                    "lost unique-constraint race for end_to_end_id {}: {} — refunding source wallet",
                    end_to_end_id,
                    msg
                );
                self.wallet_gateway
                    .credit(
                        from_wallet_id,
                        amount,
                        format!("compensation refund for {}", end_to_end_id),
                        format!("{}-COMPENSATE", end_to_end_id),
                    )
                    .await?;

                if let Some(winner) = self
                    .transfer_repo
                    .find_by_idempotency_key(&idempotency_key)
                    .await?
                {
                    return Ok(winner);
                }
                if let Some(winner) = self
                    .transfer_repo
                    .find_by_end_to_end_id(&end_to_end_id)
                    .await?
                {
                    return Ok(winner);
                }
                Err(TransferError::DataIntegrityViolation(format!(
                    "compensated {} but the winning row could not be re-read",
                    end_to_end_id
                )))
            }
            Err(err) => Err(err),
        }
    }

    /// §4.5 "State transition". El CAS en memoria se adelanta a la base de
    /// datos: falla rápido ante una transición concurrente o inválida antes
    /// de tocar Postgres; el efecto financiero post-commit se aplica
    /// exactamente una vez porque solo corre tras una transición de base de
    /// datos exitosa.
    #[tracing::instrument(name = "AtomicTransferService::transition_to", skip(self, reason))]
    pub async fn transition_to(
        &self,
        end_to_end_id: &str,
        target: TargetStatus,
        reason: Option<String>,
    ) -> Result<bool, TransferError> {
        let at = self.clock.now();
        let target_status = match target {
            TargetStatus::Confirmed => TransferStatus::Confirmed { confirmed_at: at },
            TargetStatus::Rejected => TransferStatus::Rejected {
                rejected_at: at,
                reason: reason.clone().unwrap_or_default(),
            },
        };

        let cas_won = match self
            .state_cache
            .compare_and_set_pending(end_to_end_id, target_status.clone())
            .await
        {
            Some(result) => result,
            None => {
                let transfer = self
                    .transfer_repo
                    .find_by_end_to_end_id(end_to_end_id)
                    .await?
                    .ok_or_else(|| TransferError::NotFound(TransferId::new()))?;
                self.state_cache.put(end_to_end_id, transfer.status().clone());
                self.state_cache
                    .compare_and_set_pending(end_to_end_id, target_status)
                    .await
                    .unwrap_or(false)
            }
        };

        if !cas_won {
            return Ok(false);
        }

        let db_result = match target {
            TargetStatus::Confirmed => self.transfer_repo.confirm(end_to_end_id, at).await,
            TargetStatus::Rejected => {
                self.transfer_repo
                    .reject(end_to_end_id, at, reason.unwrap_or_default())
                    .await
            }
        };

        let transfer = match db_result {
            Ok(transfer) => transfer,
            Err(TransferError::IllegalState(_)) => return Ok(false),
            Err(err) => {
                // The in-memory CAS already moved to the terminal status, but
                // the DB transition never committed — roll the cache back to
                // PENDING so a later retry (or a redelivered webhook) can win
                // the CAS again instead of being silently absorbed while the
                // row is still PENDING.
                self.state_cache.reset_to_pending(end_to_end_id).await;
                return Err(err);
            }
        };

        match target {
            TargetStatus::Confirmed => {
                let destination_wallet = self
                    .wallet_gateway
                    .resolve_pix_key(transfer.to_pix_key())
                    .await?
                    .ok_or_else(|| {
                        TransferError::DestinationNotFound(transfer.to_pix_key().to_string())
                    })?;
                self.wallet_gateway
                    .credit(
                        destination_wallet,
                        transfer.amount(),
                        format!("pix transfer {} confirmed", end_to_end_id),
                        end_to_end_id.to_string(),
                    )
                    .await?;
            }
            TargetStatus::Rejected => {
                self.wallet_gateway
                    .credit(
                        transfer.from_wallet_id(),
                        transfer.amount(),
                        format!("pix transfer {} rejected - refund", end_to_end_id),
                        format!("{}-REFUND", end_to_end_id),
                    )
                    .await?;
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockPixTransferRepository;
    use crate::infrastructure::gateways::fake_wallet_gateway::FakeWalletGateway;
    use common::SystemClock;

    fn sample_amount() -> Money {
        Money::from_minor_units(10_000)
    }

    #[tokio::test]
    async fn create_transfer_debits_source_and_persists_pending() {
        let mut repo = MockPixTransferRepository::new();
        repo.expect_find_by_idempotency_key().returning(|_| Ok(None));
        repo.expect_create().returning(|t| Ok(t));

        let gateway = Arc::new(FakeWalletGateway::new());
        let from_wallet = WalletId::new();
        gateway.seed_balance(from_wallet, Money::from_minor_units(50_000));

        let service = AtomicTransferService::new(
            Arc::new(repo),
            gateway,
            Arc::new(TransferStateCache::new()),
            Arc::new(SystemClock),
        );

        let transfer = service
            .create_transfer(
                "E1".to_string(),
                "idem-1".to_string(),
                from_wallet,
                "dest@example.com".to_string(),
                sample_amount(),
            )
            .await
            .unwrap();

        assert!(transfer.is_pending());
    }

    #[tokio::test]
    async fn create_transfer_compensates_on_constraint_loss() {
        let mut repo = MockPixTransferRepository::new();
        repo.expect_find_by_idempotency_key()
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_create()
            .returning(|_| Err(TransferError::DataIntegrityViolation("dup".to_string())));

        let winner = PixTransfer::new(
            "E2".to_string(),
            "idem-2".to_string(),
            WalletId::new(),
            "dest@example.com".to_string(),
            sample_amount(),
            chrono::Utc::now(),
        );
        let winner_clone = winner.clone();
        repo.expect_find_by_idempotency_key()
            .times(1)
            .returning(move |_| Ok(Some(winner_clone.clone())));

        let gateway = Arc::new(FakeWalletGateway::new());
        let from_wallet = WalletId::new();
        gateway.seed_balance(from_wallet, Money::from_minor_units(50_000));

        let service = AtomicTransferService::new(
            Arc::new(repo),
            gateway.clone(),
            Arc::new(TransferStateCache::new()),
            Arc::new(SystemClock),
        );

        let result = service
            .create_transfer(
                "E2".to_string(),
                "idem-2".to_string(),
                from_wallet,
                "dest@example.com".to_string(),
                sample_amount(),
            )
            .await
            .unwrap();

        assert_eq!(result.id(), winner.id());
        // debited then refunded — net balance unchanged.
        assert_eq!(
            gateway.balance_of(from_wallet),
            Money::from_minor_units(50_000).minor_units()
        );
    }

    #[tokio::test]
    async fn transition_to_confirmed_credits_destination_once() {
        let transfer_id = TransferId::new();
        let from_wallet = WalletId::new();
        let dest_wallet = WalletId::new();
        let amount = sample_amount();

        let mut repo = MockPixTransferRepository::new();
        repo.expect_confirm().times(1).returning(move |e2e, at| {
            Ok(PixTransfer::reconstitute(
                transfer_id,
                e2e.to_string(),
                "idem-3".to_string(),
                from_wallet,
                "dest@example.com".to_string(),
                amount,
                TransferStatus::Confirmed { confirmed_at: at },
                chrono::Utc::now(),
                1,
            ))
        });

        let gateway = Arc::new(FakeWalletGateway::new());
        gateway.seed_pix_key("dest@example.com", dest_wallet);

        let state_cache = Arc::new(TransferStateCache::new());
        state_cache.reserve_pending("E3");

        let service = AtomicTransferService::new(
            Arc::new(repo),
            gateway.clone(),
            state_cache,
            Arc::new(SystemClock),
        );

        let applied = service
            .transition_to("E3", TargetStatus::Confirmed, None)
            .await
            .unwrap();

        assert!(applied);
        assert_eq!(gateway.balance_of(dest_wallet), amount.minor_units());
    }

    #[tokio::test]
    async fn transition_to_is_absorbed_once_already_terminal() {
        let state_cache = Arc::new(TransferStateCache::new());
        state_cache.reserve_pending("E4");
        state_cache
            .compare_and_set_pending(
                "E4",
                TransferStatus::Rejected {
                    rejected_at: chrono::Utc::now(),
                    reason: "late".to_string(),
                },
            )
            .await;

        let repo = MockPixTransferRepository::new();
        let gateway = Arc::new(FakeWalletGateway::new());

        let service = AtomicTransferService::new(
            Arc::new(repo),
            gateway,
            state_cache,
            Arc::new(SystemClock),
        );

        let applied = service
            .transition_to("E4", TargetStatus::Confirmed, None)
            .await
            .unwrap();

        assert!(!applied);
    }

    #[tokio::test]
    async fn transition_to_rolls_back_cache_when_db_transition_errors() {
        let mut repo = MockPixTransferRepository::new();
        repo.expect_confirm()
            .times(1)
            .returning(|_, _| Err(TransferError::RepositoryError("serialization failure".to_string())));

        let gateway = Arc::new(FakeWalletGateway::new());
        gateway.seed_pix_key("dest@example.com", WalletId::new());

        let state_cache = Arc::new(TransferStateCache::new());
        state_cache.reserve_pending("E5");

        let service = AtomicTransferService::new(
            Arc::new(repo),
            gateway.clone(),
            state_cache.clone(),
            Arc::new(SystemClock),
        );

        let err = service
            .transition_to("E5", TargetStatus::Confirmed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::RepositoryError(_)));

        // the cache must be back at PENDING, not stuck CONFIRMED, so a retry
        // of the same event can win the CAS instead of being absorbed.
        let retried = state_cache
            .compare_and_set_pending(
                "E5",
                TransferStatus::Confirmed {
                    confirmed_at: chrono::Utc::now(),
                },
            )
            .await;
        assert_eq!(retried, Some(true));
    }
}
