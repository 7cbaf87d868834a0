use std::sync::Arc;
use std::time::Duration;

use common::{Clock, Money};
use uuid::Uuid;

use crate::domain::entities::PixTransfer;
use crate::domain::error::TransferError;
use crate::domain::gateways::WalletGateway;
use crate::domain::repository::PixTransferRepository;
use crate::domain::types::WalletId;
use crate::idempotency::IdempotencyService;
use crate::transfer::{AtomicTransferService, TargetStatus};

const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Traduce eventos externos (solicitud HTTP de iniciación, webhook) hacia
/// las operaciones del núcleo. El handler HTTP queda como adaptador
/// delgado; este orquestador carga toda la lógica de caso de uso.
pub struct TransferOrchestrator {
    idempotency: Arc<IdempotencyService>,
    transfer_service: Arc<AtomicTransferService>,
    transfer_repo: Arc<dyn PixTransferRepository>,
    wallet_gateway: Arc<dyn WalletGateway>,
    clock: Arc<dyn Clock>,
}

impl TransferOrchestrator {
    pub fn new(
        idempotency: Arc<IdempotencyService>,
        transfer_service: Arc<AtomicTransferService>,
        transfer_repo: Arc<dyn PixTransferRepository>,
        wallet_gateway: Arc<dyn WalletGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            idempotency,
            transfer_service,
            transfer_repo,
            wallet_gateway,
            clock,
        }
    }

    /// Inicia una transferencia. El chequeo de idempotencyKey aquí es un atajo barato
    /// antes de pagar la resolución de la clave Pix — `AtomicTransferService`
    /// repite el mismo chequeo de manera autoritativa justo antes de
    /// insertar la fila.
    #[tracing::instrument(name = "TransferOrchestrator::initiate", skip(self))]
    pub async fn initiate(
        &self,
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

        // Resolved only to validate the key is active at initiation time; the
        // destination wallet is re-resolved (and credited) at confirmation
        // time in `AtomicTransferService::transition_to`, since the Pix key
        // could be deactivated in between.
        self.wallet_gateway
            .resolve_pix_key(&to_pix_key)
            .await?
            .ok_or_else(|| TransferError::DestinationNotFound(to_pix_key.clone()))?;

        let mut attempt = 0;
        loop {
            let end_to_end_id = generate_end_to_end_id(self.clock.as_ref());
            match self
                .transfer_service
                .create_transfer(
                    end_to_end_id,
                    idempotency_key.clone(),
                    from_wallet_id,
                    to_pix_key.clone(),
                    amount,
                )
                .await
            {
                Ok(transfer) => return Ok(transfer),
                Err(TransferError::DataIntegrityViolation(msg)) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    tracing::warn!(
                        "retrying transfer initiation after constraint collision ({}/{}): {}",
                        attempt,
                        MAX_RETRIES,
                        msg
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Procesa un webhook de confirmación/rechazo. Un evento desconocido o ya procesado siempre
    /// resulta en éxito: el contrato del webhook es "a lo sumo un efecto
    /// financiero por eventId", nunca "el emisor del webhook debe
    /// reintentar".
    #[tracing::instrument(name = "TransferOrchestrator::handle_webhook", skip(self))]
    pub async fn handle_webhook(
        &self,
        end_to_end_id: &str,
        event_id: &str,
        event_type: &str,
    ) -> Result<(), TransferError> {
        if self
            .idempotency
            .find("webhook", event_id)
            .await
            .map_err(|e| TransferError::RepositoryError(e.to_string()))?
            .is_some()
        {
            return Ok(());
        }

        let target = match event_type {
            "CONFIRMED" => TargetStatus::Confirmed,
            "REJECTED" => TargetStatus::Rejected,
            other => {
                tracing::warn!("dropping webhook with unknown eventType {}", other);
                self.record_webhook_processed(event_id).await?;
                return Ok(());
            }
        };

        let reason = matches!(target, TargetStatus::Rejected)
            .then(|| "rejected via webhook".to_string());

        // transitionTo's false return (already terminal, or transfer missing)
        // is absorbed the same as a successful transition — the event is
        // considered processed either way.
        match self
            .transfer_service
            .transition_to(end_to_end_id, target, reason)
            .await
        {
            Ok(_applied) => {}
            Err(TransferError::NotFound(_)) => {
                tracing::info!(
                    "webhook {} referenced unknown transfer {}, absorbing",
                    event_id,
                    end_to_end_id
                );
            }
            Err(err) => return Err(err),
        }

        self.record_webhook_processed(event_id).await
    }

    async fn record_webhook_processed(&self, event_id: &str) -> Result<(), TransferError> {
        self.idempotency
            .save_first("webhook", event_id, event_id.as_bytes(), serde_json::json!({}), 200)
            .await
            .map_err(|e| TransferError::RepositoryError(e.to_string()))?;
        Ok(())
    }
}

/// `"E" + 13-digit millis + 18 hex chars`, ≤32 caracteres. Se genera de forma
/// probabilística (reloj de pared + UUID fresco) en vez de derivarla del
/// idempotencyKey, porque dos iniciaciones distintas con distinto
/// idempotencyKey deben poder compartir el mismo destino sin que el
/// endToEndId quede atado a una única clave (ver DESIGN.md).
fn generate_end_to_end_id(clock: &dyn Clock) -> String {
    let millis = clock.now().timestamp_millis().rem_euclid(10_000_000_000_000);
    let hex = Uuid::new_v4().simple().to_string();
    format!("E{:013}{}", millis, &hex[..18])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockPixTransferRepository;
    use crate::infrastructure::gateways::fake_wallet_gateway::FakeWalletGateway;
    use crate::state::TransferStateCache;
    use common::SystemClock;

    fn sample_amount() -> Money {
        Money::from_minor_units(5_000)
    }

    #[test]
    fn generated_end_to_end_id_matches_format() {
        let id = generate_end_to_end_id(&SystemClock);
        assert!(id.starts_with('E'));
        assert!(id.len() <= 32);
        assert_eq!(id.len(), 1 + 13 + 18);
    }

    #[tokio::test]
    async fn initiate_fails_fast_on_unresolved_pix_key() {
        let mut transfer_repo = MockPixTransferRepository::new();
        transfer_repo
            .expect_find_by_idempotency_key()
            .returning(|_| Ok(None));

        let gateway = Arc::new(FakeWalletGateway::new());
        let clock = Arc::new(SystemClock);
        let state_cache = Arc::new(TransferStateCache::new());
        let transfer_repo = Arc::new(transfer_repo);

        let transfer_service = Arc::new(AtomicTransferService::new(
            transfer_repo.clone(),
            gateway.clone(),
            state_cache,
            clock.clone(),
        ));

        let idempotency_repo = crate::domain::repository::MockIdempotencyRepository::new();
        let idempotency = Arc::new(IdempotencyService::new(Arc::new(idempotency_repo), clock.clone()));

        let orchestrator = TransferOrchestrator::new(
            idempotency,
            transfer_service,
            transfer_repo,
            gateway,
            clock,
        );

        let err = orchestrator
            .initiate(
                "idem-missing-key".to_string(),
                WalletId::new(),
                "unknown@example.com".to_string(),
                sample_amount(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::DestinationNotFound(_)));
    }
}
