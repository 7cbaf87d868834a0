use std::sync::Arc;

use tracing::{error, info};

use crate::idempotency::IdempotencyService;
use crate::state::TransferStateCache;

/// Job en segundo plano de mantenimiento (§4.5 "un cleanup programado corre
/// cada 15 minutos"). Generaliza el `RetryFailedTransactionJob` del profesor
/// (mismo `tokio::spawn` + `tokio::time::interval`) hacia la purga de
/// entradas vencidas en vez de reintentar transacciones — el caso "PENDING
/// atascado" de una transferencia Pix se resuelve por el webhook/orquestador,
/// no por un job que adivina el resultado.
pub struct CleanupJob {
    idempotency: Arc<IdempotencyService>,
    transfer_states: Arc<TransferStateCache>,
}

impl CleanupJob {
    pub fn new(idempotency: Arc<IdempotencyService>, transfer_states: Arc<TransferStateCache>) -> Self {
        Self {
            idempotency,
            transfer_states,
        }
    }

    /// Ejecuta una pasada de limpieza.
    pub async fn run(&self) {
        info!("Starting CleanupJob...");

        self.transfer_states.cleanup_expired();
        info!(
            "Transfer state cache cleaned, {} entries remain",
            self.transfer_states.len()
        );

        match self.idempotency.cleanup_expired().await {
            Ok(deleted) => info!("Purged {} expired idempotency records", deleted),
            Err(e) => error!("Failed to purge expired idempotency records: {:?}", e),
        }
    }
}
