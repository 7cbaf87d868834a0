use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::entities::TransferStatus;

const ENTRY_TTL: Duration = Duration::from_secs(60 * 60);
const MAX_TRANSFER_STATES: usize = 10_000;

/// Entrada del mapa de bookkeeping en memoria (§4.5 "In-memory bookkeeping").
/// `status` está protegido por un mutex en lugar de un `ArcSwap` — el
/// stack de dependencias del workspace no trae primitivas lock-free, y un
/// mutex corto es consistente con el lease por-wallet del Wallet Engine.
struct TransferStateEntry {
    status: Mutex<TransferStatus>,
    created_at: Instant,
    last_access: Mutex<Instant>,
}

/// Cache de aceleración del CAS sobre `pix_transfers.status` (§4.5/§9). Nunca
/// es la fuente de verdad: en un miss se reconstruye desde
/// `PixTransferRepository`, y tras un reinicio de proceso arranca vacía.
pub struct TransferStateCache {
    entries: DashMap<String, Arc<TransferStateEntry>>,
}

impl TransferStateCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    async fn touch(&self, entry: &Arc<TransferStateEntry>) {
        let mut last_access = entry.last_access.lock().await;
        *last_access = Instant::now();
    }

    fn is_expired(entry: &TransferStateEntry) -> bool {
        entry.created_at.elapsed() >= ENTRY_TTL
    }

    fn evict_if_over_capacity(&self) {
        self.entries.retain(|_, v| !Self::is_expired(v));
        while self.entries.len() > MAX_TRANSFER_STATES {
            let Some(oldest_key) = self
                .entries
                .iter()
                .min_by_key(|e| e.value().created_at)
                .map(|e| e.key().clone())
            else {
                break;
            };
            self.entries.remove(&oldest_key);
        }
    }

    /// Reserva una entrada PENDING para `end_to_end_id`. Si ya existe una
    /// (iniciador concurrente ganó la carrera), la devuelve sin reemplazarla.
    pub fn reserve_pending(&self, end_to_end_id: &str) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.entries.entry(end_to_end_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(TransferStateEntry {
                    status: Mutex::new(TransferStatus::Pending),
                    created_at: Instant::now(),
                    last_access: Mutex::new(Instant::now()),
                }));
                self.evict_if_over_capacity();
                true
            }
        }
    }

    /// Libera una reserva PENDING que nunca llegó a persistirse (el débito
    /// falló antes de insertar la fila). Sin esto, un intento fallido
    /// bloquearía para siempre cualquier reintento con el mismo
    /// `end_to_end_id` contra el cache en memoria de este proceso.
    pub fn drop_reservation(&self, end_to_end_id: &str) {
        self.entries.remove(end_to_end_id);
    }

    /// Inserta (o reemplaza) la entrada cacheada con el estado leído de la
    /// base de datos. Usado para reconstruir el cache en un miss (§4.5 "la
    /// autoridad siempre es la fila de la BD; el mapa se reconstruye desde
    /// el storage en un miss").
    pub fn put(&self, end_to_end_id: &str, status: TransferStatus) {
        self.entries.insert(
            end_to_end_id.to_string(),
            Arc::new(TransferStateEntry {
                status: Mutex::new(status),
                created_at: Instant::now(),
                last_access: Mutex::new(Instant::now()),
            }),
        );
        self.evict_if_over_capacity();
    }

    /// Compare-and-set PENDING → `target`. Devuelve `false` si la entrada no
    /// existe (miss — el llamador debe reconstruirla desde storage) o si ya
    /// está en un estado terminal distinto del que se intenta alcanzar.
    pub async fn compare_and_set_pending(
        &self,
        end_to_end_id: &str,
        target: TransferStatus,
    ) -> Option<bool> {
        let entry = self.entries.get(end_to_end_id)?.clone();
        self.touch(&entry).await;

        let mut status = entry.status.lock().await;
        if !matches!(*status, TransferStatus::Pending) {
            return Some(false);
        }
        *status = target;
        Some(true)
    }

    /// Limpieza periódica (§4.5: "un cleanup programado corre cada 15
    /// minutos"): purga entradas vencidas y aplica el tope blando.
    pub fn cleanup_expired(&self) {
        self.evict_if_over_capacity();
    }

    /// Revierte una entrada a PENDING tras un CAS que ganó en memoria pero
    /// cuya transición de base de datos falló con un error no terminal
    /// (p. ej. una falla de serialización retriable). Sin esto, la cache
    /// quedaría en el estado objetivo mientras `pix_transfers.status` sigue
    /// en PENDING, y una redelivery del mismo evento sería absorbida sin
    /// aplicar jamás el efecto financiero (§4.5/§8.6).
    pub async fn reset_to_pending(&self, end_to_end_id: &str) {
        if let Some(entry) = self.entries.get(end_to_end_id) {
            let mut status = entry.status.lock().await;
            *status = TransferStatus::Pending;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for TransferStateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_pending_succeeds_once() {
        let cache = TransferStateCache::new();
        assert!(cache.reserve_pending("E1"));
        assert!(!cache.reserve_pending("E1"));
    }

    #[tokio::test]
    async fn cas_fails_once_already_terminal() {
        let cache = TransferStateCache::new();
        cache.reserve_pending("E1");

        let confirmed_at = chrono::Utc::now();
        let first = cache
            .compare_and_set_pending("E1", TransferStatus::Confirmed { confirmed_at })
            .await;
        assert_eq!(first, Some(true));

        let second = cache
            .compare_and_set_pending(
                "E1",
                TransferStatus::Rejected {
                    rejected_at: chrono::Utc::now(),
                    reason: "late".to_string(),
                },
            )
            .await;
        assert_eq!(second, Some(false));
    }

    #[tokio::test]
    async fn cas_on_missing_entry_returns_none() {
        let cache = TransferStateCache::new();
        let result = cache
            .compare_and_set_pending("unknown", TransferStatus::Pending)
            .await;
        assert_eq!(result, None);
    }
}
