use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use common::Clock;

use crate::domain::entities::IdempotencyRecord;
use crate::domain::error::IdempotencyError;
use crate::domain::repository::IdempotencyRepository;

const CACHE_TTL: Duration = Duration::from_secs(30 * 60);
const MAX_CACHE_SIZE: usize = 5000;
const MAX_LOCKS: usize = 1000;

struct CacheEntry {
    record: IdempotencyRecord,
    cached_at: Instant,
}

impl CacheEntry {
    fn is_stale(&self) -> bool {
        self.cached_at.elapsed() >= CACHE_TTL
    }
}

/// Idempotency Service (§4.3): garantiza que a lo sumo un "primer
/// procesamiento" ocurra por (scope, key), y que los intentos subsiguientes
/// devuelvan el mismo registro. La cache en memoria y el lease por
/// `cacheKey` son optimizaciones de rendimiento — el árbitro final de la
/// corrección es la restricción única `(scope, idempotency_key)` de la base
/// de datos (§9 Design Notes: "Uniqueness-driven idempotency").
pub struct IdempotencyService {
    repo: Arc<dyn IdempotencyRepository>,
    clock: Arc<dyn Clock>,
    cache: DashMap<String, CacheEntry>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl IdempotencyService {
    pub fn new(repo: Arc<dyn IdempotencyRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            cache: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    fn cache_key(scope: &str, key: &str) -> String {
        format!("{}:{}", scope, key)
    }

    fn lease_for(&self, cache_key: &str) -> Arc<Mutex<()>> {
        let lease = self
            .locks
            .entry(cache_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        if self.locks.len() > MAX_LOCKS {
            if let Some(entry) = self.locks.iter().next() {
                let stale_key = entry.key().clone();
                drop(entry);
                self.locks.remove_if(&stale_key, |_, v| Arc::strong_count(v) == 1);
            }
        }

        lease
    }

    fn release_lease(&self, cache_key: &str, lease: Arc<Mutex<()>>) {
        drop(lease);
        self.locks
            .remove_if(cache_key, |_, v| Arc::strong_count(v) == 1);
    }

    fn cache_get(&self, cache_key: &str) -> Option<IdempotencyRecord> {
        let entry = self.cache.get(cache_key)?;
        if entry.is_stale() {
            drop(entry);
            self.cache.remove(cache_key);
            return None;
        }
        let record = entry.record.clone();
        if record.is_expired(self.clock.now()) {
            return None;
        }
        Some(record)
    }

    fn cache_put(&self, cache_key: String, record: IdempotencyRecord) {
        self.cache.insert(
            cache_key,
            CacheEntry {
                record,
                cached_at: Instant::now(),
            },
        );

        if self.cache.len() > MAX_CACHE_SIZE {
            self.cache.retain(|_, v| !v.is_stale());
            while self.cache.len() > MAX_CACHE_SIZE {
                let Some(oldest_key) = self
                    .cache
                    .iter()
                    .min_by_key(|e| e.value().cached_at)
                    .map(|e| e.key().clone())
                else {
                    break;
                };
                self.cache.remove(&oldest_key);
            }
        }
    }

    /// Consulta un registro vigente para (scope, key). `None` si no existe o
    /// si expiró.
    #[tracing::instrument(name = "IdempotencyService::find", skip(self))]
    pub async fn find(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyError> {
        let cache_key = Self::cache_key(scope, key);

        if let Some(record) = self.cache_get(&cache_key) {
            return Ok(Some(record));
        }

        match self.repo.find(scope, key).await? {
            Some(record) if !record.is_expired(self.clock.now()) => {
                self.cache_put(cache_key, record.clone());
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }

    /// Algoritmo de escritura de doble verificación (§4.3 paso 1-6): el
    /// ganador de la carrera sobre `(scope, key)` es el único cuyo cuerpo de
    /// respuesta sobrevive; los demás reciben el registro ganador de vuelta.
    #[tracing::instrument(name = "IdempotencyService::save_first", skip(self, request_body, response_body))]
    pub async fn save_first(
        &self,
        scope: &str,
        key: &str,
        request_body: &[u8],
        response_body: serde_json::Value,
        response_status: u16,
    ) -> Result<IdempotencyRecord, IdempotencyError> {
        let cache_key = Self::cache_key(scope, key);
        let lease = self.lease_for(&cache_key);
        let _guard = lease.lock().await;

        if let Some(record) = self.cache_get(&cache_key) {
            self.release_lease(&cache_key, lease);
            return Ok(record);
        }

        if let Some(record) = self.repo.find(scope, key).await? {
            if !record.is_expired(self.clock.now()) {
                self.cache_put(cache_key.clone(), record.clone());
                self.release_lease(&cache_key, lease);
                return Ok(record);
            }
        }

        let request_hash = fingerprint(request_body);
        let now = self.clock.now();
        let candidate = IdempotencyRecord::new(
            scope.to_string(),
            key.to_string(),
            request_hash,
            response_body,
            response_status,
            now,
        );

        let winner = self.repo.insert_or_get_existing(candidate).await?;
        self.cache_put(cache_key.clone(), winner.clone());
        self.release_lease(&cache_key, lease);
        Ok(winner)
    }

    /// Compara el SHA-256 del cuerpo de la solicitud contra `requestHash`.
    pub fn validate_matches(record: &IdempotencyRecord, request_body: &[u8]) -> bool {
        fingerprint(request_body) == record.request_hash()
    }

    /// Elimina registros persistentes vencidos y purga la cache en memoria.
    /// Invocado por el job de limpieza en segundo plano (§4.5/§12).
    #[tracing::instrument(name = "IdempotencyService::cleanup_expired", skip(self))]
    pub async fn cleanup_expired(&self) -> Result<u64, IdempotencyError> {
        let now = self.clock.now();
        self.cache.retain(|_, v| !v.is_stale() && !v.record.is_expired(now));
        self.repo.delete_expired(now).await
    }
}

fn fingerprint(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockIdempotencyRepository;
    use common::SystemClock;

    #[tokio::test]
    async fn save_first_inserts_once_and_reuses_on_retry() {
        let mut repo = MockIdempotencyRepository::new();
        repo.expect_find().returning(|_, _| Ok(None));
        repo.expect_insert_or_get_existing()
            .times(1)
            .returning(|record| Ok(record));

        let service = IdempotencyService::new(Arc::new(repo), Arc::new(SystemClock));

        let first = service
            .save_first("transfer", "k1", b"{}", serde_json::json!({"ok": true}), 201)
            .await
            .unwrap();

        let second = service
            .save_first("transfer", "k1", b"{}", serde_json::json!({"ok": true}), 201)
            .await
            .unwrap();

        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn validate_matches_compares_sha256_of_body() {
        let record = IdempotencyRecord::new(
            "transfer".to_string(),
            "k1".to_string(),
            fingerprint(b"hello"),
            serde_json::json!({}),
            201,
            chrono::Utc::now(),
        );
        assert!(IdempotencyService::validate_matches(&record, b"hello"));
        assert!(!IdempotencyService::validate_matches(&record, b"other"));
    }
}
