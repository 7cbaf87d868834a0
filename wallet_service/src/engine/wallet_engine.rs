use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use common::{Clock, Money};
use dashmap::DashMap;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::domain::entities::{LedgerEntry, LedgerEntryType, Wallet};
use crate::domain::error::WalletError;
use crate::domain::types::WalletId;
use crate::infrastructure::persistence::models::{LedgerEntryModel, WalletModel};

const WALLET_LEASE_TIMEOUT: Duration = Duration::from_secs(10);
const TRANSFER_LEASE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);
const MAX_WALLET_LOCKS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MovementKind {
    Credit,
    Debit,
}

/// Entrada del mapa de leases: el mutex exclusivo por wallet más el instante
/// de creación, usado para desalojar la entrada más vieja cuando el mapa
/// supera `MAX_WALLET_LOCKS`.
struct WalletLease {
    mutex: Arc<Mutex<()>>,
    created_at: Instant,
}

/// El motor de billeteras: único punto del sistema autorizado a mutar un
/// saldo. Cada wallet tiene un lease exclusivo en proceso (`DashMap` de
/// mutexes) que se suma — no reemplaza — al aislamiento SERIALIZABLE y al
/// `SELECT ... FOR UPDATE` de la fila en Postgres. El lease evita que dos
/// tareas en el mismo proceso compitan por el mismo reintento de
/// serialización; la fila bloqueada en BD es la que protege contra otros
/// procesos/réplicas.
///
/// Los saldos en memoria o cachés derivados de este motor son siempre
/// reconstruibles a partir de `ledger_entries` — esta estructura nunca los
/// trata como fuente de verdad.
pub struct WalletEngine {
    pool: PgPool,
    leases: Arc<DashMap<WalletId, WalletLease>>,
    clock: Arc<dyn Clock>,
}

impl WalletEngine {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            leases: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Obtiene (o crea) el lease exclusivo de `wallet_id`. Pasado
    /// `MAX_WALLET_LOCKS`, desaloja la entrada más vieja sin esperadores —
    /// igual que `idempotency::IdempotencyService::lease_for` y
    /// `state::TransferStateCache::evict_if_over_capacity`.
    fn lease_for(&self, wallet_id: WalletId) -> Arc<Mutex<()>> {
        let lease = self
            .leases
            .entry(wallet_id)
            .or_insert_with(|| WalletLease {
                mutex: Arc::new(Mutex::new(())),
                created_at: Instant::now(),
            })
            .mutex
            .clone();

        if self.leases.len() > MAX_WALLET_LOCKS {
            if let Some(oldest) = self.leases.iter().min_by_key(|e| e.value().created_at) {
                let oldest_key = *oldest.key();
                drop(oldest);
                self.leases
                    .remove_if(&oldest_key, |_, v| Arc::strong_count(&v.mutex) == 1);
            }
        }

        lease
    }

    /// Libera el lease tomado por `lease_for`, descartando la entrada del
    /// `DashMap` si ya no quedan esperadores (§4.2 paso 6: "Release the
    /// exclusion lease in a finally block; drop the lease entry if no
    /// waiters remain").
    fn release_lease(&self, wallet_id: WalletId, lease: Arc<Mutex<()>>) {
        drop(lease);
        self.leases
            .remove_if(&wallet_id, |_, v| Arc::strong_count(&v.mutex) == 1);
    }

    /// Acredita `amount` a la wallet, anexando un `LedgerEntry::credit`.
    #[tracing::instrument(name = "WalletEngine::credit", skip(self))]
    pub async fn credit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        description: String,
        transaction_id: String,
    ) -> Result<Wallet, WalletError> {
        self.apply_movement(
            wallet_id,
            amount,
            MovementKind::Credit,
            description,
            transaction_id,
            WALLET_LEASE_TIMEOUT,
        )
        .await
    }

    /// Debita `amount` de la wallet, anexando un `LedgerEntry::debit`. Falla
    /// con `InsufficientFunds` si el saldo resultante sería negativo.
    #[tracing::instrument(name = "WalletEngine::debit", skip(self))]
    pub async fn debit(
        &self,
        wallet_id: WalletId,
        amount: Money,
        description: String,
        transaction_id: String,
    ) -> Result<Wallet, WalletError> {
        self.apply_movement(
            wallet_id,
            amount,
            MovementKind::Debit,
            description,
            transaction_id,
            WALLET_LEASE_TIMEOUT,
        )
        .await
    }

    /// Variante de `debit` usada por la orquestación de transferencias, con
    /// un timeout de lease más corto: el llamador ya sostiene su propio
    /// presupuesto de tiempo de extremo a extremo y no debe quedar bloqueado
    /// detrás de una operación de depósito/retiro lenta.
    pub async fn debit_for_transfer(
        &self,
        wallet_id: WalletId,
        amount: Money,
        description: String,
        transaction_id: String,
    ) -> Result<Wallet, WalletError> {
        self.apply_movement(
            wallet_id,
            amount,
            MovementKind::Debit,
            description,
            transaction_id,
            TRANSFER_LEASE_TIMEOUT,
        )
        .await
    }

    async fn apply_movement(
        &self,
        wallet_id: WalletId,
        amount: Money,
        kind: MovementKind,
        description: String,
        transaction_id: String,
        lease_timeout: Duration,
    ) -> Result<Wallet, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::InvalidAmount(
                "movement amount must be positive".to_string(),
            ));
        }

        let lease = self.lease_for(wallet_id);
        let guard = timeout(lease_timeout, lease.lock())
            .await
            .map_err(|_| WalletError::LeaseTimeout(wallet_id))?;

        let mut attempt = 0;
        let result = loop {
            match self
                .try_apply_movement(wallet_id, amount, kind, &description, &transaction_id)
                .await
            {
                Ok(wallet) => break Ok(wallet),
                Err(WalletError::ConcurrencyError(_)) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => break Err(e),
            }
        };

        drop(guard);
        self.release_lease(wallet_id, lease);

        result
    }

    async fn try_apply_movement(
        &self,
        wallet_id: WalletId,
        amount: Money,
        kind: MovementKind,
        description: &str,
        transaction_id: &str,
    ) -> Result<Wallet, WalletError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        let current = sqlx::query_as::<_, WalletModel>(
            r#"
            SELECT id, user_id, balance_cents, version, created_at, updated_at
            FROM wallets
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(wallet_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify_tx_error(e, wallet_id))?
        .ok_or(WalletError::NotFound(wallet_id))?;

        let current_balance = Money::from_minor_units(current.balance_cents);
        let signed_amount = match kind {
            MovementKind::Credit => amount,
            MovementKind::Debit => amount.negate(),
        };
        let new_balance = current_balance
            .add(signed_amount)
            .map_err(|_| WalletError::RepositoryError("balance overflow".to_string()))?;

        if new_balance.is_negative() {
            return Err(WalletError::InsufficientFunds(wallet_id));
        }

        let now = self.clock.now();

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, wallet_id, signed_amount_cents, entry_type, description,
                transaction_id, balance_after_cents, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(wallet_id)
        .bind(signed_amount.minor_units())
        .bind(entry_type_for(kind))
        .bind(description)
        .bind(transaction_id)
        .bind(new_balance.minor_units())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("ledger_entries_wallet_id_transaction_id_key") {
                WalletError::ConcurrencyError(format!(
                    "transaction_id {} already applied to wallet {}",
                    transaction_id, wallet_id
                ))
            } else {
                WalletError::RepositoryError(e.to_string())
            }
        })?;

        let updated = sqlx::query_as::<_, WalletModel>(
            r#"
            UPDATE wallets
            SET balance_cents = $1, version = version + 1, updated_at = $2
            WHERE id = $3 AND version = $4
            RETURNING id, user_id, balance_cents, version, created_at, updated_at
            "#,
        )
        .bind(new_balance.minor_units())
        .bind(now)
        .bind(wallet_id)
        .bind(current.version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify_tx_error(e, wallet_id))?
        .ok_or_else(|| {
            WalletError::ConcurrencyError(format!("version conflict on wallet {}", wallet_id))
        })?;

        tx.commit()
            .await
            .map_err(|e| classify_tx_error(e, wallet_id))?;

        Ok(updated.into())
    }

    /// Saldo actual, leído directamente de la fila de la wallet.
    #[tracing::instrument(name = "WalletEngine::balance", skip(self))]
    pub async fn balance(&self, wallet_id: WalletId) -> Result<Wallet, WalletError> {
        let model = sqlx::query_as::<_, WalletModel>(
            r#"
            SELECT id, user_id, balance_cents, version, created_at, updated_at
            FROM wallets
            WHERE id = $1
            "#,
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?
        .ok_or(WalletError::NotFound(wallet_id))?;

        Ok(model.into())
    }

    /// Reconstruye el saldo histórico de una wallet sumando los asientos del
    /// libro mayor hasta (e incluyendo) `at`. El libro mayor es la única
    /// fuente de verdad para este cálculo — no hay snapshots intermedios.
    #[tracing::instrument(name = "WalletEngine::balance_at", skip(self))]
    pub async fn balance_at(
        &self,
        wallet_id: WalletId,
        at: DateTime<Utc>,
    ) -> Result<Money, WalletError> {
        sqlx::query_as::<_, WalletModel>(
            r#"SELECT id, user_id, balance_cents, version, created_at, updated_at FROM wallets WHERE id = $1"#,
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?
        .ok_or(WalletError::NotFound(wallet_id))?;

        let models = sqlx::query_as::<_, LedgerEntryModel>(
            r#"
            SELECT id, wallet_id, signed_amount_cents, entry_type, description,
                   transaction_id, balance_after_cents, created_at
            FROM ledger_entries
            WHERE wallet_id = $1 AND created_at <= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(wallet_id)
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WalletError::RepositoryError(e.to_string()))?;

        let mut balance = Money::ZERO;
        for model in models {
            let entry: LedgerEntry = model.into();
            balance = balance
                .add(entry.signed_amount())
                .map_err(|_| WalletError::RepositoryError("balance overflow".to_string()))?;
        }

        Ok(balance)
    }
}

fn entry_type_for(kind: MovementKind) -> LedgerEntryType {
    match kind {
        MovementKind::Credit => LedgerEntryType::Credit,
        MovementKind::Debit => LedgerEntryType::Debit,
    }
}

fn classify_tx_error(err: sqlx::Error, wallet_id: WalletId) -> WalletError {
    let msg = err.to_string();
    if msg.contains("could not serialize access") || msg.contains("deadlock detected") {
        WalletError::ConcurrencyError(format!("serialization failure on wallet {}", wallet_id))
    } else {
        WalletError::RepositoryError(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_type_maps_kind() {
        assert_eq!(entry_type_for(MovementKind::Credit), LedgerEntryType::Credit);
        assert_eq!(entry_type_for(MovementKind::Debit), LedgerEntryType::Debit);
    }

    /// `connect_lazy` never opens a socket — the lease map tests below never
    /// touch `pool`, so this is enough to get a `WalletEngine` to call
    /// `lease_for`/`release_lease` on.
    fn test_engine() -> WalletEngine {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/test")
            .expect("lazy pool construction never touches the network");
        WalletEngine::new(pool, Arc::new(common::SystemClock))
    }

    #[test]
    fn release_lease_drops_entry_only_once_unreferenced() {
        let engine = test_engine();
        let wallet_id = WalletId::new();

        let lease_a = engine.lease_for(wallet_id);
        let lease_b = engine.lease_for(wallet_id);
        assert!(Arc::ptr_eq(&lease_a, &lease_b));
        assert_eq!(engine.leases.len(), 1);

        engine.release_lease(wallet_id, lease_a);
        assert_eq!(engine.leases.len(), 1, "lease_b still holds a reference");

        engine.release_lease(wallet_id, lease_b);
        assert_eq!(engine.leases.len(), 0, "last release must drop the entry");
    }

    #[test]
    fn lease_for_evicts_oldest_past_max_wallet_locks() {
        let engine = test_engine();
        for _ in 0..MAX_WALLET_LOCKS {
            let _ = engine.lease_for(WalletId::new());
        }
        assert_eq!(engine.leases.len(), MAX_WALLET_LOCKS);

        let _ = engine.lease_for(WalletId::new());
        assert!(engine.leases.len() <= MAX_WALLET_LOCKS);
    }
}
