use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::{Money, SystemClock};
use transaction_service::domain::entities::{IdempotencyRecord, PixTransfer};
use transaction_service::domain::error::{IdempotencyError, TransferError};
use transaction_service::domain::repository::{IdempotencyRepository, PixTransferRepository};
use transaction_service::domain::types::{TransferId, WalletId};
use transaction_service::idempotency::IdempotencyService;
use transaction_service::infrastructure::gateways::fake_wallet_gateway::FakeWalletGateway;
use transaction_service::orchestrator::TransferOrchestrator;
use transaction_service::state::TransferStateCache;
use transaction_service::transfer::AtomicTransferService;

/// Repositorio en memoria para las pruebas de integración — los mocks
/// generados por `#[automock]` solo existen bajo `cfg(test)` *dentro* de la
/// librería, y por lo tanto no son visibles desde `tests/` (un crate
/// separado). Reproduce la restricción única `(endToEndId)`/
/// `(idempotencyKey)` que en producción impone Postgres, para ejercitar la
/// compensación de §4.5 paso 4 sin levantar una base de datos real.
#[derive(Default)]
struct InMemoryPixTransferRepository {
    by_end_to_end_id: Mutex<HashMap<String, PixTransfer>>,
}

#[async_trait]
impl PixTransferRepository for InMemoryPixTransferRepository {
    async fn create(&self, transfer: PixTransfer) -> Result<PixTransfer, TransferError> {
        let mut store = self.by_end_to_end_id.lock().unwrap();
        if store.contains_key(transfer.end_to_end_id())
            || store.values().any(|t| t.idempotency_key() == transfer.idempotency_key())
        {
            return Err(TransferError::DataIntegrityViolation(
                "duplicate end_to_end_id or idempotency_key".to_string(),
            ));
        }
        store.insert(transfer.end_to_end_id().to_string(), transfer.clone());
        Ok(transfer)
    }

    async fn find_by_id(&self, id: TransferId) -> Result<Option<PixTransfer>, TransferError> {
        Ok(self
            .by_end_to_end_id
            .lock()
            .unwrap()
            .values()
            .find(|t| t.id() == id)
            .cloned())
    }

    async fn find_by_end_to_end_id(
        &self,
        end_to_end_id: &str,
    ) -> Result<Option<PixTransfer>, TransferError> {
        Ok(self.by_end_to_end_id.lock().unwrap().get(end_to_end_id).cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<PixTransfer>, TransferError> {
        Ok(self
            .by_end_to_end_id
            .lock()
            .unwrap()
            .values()
            .find(|t| t.idempotency_key() == idempotency_key)
            .cloned())
    }

    async fn confirm(
        &self,
        end_to_end_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PixTransfer, TransferError> {
        let mut store = self.by_end_to_end_id.lock().unwrap();
        let transfer = store
            .get_mut(end_to_end_id)
            .ok_or_else(|| TransferError::NotFound(TransferId::new()))?;
        transfer.confirm(at)?;
        Ok(transfer.clone())
    }

    async fn reject(
        &self,
        end_to_end_id: &str,
        at: DateTime<Utc>,
        reason: String,
    ) -> Result<PixTransfer, TransferError> {
        let mut store = self.by_end_to_end_id.lock().unwrap();
        let transfer = store
            .get_mut(end_to_end_id)
            .ok_or_else(|| TransferError::NotFound(TransferId::new()))?;
        transfer.reject(at, reason)?;
        Ok(transfer.clone())
    }
}

#[derive(Default)]
struct InMemoryIdempotencyRepository {
    records: Mutex<HashMap<(String, String), IdempotencyRecord>>,
}

#[async_trait]
impl IdempotencyRepository for InMemoryIdempotencyRepository {
    async fn find(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(scope.to_string(), key.to_string()))
            .cloned())
    }

    async fn insert_or_get_existing(
        &self,
        record: IdempotencyRecord,
    ) -> Result<IdempotencyRecord, IdempotencyError> {
        let mut records = self.records.lock().unwrap();
        let dict_key = (record.scope().to_string(), record.key().to_string());
        Ok(records.entry(dict_key).or_insert(record).clone())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, IdempotencyError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| !r.is_expired(now));
        Ok((before - records.len()) as u64)
    }
}

struct Harness {
    orchestrator: TransferOrchestrator,
    gateway: Arc<FakeWalletGateway>,
}

fn build_harness() -> Harness {
    let clock = Arc::new(SystemClock);
    let transfer_repo = Arc::new(InMemoryPixTransferRepository::default());
    let idempotency_repo = Arc::new(InMemoryIdempotencyRepository::default());
    let gateway = Arc::new(FakeWalletGateway::new());

    let idempotency = Arc::new(IdempotencyService::new(idempotency_repo, clock.clone()));
    let state_cache = Arc::new(TransferStateCache::new());
    let transfer_service = Arc::new(AtomicTransferService::new(
        transfer_repo.clone(),
        gateway.clone(),
        state_cache,
        clock.clone(),
    ));
    let orchestrator = TransferOrchestrator::new(
        idempotency,
        transfer_service,
        transfer_repo,
        gateway.clone(),
        clock,
    );

    Harness { orchestrator, gateway }
}

#[tokio::test]
async fn happy_path_confirms_and_credits_destination() {
    let harness = build_harness();
    let from_wallet = WalletId::new();
    let to_wallet = WalletId::new();
    harness.gateway.seed_balance(from_wallet, Money::from_minor_units(100_000));
    harness.gateway.seed_pix_key("receiver@example.com", to_wallet);

    let transfer = harness
        .orchestrator
        .initiate(
            "idem-happy".to_string(),
            from_wallet,
            "receiver@example.com".to_string(),
            Money::from_minor_units(20_000),
        )
        .await
        .expect("initiation should succeed");

    assert!(transfer.is_pending());
    assert_eq!(harness.gateway.balance_of(from_wallet), 80_000);

    harness
        .orchestrator
        .handle_webhook(transfer.end_to_end_id(), "evt-1", "CONFIRMED")
        .await
        .expect("webhook should be processed");

    assert_eq!(harness.gateway.balance_of(to_wallet), 20_000);
}

#[tokio::test]
async fn duplicate_initiation_does_not_debit_twice() {
    let harness = build_harness();
    let from_wallet = WalletId::new();
    let to_wallet = WalletId::new();
    harness.gateway.seed_balance(from_wallet, Money::from_minor_units(100_000));
    harness.gateway.seed_pix_key("receiver@example.com", to_wallet);

    let first = harness
        .orchestrator
        .initiate(
            "idem-dup".to_string(),
            from_wallet,
            "receiver@example.com".to_string(),
            Money::from_minor_units(30_000),
        )
        .await
        .unwrap();

    let second = harness
        .orchestrator
        .initiate(
            "idem-dup".to_string(),
            from_wallet,
            "receiver@example.com".to_string(),
            Money::from_minor_units(30_000),
        )
        .await
        .unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(harness.gateway.balance_of(from_wallet), 70_000);
}

#[tokio::test]
async fn duplicate_webhook_credits_destination_exactly_once() {
    let harness = build_harness();
    let from_wallet = WalletId::new();
    let to_wallet = WalletId::new();
    harness.gateway.seed_balance(from_wallet, Money::from_minor_units(50_000));
    harness.gateway.seed_pix_key("receiver@example.com", to_wallet);

    let transfer = harness
        .orchestrator
        .initiate(
            "idem-webhook-dup".to_string(),
            from_wallet,
            "receiver@example.com".to_string(),
            Money::from_minor_units(10_000),
        )
        .await
        .unwrap();

    for _ in 0..2 {
        harness
            .orchestrator
            .handle_webhook(transfer.end_to_end_id(), "evt-repeated", "CONFIRMED")
            .await
            .unwrap();
    }

    assert_eq!(harness.gateway.balance_of(to_wallet), 10_000);
}

#[tokio::test]
async fn rejection_refunds_source_wallet() {
    let harness = build_harness();
    let from_wallet = WalletId::new();
    let to_wallet = WalletId::new();
    harness.gateway.seed_balance(from_wallet, Money::from_minor_units(50_000));
    harness.gateway.seed_pix_key("receiver@example.com", to_wallet);

    let transfer = harness
        .orchestrator
        .initiate(
            "idem-reject".to_string(),
            from_wallet,
            "receiver@example.com".to_string(),
            Money::from_minor_units(15_000),
        )
        .await
        .unwrap();

    assert_eq!(harness.gateway.balance_of(from_wallet), 35_000);

    harness
        .orchestrator
        .handle_webhook(transfer.end_to_end_id(), "evt-reject", "REJECTED")
        .await
        .unwrap();

    assert_eq!(harness.gateway.balance_of(from_wallet), 50_000);
    assert_eq!(harness.gateway.balance_of(to_wallet), 0);
}

#[tokio::test]
async fn unknown_webhook_event_type_is_absorbed_without_effect() {
    let harness = build_harness();
    let from_wallet = WalletId::new();
    let to_wallet = WalletId::new();
    harness.gateway.seed_balance(from_wallet, Money::from_minor_units(50_000));
    harness.gateway.seed_pix_key("receiver@example.com", to_wallet);

    let transfer = harness
        .orchestrator
        .initiate(
            "idem-unknown-event".to_string(),
            from_wallet,
            "receiver@example.com".to_string(),
            Money::from_minor_units(5_000),
        )
        .await
        .unwrap();

    harness
        .orchestrator
        .handle_webhook(transfer.end_to_end_id(), "evt-weird", "CANCELLED")
        .await
        .expect("unknown event types must be absorbed, not rejected");

    assert_eq!(harness.gateway.balance_of(to_wallet), 0);
}

#[tokio::test]
async fn initiation_fails_with_insufficient_funds_and_persists_nothing() {
    let harness = build_harness();
    let from_wallet = WalletId::new();
    let to_wallet = WalletId::new();
    harness.gateway.seed_balance(from_wallet, Money::from_minor_units(1_000));
    harness.gateway.seed_pix_key("receiver@example.com", to_wallet);

    let err = harness
        .orchestrator
        .initiate(
            "idem-insufficient".to_string(),
            from_wallet,
            "receiver@example.com".to_string(),
            Money::from_minor_units(5_000),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::InsufficientFunds));
    assert_eq!(harness.gateway.balance_of(from_wallet), 1_000);
}

#[tokio::test]
async fn initiation_fails_fast_for_unknown_pix_key() {
    let harness = build_harness();
    let from_wallet = WalletId::new();
    harness.gateway.seed_balance(from_wallet, Money::from_minor_units(10_000));

    let err = harness
        .orchestrator
        .initiate(
            "idem-unknown-dest".to_string(),
            from_wallet,
            "nobody@example.com".to_string(),
            Money::from_minor_units(5_000),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::DestinationNotFound(_)));
    assert_eq!(harness.gateway.balance_of(from_wallet), 10_000);
}
