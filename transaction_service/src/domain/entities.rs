use chrono::{DateTime, Duration, Utc};
use common::Money;
use serde::{Deserialize, Serialize};

use crate::domain::error::TransferError;
use crate::domain::types::{IdempotencyRecordId, TransferId, WalletId};

/// Estado de una transferencia Pix, como variante etiquetada (§9 Design
/// Notes: "tagged-variant + pure function design is equally valid").
/// `PENDING` es el único estado inicial; `Confirmed`/`Rejected` son
/// terminales y no admiten más transiciones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    Confirmed { confirmed_at: DateTime<Utc> },
    Rejected { rejected_at: DateTime<Utc>, reason: String },
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Confirmed { .. } => "CONFIRMED",
            TransferStatus::Rejected { .. } => "REJECTED",
        }
    }
}

/// Modelo de Entidad: PixTransfer.
///
/// Registro de máquina de estados de un intento de transferencia
/// extremo-a-extremo (§3/§4.4). Referencia wallets solo por id — este
/// servicio nunca es dueño de ellas (ver `domain::types::WalletId`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixTransfer {
    id: TransferId,
    end_to_end_id: String,
    idempotency_key: String,
    from_wallet_id: WalletId,
    to_pix_key: String,
    amount: Money,
    status: TransferStatus,
    created_at: DateTime<Utc>,
    version: i32,
}

impl PixTransfer {
    /// Crea una transferencia nueva en estado PENDING. No valida el monto
    /// contra el rango Pix aquí — eso es responsabilidad del orquestador,
    /// que ya corrió `validate_pix_amount` antes de llegar a esta capa.
    pub fn new(
        end_to_end_id: String,
        idempotency_key: String,
        from_wallet_id: WalletId,
        to_pix_key: String,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransferId::new(),
            end_to_end_id,
            idempotency_key,
            from_wallet_id,
            to_pix_key,
            amount,
            status: TransferStatus::Pending,
            created_at,
            version: 0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: TransferId,
        end_to_end_id: String,
        idempotency_key: String,
        from_wallet_id: WalletId,
        to_pix_key: String,
        amount: Money,
        status: TransferStatus,
        created_at: DateTime<Utc>,
        version: i32,
    ) -> Self {
        Self {
            id,
            end_to_end_id,
            idempotency_key,
            from_wallet_id,
            to_pix_key,
            amount,
            status,
            created_at,
            version,
        }
    }

    pub fn id(&self) -> TransferId {
        self.id
    }

    pub fn end_to_end_id(&self) -> &str {
        &self.end_to_end_id
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    pub fn from_wallet_id(&self) -> WalletId {
        self.from_wallet_id
    }

    pub fn to_pix_key(&self) -> &str {
        &self.to_pix_key
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn status(&self) -> &TransferStatus {
        &self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, TransferStatus::Pending)
    }

    /// Transición PENDING → CONFIRMED (terminal). Cualquier otro estado de
    /// origen falla con `ILLEGAL_STATE` (§4.4).
    pub fn confirm(&mut self, at: DateTime<Utc>) -> Result<(), TransferError> {
        if !self.is_pending() {
            return Err(TransferError::IllegalState(self.status.label()));
        }
        self.status = TransferStatus::Confirmed { confirmed_at: at };
        self.version += 1;
        Ok(())
    }

    /// Transición PENDING → REJECTED (terminal). Cualquier otro estado de
    /// origen falla con `ILLEGAL_STATE` (§4.4).
    pub fn reject(&mut self, at: DateTime<Utc>, reason: String) -> Result<(), TransferError> {
        if !self.is_pending() {
            return Err(TransferError::IllegalState(self.status.label()));
        }
        self.status = TransferStatus::Rejected {
            rejected_at: at,
            reason,
        };
        self.version += 1;
        Ok(())
    }
}

/// Modelo de Entidad: IdempotencyRecord.
///
/// Memo persistente keyed por (scope, key) con huella de la solicitud y
/// expiración (§3/§4.3). `response_body`/`response_status` permiten devolver
/// la misma respuesta exacta a un reintento sin re-ejecutar la lógica.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    id: IdempotencyRecordId,
    scope: String,
    key: String,
    request_hash: String,
    response_body: serde_json::Value,
    response_status: u16,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn new(
        scope: String,
        key: String,
        request_hash: String,
        response_body: serde_json::Value,
        response_status: u16,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: IdempotencyRecordId::new(),
            scope,
            key,
            request_hash,
            response_body,
            response_status,
            created_at,
            expires_at: created_at + Duration::hours(24),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: IdempotencyRecordId,
        scope: String,
        key: String,
        request_hash: String,
        response_body: serde_json::Value,
        response_status: u16,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            scope,
            key,
            request_hash,
            response_body,
            response_status,
            created_at,
            expires_at,
        }
    }

    pub fn id(&self) -> IdempotencyRecordId {
        self.id
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn request_hash(&self) -> &str {
        &self.request_hash
    }

    pub fn response_body(&self) -> &serde_json::Value {
        &self.response_body
    }

    pub fn response_status(&self) -> u16 {
        self.response_status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transfer() -> PixTransfer {
        PixTransfer::new(
            "E1234567890123abcdef01234567".to_string(),
            "idem-1".to_string(),
            WalletId::new(),
            "dest@example.com".to_string(),
            Money::from_minor_units(1000),
            Utc::now(),
        )
    }

    #[test]
    fn confirm_moves_pending_to_confirmed() {
        let mut transfer = sample_transfer();
        transfer.confirm(Utc::now()).unwrap();
        assert!(matches!(transfer.status(), TransferStatus::Confirmed { .. }));
    }

    #[test]
    fn confirming_twice_fails_illegal_state() {
        let mut transfer = sample_transfer();
        transfer.confirm(Utc::now()).unwrap();
        let err = transfer.confirm(Utc::now()).unwrap_err();
        assert!(matches!(err, TransferError::IllegalState(_)));
    }

    #[test]
    fn rejecting_a_confirmed_transfer_fails() {
        let mut transfer = sample_transfer();
        transfer.confirm(Utc::now()).unwrap();
        let err = transfer.reject(Utc::now(), "late".to_string()).unwrap_err();
        assert!(matches!(err, TransferError::IllegalState(_)));
    }

    #[test]
    fn idempotency_record_expires_24h_after_creation() {
        let created = Utc::now();
        let record = IdempotencyRecord::new(
            "transfer".to_string(),
            "k1".to_string(),
            "hash".to_string(),
            serde_json::json!({}),
            201,
            created,
        );
        assert_eq!(record.expires_at(), created + Duration::hours(24));
        assert!(!record.is_expired(created + Duration::hours(1)));
        assert!(record.is_expired(created + Duration::hours(25)));
    }
}
