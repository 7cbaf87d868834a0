use chrono::{DateTime, Utc};
use common::Money;
use sqlx::FromRow;

use crate::domain::entities::{IdempotencyRecord, PixTransfer, TransferStatus};
use crate::domain::types::{IdempotencyRecordId, TransferId, WalletId};

/// Espejo de la columna `status` de Postgres (`pix_transfer_status`). El
/// dominio usa una variante etiquetada con los datos de la transición
/// embebidos (`TransferStatus`); la fila de base de datos los separa en
/// columnas propias (`confirmed_at`, `rejected_at`, `rejection_reason`) como
/// exige el esquema relacional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "pix_transfer_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixTransferStatusDb {
    Pending,
    Confirmed,
    Rejected,
}

#[derive(Debug, FromRow)]
pub struct PixTransferModel {
    pub id: TransferId,
    pub end_to_end_id: String,
    pub idempotency_key: String,
    pub from_wallet_id: WalletId,
    pub to_pix_key: String,
    pub amount_cents: i64,
    pub status: PixTransferStatusDb,
    pub rejection_reason: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl PixTransferModel {
    pub fn status_db(status: &TransferStatus) -> PixTransferStatusDb {
        match status {
            TransferStatus::Pending => PixTransferStatusDb::Pending,
            TransferStatus::Confirmed { .. } => PixTransferStatusDb::Confirmed,
            TransferStatus::Rejected { .. } => PixTransferStatusDb::Rejected,
        }
    }

    pub fn confirmed_at(status: &TransferStatus) -> Option<DateTime<Utc>> {
        match status {
            TransferStatus::Confirmed { confirmed_at } => Some(*confirmed_at),
            _ => None,
        }
    }

    pub fn rejected_at(status: &TransferStatus) -> Option<DateTime<Utc>> {
        match status {
            TransferStatus::Rejected { rejected_at, .. } => Some(*rejected_at),
            _ => None,
        }
    }

    pub fn rejection_reason(status: &TransferStatus) -> Option<String> {
        match status {
            TransferStatus::Rejected { reason, .. } => Some(reason.clone()),
            _ => None,
        }
    }
}

impl From<PixTransferModel> for PixTransfer {
    fn from(m: PixTransferModel) -> Self {
        let status = match m.status {
            PixTransferStatusDb::Pending => TransferStatus::Pending,
            PixTransferStatusDb::Confirmed => TransferStatus::Confirmed {
                confirmed_at: m.confirmed_at.unwrap_or(m.created_at),
            },
            PixTransferStatusDb::Rejected => TransferStatus::Rejected {
                rejected_at: m.rejected_at.unwrap_or(m.created_at),
                reason: m.rejection_reason.unwrap_or_default(),
            },
        };

        PixTransfer::reconstitute(
            m.id,
            m.end_to_end_id,
            m.idempotency_key,
            m.from_wallet_id,
            m.to_pix_key,
            Money::from_minor_units(m.amount_cents),
            status,
            m.created_at,
            m.version,
        )
    }
}

#[derive(Debug, FromRow)]
pub struct IdempotencyRecordModel {
    pub id: IdempotencyRecordId,
    pub scope: String,
    pub idempotency_key: String,
    pub request_hash: String,
    pub response_body: Option<serde_json::Value>,
    pub response_status: i16,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<IdempotencyRecordModel> for IdempotencyRecord {
    fn from(m: IdempotencyRecordModel) -> Self {
        IdempotencyRecord::reconstitute(
            m.id,
            m.scope,
            m.idempotency_key,
            m.request_hash,
            m.response_body.unwrap_or(serde_json::Value::Null),
            m.response_status as u16,
            m.created_at,
            m.expires_at,
        )
    }
}
