use chrono::{DateTime, Utc};
use common::Money;
use sqlx::FromRow;

use crate::domain::entities::{LedgerEntry, LedgerEntryType, PixKey, PixKeyType, Wallet};
use crate::domain::types::{LedgerEntryId, PixKeyId, UserId, WalletId};

// Modelo de Base de Datos para Wallet (especifico de SQLx).
// Representa la tabla 'wallets'.
#[derive(Debug, FromRow)]
pub struct WalletModel {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance_cents: i64,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WalletModel> for Wallet {
    fn from(m: WalletModel) -> Self {
        Wallet::reconstitute(
            m.id,
            m.user_id,
            Money::from_minor_units(m.balance_cents),
            m.version,
            m.created_at,
            m.updated_at,
        )
    }
}

// Modelo de Base de Datos para LedgerEntry (especifico de SQLx).
// Representa la tabla 'ledger_entries'.
#[derive(Debug, FromRow)]
pub struct LedgerEntryModel {
    pub id: LedgerEntryId,
    pub wallet_id: WalletId,
    pub signed_amount_cents: i64,
    pub entry_type: LedgerEntryType,
    pub description: String,
    pub transaction_id: String,
    pub balance_after_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntryModel> for LedgerEntry {
    fn from(m: LedgerEntryModel) -> Self {
        LedgerEntry::reconstitute(
            m.id,
            m.wallet_id,
            Money::from_minor_units(m.signed_amount_cents),
            m.entry_type,
            m.description,
            m.transaction_id,
            Money::from_minor_units(m.balance_after_cents),
            m.created_at,
        )
    }
}

// Modelo de Base de Datos para PixKey (especifico de SQLx).
// Representa la tabla 'pix_keys'.
#[derive(Debug, FromRow)]
pub struct PixKeyModel {
    pub id: PixKeyId,
    pub key_value: String,
    pub key_type: PixKeyType,
    pub wallet_id: WalletId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PixKeyModel> for PixKey {
    fn from(m: PixKeyModel) -> Self {
        PixKey::reconstitute(
            m.id,
            m.key_value,
            m.key_type,
            m.wallet_id,
            m.is_active,
            m.created_at,
        )
    }
}
