use chrono::{DateTime, Utc};
use common::Money;
use serde::{Deserialize, Serialize};

use crate::domain::error::{PixKeyError, WalletError};
use crate::domain::types::{LedgerEntryId, PixKeyId, UserId, WalletId};

/// Modelo de Entidad: Wallet.
///
/// Representa la billetera de un usuario: identidad, saldo actual y un
/// contador de versión para optimistic locking. El saldo nunca se muta
/// directamente — solo el Wallet Engine, tras anexar un `LedgerEntry`, puede
/// producir una nueva instancia con el saldo actualizado.
///
/// # Examples
/// ```
/// use wallet_service::domain::entities::Wallet;
/// use wallet_service::domain::types::UserId;
///
/// let wallet = Wallet::builder().user_id(UserId::new()).build();
/// assert!(wallet.balance().is_zero());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    id: WalletId,
    user_id: UserId,
    balance: Money,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn builder() -> WalletBuilder {
        WalletBuilder::default()
    }

    /// Reconstruye una billetera cargada desde la persistencia.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: WalletId,
        user_id: UserId,
        balance: Money,
        version: i32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            balance,
            version,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Builder que asegura que una Wallet recién creada arranca en saldo cero,
/// versión cero, sin aceptar un `user_id` implícito.
#[derive(Default)]
pub struct WalletBuilder {
    user_id: Option<UserId>,
}

impl WalletBuilder {
    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn build(self) -> Wallet {
        let now = Utc::now();
        Wallet {
            id: WalletId::new(),
            user_id: self.user_id.unwrap_or_default(),
            balance: Money::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tipo de asiento del libro mayor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryType {
    Credit,
    Debit,
}

/// Modelo de Entidad: LedgerEntry.
///
/// Registro inmutable de un único cambio de saldo sobre una wallet. Nunca se
/// muta ni se borra — solo se anexa bajo el lease exclusivo de la wallet
/// (véase `wallet_service::engine::WalletEngine`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    id: LedgerEntryId,
    wallet_id: WalletId,
    signed_amount: Money,
    entry_type: LedgerEntryType,
    description: String,
    transaction_id: String,
    balance_after: Money,
    created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Construye un asiento de CRÉDITO: `amount` debe ser positivo.
    pub fn credit(
        wallet_id: WalletId,
        amount: Money,
        description: String,
        transaction_id: String,
        balance_after: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            wallet_id,
            signed_amount: amount,
            entry_type: LedgerEntryType::Credit,
            description,
            transaction_id,
            balance_after,
            created_at,
        }
    }

    /// Construye un asiento de DÉBITO: el monto almacenado es negativo.
    pub fn debit(
        wallet_id: WalletId,
        amount: Money,
        description: String,
        transaction_id: String,
        balance_after: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            wallet_id,
            signed_amount: amount.negate(),
            entry_type: LedgerEntryType::Debit,
            description,
            transaction_id,
            balance_after,
            created_at,
        }
    }

    pub fn reconstitute(
        id: LedgerEntryId,
        wallet_id: WalletId,
        signed_amount: Money,
        entry_type: LedgerEntryType,
        description: String,
        transaction_id: String,
        balance_after: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            wallet_id,
            signed_amount,
            entry_type,
            description,
            transaction_id,
            balance_after,
            created_at,
        }
    }

    pub fn id(&self) -> LedgerEntryId {
        self.id
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    pub fn signed_amount(&self) -> Money {
        self.signed_amount
    }

    pub fn entry_type(&self) -> LedgerEntryType {
        self.entry_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn balance_after(&self) -> Money {
        self.balance_after
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Variantes de clave Pix soportadas.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema,
)]
#[sqlx(type_name = "pix_key_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixKeyType {
    Email,
    Phone,
    NationalId,
    Random,
}

/// Modelo de Entidad: PixKey.
///
/// Alias de ruteo (email/telefono/id-nacional/uuid aleatorio) que resuelve a
/// exactamente una wallet activa. La validación de *formato* de cada tipo de
/// clave queda fuera del núcleo (ver Non-goals de la especificación).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixKey {
    id: PixKeyId,
    key_value: String,
    key_type: PixKeyType,
    wallet_id: WalletId,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl PixKey {
    pub fn new(
        key_value: String,
        key_type: PixKeyType,
        wallet_id: WalletId,
    ) -> Result<Self, PixKeyError> {
        if key_value.trim().is_empty() {
            return Err(PixKeyError::InvalidData(
                "key_value cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id: PixKeyId::new(),
            key_value,
            key_type,
            wallet_id,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    pub fn reconstitute(
        id: PixKeyId,
        key_value: String,
        key_type: PixKeyType,
        wallet_id: WalletId,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            key_value,
            key_type,
            wallet_id,
            is_active,
            created_at,
        }
    }

    pub fn id(&self) -> PixKeyId {
        self.id
    }

    pub fn key_value(&self) -> &str {
        &self.key_value
    }

    pub fn key_type(&self) -> PixKeyType {
        self.key_type
    }

    pub fn wallet_id(&self) -> WalletId {
        self.wallet_id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_builder_starts_at_zero_balance() {
        let wallet = Wallet::builder().user_id(UserId::new()).build();
        assert!(wallet.balance().is_zero());
        assert_eq!(wallet.version(), 0);
    }

    #[test]
    fn ledger_debit_entry_stores_negative_signed_amount() {
        let wallet_id = WalletId::new();
        let entry = LedgerEntry::debit(
            wallet_id,
            Money::from_minor_units(500),
            "withdrawal".to_string(),
            "tx-1".to_string(),
            Money::from_minor_units(500),
            Utc::now(),
        );
        assert!(entry.signed_amount().is_negative());
        assert_eq!(entry.entry_type(), LedgerEntryType::Debit);
    }

    #[test]
    fn pix_key_rejects_empty_value() {
        let result = PixKey::new(" ".to_string(), PixKeyType::Email, WalletId::new());
        assert!(result.is_err());
    }
}
