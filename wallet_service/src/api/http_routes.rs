use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use common::Money;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::response::ApiResponse;
use crate::domain::entities::{PixKey, PixKeyType, Wallet};
use crate::domain::types::WalletId;
use crate::use_cases::{
    CreateWalletUseCase, DepositUseCase, GetBalanceUseCase, RegisterPixKeyUseCase, WithdrawUseCase,
};

/// Estado compartido de la aplicación HTTP: un caso de uso por operación,
/// cada uno ya construido con sus dependencias (repositorios / Wallet Engine).
pub struct AppState {
    pub create_wallet_use_case: CreateWalletUseCase,
    pub register_pix_key_use_case: RegisterPixKeyUseCase,
    pub get_balance_use_case: GetBalanceUseCase,
    pub deposit_use_case: DepositUseCase,
    pub withdraw_use_case: WithdrawUseCase,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/wallets", post(create_wallet))
        .route("/wallets/{id}/pix-keys", post(register_pix_key))
        .route("/wallets/{id}/balance", get(get_wallet_balance))
        .route("/wallets/{id}/deposit", post(deposit))
        .route("/wallets/{id}/withdraw", post(withdraw))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: String,
    pub version: i32,
}

impl From<Wallet> for WalletView {
    fn from(w: Wallet) -> Self {
        Self {
            id: w.id().0,
            user_id: w.user_id().0,
            balance: w.balance().to_major_units_string(),
            version: w.version(),
        }
    }
}

/// `POST /wallets` — crea una billetera para `userId`. 400 si el usuario ya
/// tiene una.
#[utoipa::path(
    post,
    path = "/wallets",
    request_body = CreateWalletRequest,
    responses((status = 201, body = ApiResponse<WalletView>), (status = 400))
)]
pub async fn create_wallet(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateWalletRequest>,
) -> Result<Json<ApiResponse<WalletView>>, ApiError> {
    let wallet = state
        .create_wallet_use_case
        .execute(crate::domain::types::UserId(payload.user_id))
        .await?;
    Ok(Json(ApiResponse::success(wallet.into())))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterPixKeyRequest {
    pub key_value: String,
    pub key_type: PixKeyType,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PixKeyView {
    pub id: Uuid,
    pub key_value: String,
    pub key_type: PixKeyType,
    pub wallet_id: Uuid,
    pub is_active: bool,
}

impl From<PixKey> for PixKeyView {
    fn from(k: PixKey) -> Self {
        Self {
            id: k.id().0,
            key_value: k.key_value().to_string(),
            key_type: k.key_type(),
            wallet_id: k.wallet_id().0,
            is_active: k.is_active(),
        }
    }
}

/// `POST /wallets/{id}/pix-keys` — registra una clave Pix activa para la
/// billetera.
#[utoipa::path(
    post,
    path = "/wallets/{id}/pix-keys",
    request_body = RegisterPixKeyRequest,
    responses((status = 201, body = ApiResponse<PixKeyView>), (status = 400))
)]
pub async fn register_pix_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RegisterPixKeyRequest>,
) -> Result<Json<ApiResponse<PixKeyView>>, ApiError> {
    let pix_key = state
        .register_pix_key_use_case
        .execute(WalletId(id), payload.key_value, payload.key_type)
        .await?;
    Ok(Json(ApiResponse::success(pix_key.into())))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BalanceQuery {
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceView {
    pub wallet_id: Uuid,
    pub balance: String,
    pub timestamp: DateTime<Utc>,
}

/// `GET /wallets/{id}/balance?at=ISO8601?` — saldo actual, o saldo
/// reconstruido hasta `at` (§4.2 `balance_at`).
#[utoipa::path(
    get,
    path = "/wallets/{id}/balance",
    params(("id" = Uuid, Path), ("at" = Option<DateTime<Utc>>, Query)),
    responses((status = 200, body = ApiResponse<BalanceView>), (status = 404))
)]
pub async fn get_wallet_balance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<ApiResponse<BalanceView>>, ApiError> {
    let view = state
        .get_balance_use_case
        .execute(WalletId(id), query.at)
        .await?;
    Ok(Json(ApiResponse::success(BalanceView {
        wallet_id: view.wallet_id.0,
        balance: view.balance.to_major_units_string(),
        timestamp: view.timestamp,
    })))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MovementRequest {
    pub amount: String,
    pub description: Option<String>,
}

/// `POST /wallets/{id}/deposit` — acredita `amount` a la billetera.
#[utoipa::path(
    post,
    path = "/wallets/{id}/deposit",
    request_body = MovementRequest,
    responses((status = 200, body = ApiResponse<WalletView>), (status = 400))
)]
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MovementRequest>,
) -> Result<Json<ApiResponse<WalletView>>, ApiError> {
    let amount = Money::from_major_units_string(&payload.amount)
        .map_err(|_| ApiError::Wallet(crate::domain::error::WalletError::InvalidAmount(payload.amount.clone())))?;
    let wallet = state
        .deposit_use_case
        .execute(WalletId(id), amount, payload.description)
        .await?;
    Ok(Json(ApiResponse::success(wallet.into())))
}

/// `POST /wallets/{id}/withdraw` — debita `amount` de la billetera. 400 si
/// el saldo es insuficiente o el monto es inválido.
#[utoipa::path(
    post,
    path = "/wallets/{id}/withdraw",
    request_body = MovementRequest,
    responses((status = 200, body = ApiResponse<WalletView>), (status = 400))
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MovementRequest>,
) -> Result<Json<ApiResponse<WalletView>>, ApiError> {
    let amount = Money::from_major_units_string(&payload.amount)
        .map_err(|_| ApiError::Wallet(crate::domain::error::WalletError::InvalidAmount(payload.amount.clone())))?;
    let wallet = state
        .withdraw_use_case
        .execute(WalletId(id), amount, payload.description)
        .await?;
    Ok(Json(ApiResponse::success(wallet.into())))
}
