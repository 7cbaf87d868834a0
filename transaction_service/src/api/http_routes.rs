use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use common::{validate_pix_amount, Money};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::response::ApiResponse;
use crate::domain::entities::PixTransfer;
use crate::domain::types::WalletId;
use crate::idempotency::IdempotencyService;
use crate::orchestrator::TransferOrchestrator;

/// Estado compartido de la aplicación HTTP de `transaction_service`: el
/// Orchestrator, que ya encapsula la Atomic Transfer Service y el Wallet
/// Gateway, más el Idempotency Service para el cache de respuesta completa
/// en el encabezado `Idempotency-Key` (scope `"transfer"`, distinto del
/// scope `"webhook"` que el propio Orchestrator consulta internamente).
pub struct AppState {
    pub orchestrator: Arc<TransferOrchestrator>,
    pub idempotency: Arc<IdempotencyService>,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/pix/transfers", post(initiate_transfer))
        .route("/pix/webhook", post(handle_webhook))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiateTransferRequest {
    pub from_wallet_id: Uuid,
    pub to_pix_key: String,
    pub amount: String,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct TransferView {
    pub end_to_end_id: String,
    pub idempotency_key: String,
    pub from_wallet_id: Uuid,
    pub to_pix_key: String,
    pub amount: String,
    pub status: String,
}

impl From<PixTransfer> for TransferView {
    fn from(t: PixTransfer) -> Self {
        Self {
            end_to_end_id: t.end_to_end_id().to_string(),
            idempotency_key: t.idempotency_key().to_string(),
            from_wallet_id: t.from_wallet_id().0,
            to_pix_key: t.to_pix_key().to_string(),
            amount: t.amount().to_major_units_string(),
            status: t.status().label().to_string(),
        }
    }
}

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// `POST /pix/transfers` — inicia una transferencia Pix. Requiere el
/// encabezado `Idempotency-Key`; un reintento con la misma clave y el mismo
/// cuerpo recibe exactamente la misma respuesta, sin volver a debitar
/// (§4.6 `initiate`, §4.3 Idempotency Service).
#[utoipa::path(
    post,
    path = "/pix/transfers",
    request_body = InitiateTransferRequest,
    responses(
        (status = 201, body = ApiResponse<TransferView>),
        (status = 400),
        (status = 409, description = "Idempotency-Key reused with a different request body")
    )
)]
pub async fn initiate_transfer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .ok_or_else(|| {
            ApiError::Transfer(crate::domain::error::TransferError::InvalidAmount(
                "missing Idempotency-Key header".to_string(),
            ))
        })?;

    if let Some(existing) = state
        .idempotency
        .find("transfer", &idempotency_key)
        .await?
    {
        if !IdempotencyService::validate_matches(&existing, &body) {
            return Err(ApiError::Transfer(
                crate::domain::error::TransferError::DataIntegrityViolation(
                    "Idempotency-Key reused with a different request body".to_string(),
                ),
            ));
        }
        let status = StatusCode::from_u16(existing.response_status())
            .unwrap_or(StatusCode::OK);
        return Ok((status, Json(existing.response_body().clone())));
    }

    let payload: InitiateTransferRequest = serde_json::from_slice(&body).map_err(|e| {
        ApiError::Transfer(crate::domain::error::TransferError::InvalidAmount(format!(
            "malformed request body: {}",
            e
        )))
    })?;

    let amount = Money::from_major_units_string(&payload.amount).map_err(|_| {
        ApiError::Transfer(crate::domain::error::TransferError::InvalidAmount(
            payload.amount.clone(),
        ))
    })?;
    validate_pix_amount(amount).map_err(|_| {
        ApiError::Transfer(crate::domain::error::TransferError::AmountOutOfRange(
            payload.amount.clone(),
        ))
    })?;

    let transfer = state
        .orchestrator
        .initiate(
            idempotency_key.clone(),
            WalletId(payload.from_wallet_id),
            payload.to_pix_key,
            amount,
        )
        .await?;

    let response_body = serde_json::to_value(ApiResponse::success(TransferView::from(transfer)))
        .unwrap_or(serde_json::json!({"status": "success"}));

    state
        .idempotency
        .save_first(
            "transfer",
            &idempotency_key,
            &body,
            response_body.clone(),
            StatusCode::CREATED.as_u16(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(response_body)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookRequest {
    pub end_to_end_id: String,
    pub event_id: String,
    pub event_type: String,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// `POST /pix/webhook` — notificación asíncrona de confirmación o rechazo.
/// Siempre responde 200 ante una redelivery o un `eventType` desconocido
/// (§4.6 `handleWebhook`: "el evento se considera absorbido").
#[utoipa::path(
    post,
    path = "/pix/webhook",
    request_body = WebhookRequest,
    responses((status = 200, description = "processed or absorbed"), (status = 400))
)]
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .orchestrator
        .handle_webhook(&payload.end_to_end_id, &payload.event_id, &payload.event_type)
        .await?;
    Ok(StatusCode::OK)
}
