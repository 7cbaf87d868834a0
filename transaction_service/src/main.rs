use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use transaction_service::{
    api::http_routes::{routes, AppState},
    domain::gateways::WalletGateway,
    idempotency::IdempotencyService,
    infrastructure::{
        gateways::{fake_wallet_gateway::FakeWalletGateway, grpc_wallet_gateway::GrpcWalletGateway},
        persistence::{
            idempotency_repository::PostgresIdempotencyRepository,
            pix_transfer_repository::PostgresPixTransferRepository,
        },
    },
    jobs::cleanup::CleanupJob,
    orchestrator::TransferOrchestrator,
    state::TransferStateCache,
    transfer::AtomicTransferService,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        transaction_service::api::http_routes::initiate_transfer,
        transaction_service::api::http_routes::handle_webhook
    ),
    components(schemas(
        transaction_service::api::http_routes::InitiateTransferRequest,
        transaction_service::api::http_routes::WebhookRequest,
        transaction_service::api::http_routes::TransferView,
        transaction_service::api::response::ApiResponse<serde_json::Value>
    ))
)]
struct ApiDoc;

fn env_minutes(key: &str, default_minutes: u64) -> std::time::Duration {
    let minutes = env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_minutes);
    std::time::Duration::from_secs(minutes * 60)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Cargar variables de entorno
    dotenv().ok();

    // 2. Configurar Logging/Tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting Transaction Service...");

    // 3. Configurar Conexión a Base de Datos
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    info!("Connected to Database");

    // 4. Instanciar Dependencias (Infraestructura)
    let clock: Arc<dyn common::Clock> = Arc::new(common::SystemClock);
    let transfer_repo = Arc::new(PostgresPixTransferRepository::new(pool.clone()));
    let idempotency_repo = Arc::new(PostgresIdempotencyRepository::new(pool.clone()));

    // El Wallet Gateway real cruza a `wallet_service` por gRPC; en ausencia
    // de `WALLET_SERVICE_URL` se usa el gateway en memoria para desarrollo
    // local sin levantar el otro servicio (§0 del workspace).
    let wallet_gateway: Arc<dyn WalletGateway> = match env::var("WALLET_SERVICE_URL") {
        Ok(url) => {
            info!("Using GrpcWalletGateway against {}", url);
            Arc::new(GrpcWalletGateway::new(url))
        }
        Err(_) => {
            info!("WALLET_SERVICE_URL not set, using in-memory FakeWalletGateway");
            Arc::new(FakeWalletGateway::new())
        }
    };

    // 5. Instanciar los servicios del núcleo
    let idempotency = Arc::new(IdempotencyService::new(idempotency_repo.clone(), clock.clone()));
    let transfer_state_cache = Arc::new(TransferStateCache::new());
    let transfer_service = Arc::new(AtomicTransferService::new(
        transfer_repo.clone(),
        wallet_gateway.clone(),
        transfer_state_cache.clone(),
        clock.clone(),
    ));
    let orchestrator = Arc::new(TransferOrchestrator::new(
        idempotency.clone(),
        transfer_service,
        transfer_repo,
        wallet_gateway,
        clock,
    ));

    // 6. Configurar Estado de la App Axum
    let app_state = Arc::new(AppState {
        orchestrator,
        idempotency: idempotency.clone(),
    });

    // 7. Configurar Rutas y Servidor
    let app = routes(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("{}:{}", host, port);

    // 8. Iniciar Background Jobs (Procesos en Segundo Plano)
    let cleanup_interval = env_minutes("CLEANUP_INTERVAL_MINUTES", 15);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        let job = CleanupJob::new(idempotency, transfer_state_cache);

        info!("Background cleanup job scheduler started (every {:?})", cleanup_interval);

        loop {
            interval.tick().await;
            job.run().await;
        }
    });

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
