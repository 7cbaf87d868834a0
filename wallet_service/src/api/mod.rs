pub mod error;
pub mod grpc_service;
pub mod http_routes;
pub mod response;

/// Código generado por `tonic-build` a partir de `proto/wallet.proto`
/// (véase `build.rs`). Expuesto como `wallet_service::api::proto::wallet`.
pub mod proto {
    pub mod wallet {
        tonic::include_proto!("wallet");
    }
}
