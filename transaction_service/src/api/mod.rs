pub mod error;
pub mod http_routes;
pub mod response;

/// Código generado por `tonic-build` a partir de `proto/wallet.proto`
/// (véase `build.rs`). Expuesto como `transaction_service::api::proto::wallet`
/// para que `GrpcWalletGateway` consuma el cliente sin duplicar el esquema.
pub mod proto {
    pub mod wallet {
        tonic::include_proto!("wallet");
    }
}
