pub mod fake_wallet_gateway;
pub mod grpc_wallet_gateway;
