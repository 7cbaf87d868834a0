pub mod wallet_engine;

pub use wallet_engine::WalletEngine;
