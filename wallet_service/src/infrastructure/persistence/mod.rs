pub mod ledger_repository;
pub mod models;
pub mod pix_key_repository;
pub mod wallet_repository;
