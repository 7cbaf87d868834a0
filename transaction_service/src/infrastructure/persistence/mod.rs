pub mod idempotency_repository;
pub mod models;
pub mod pix_transfer_repository;
