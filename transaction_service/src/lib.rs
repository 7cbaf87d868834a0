//! Transaction Service Library
//!
//! This library acts as the core of the Transaction Service, exporting the necessary modules
//! for the application binary and integration tests.
//!
//! # Modules
//!
//! * `api` - Contains the API interfaces (HTTP/gRPC).
//! * `domain` - Contains the domain entities and business rules.
//! * `infrastructure` - Contains the concrete implementations of repositories and gateways.
//! * `idempotency` - Idempotency Service: at-most-once semantics per (scope, key).
//! * `state` - In-memory transfer-state bookkeeping that accelerates the CAS on `pix_transfers`.
//! * `transfer` - Atomic Transfer Service: initiation and state-transition algorithms.
//! * `orchestrator` - Transfer Orchestrator: translates HTTP/webhook events into core operations.
//! * `jobs` - Background maintenance jobs.

pub mod api;
pub mod domain;
pub mod idempotency;
pub mod infrastructure;
pub mod jobs;
pub mod orchestrator;
pub mod state;
pub mod transfer;
