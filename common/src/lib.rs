//! Shared leaf types for the Pix wallet workspace.
//!
//! Both `wallet_service` and `transaction_service` depend on this crate so
//! that money arithmetic, timestamps, and the stable core error vocabulary
//! stay identical on both sides of the gRPC boundary between them.

pub mod clock;
pub mod error;
pub mod money;

pub use clock::{Clock, FrozenClock, SystemClock};
pub use error::CoreErrorKind;
pub use money::{validate_pix_amount, Money};
