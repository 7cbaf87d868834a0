pub mod create_wallet;
pub mod deposit;
pub mod get_balance;
pub mod register_pix_key;
pub mod withdraw;

pub use create_wallet::CreateWalletUseCase;
pub use deposit::DepositUseCase;
pub use get_balance::GetBalanceUseCase;
pub use register_pix_key::RegisterPixKeyUseCase;
pub use withdraw::WithdrawUseCase;
