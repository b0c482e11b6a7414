mod account;
mod swap;

pub mod constants {
    use solana_sdk::{pubkey, pubkey::Pubkey};

    pub const PUMP_SWAP_ID: Pubkey = pubkey!("pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA");

    /// Fallback fee split when no global config account is cached.
    /// Call sites documented upstream as tier-based; the tier table is
    /// unresolved, so the config account wins whenever present.
    pub const DEFAULT_LP_FEE_BPS: u64 = 20;
    pub const DEFAULT_PROTOCOL_FEE_BPS: u64 = 5;
}

pub use super::pump_swap::{
    account::{GlobalConfig, Pool, global_config_address},
    constants::*,
    swap::{BuyArgs, SellArgs, resolve_buy, resolve_sell},
};
