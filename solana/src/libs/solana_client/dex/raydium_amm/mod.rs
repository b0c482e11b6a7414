mod account;
mod swap;

pub mod constants {
    use solana_sdk::{pubkey, pubkey::Pubkey};

    pub const RAYDIUM_AMM_ID: Pubkey = pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8");

    /// Fallback when the on-chain fee denominator is zero (never seen
    /// on mainnet pools, but the kernel refuses hard-coded fees).
    pub const DEFAULT_SWAP_FEE_BPS: u64 = 25;
}

pub use super::raydium_amm::{
    account::{AmmInfo, Fees, StateData},
    constants::*,
    swap::{SwapBaseIn, SwapBaseOut, resolve_swap_base_in, resolve_swap_base_out},
};
