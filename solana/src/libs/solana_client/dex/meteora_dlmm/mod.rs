pub mod account;
pub mod swap;

pub mod constants {
    use solana_sdk::{pubkey, pubkey::Pubkey};

    pub const METEORA_DLMM_ID: Pubkey = pubkey!("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo");

    /// Bins per bin array account.
    pub const MAX_BINS_PER_ARRAY: usize = 70;
    pub const BINS_PER_ARRAY: i32 = 70;

    /// Arrays covered by the pair's own bitmap: 512 each side of zero.
    pub const BIN_ARRAY_BITMAP_SIZE: i64 = 512;

    /// Fee rates are denominated in 1e9.
    pub const FEE_PRECISION: u128 = 1_000_000_000;

    /// Composed fee cap: 10%.
    pub const MAX_FEE_RATE: u128 = 100_000_000;

    /// Basis-point denominator used by the bin price base.
    pub const BASIS_POINT_MAX: u128 = 10_000;
}

pub use super::meteora_dlmm::{
    account::{Bin, BinArray, LbPair, StaticParameters, VariableParameters, bin_array_index},
    constants::*,
    swap::{SwapArgs, resolve_swap},
};
