mod account;
mod swap;

pub mod constants {
    use solana_sdk::{pubkey, pubkey::Pubkey};

    pub const RAYDIUM_CLMM_ID: Pubkey = pubkey!("CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK");

    // Number of reward tokens
    pub const REWARD_NUM: usize = 3;

    // Ticks per tick array account.
    pub const TICK_ARRAY_SIZE: i32 = 60;
    pub const TICK_ARRAY_SIZE_USIZE: usize = 60;

    /// Arrays covered by the pool's own bitmap: 512 each side of zero.
    pub const TICK_ARRAY_BITMAP_SIZE: i32 = 512;
}

pub use super::raydium_clmm::{
    account::{AmmConfig, PoolState, RewardInfo, TickArrayState, TickState},
    constants::*,
    swap::{SwapArgs, SwapV2Args, resolve_swap},
};
