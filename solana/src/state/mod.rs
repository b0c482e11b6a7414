pub mod fee_oracle;
pub mod lifecycle;
pub mod pool;
pub mod speculative;
pub mod store;
pub mod topology;
pub mod vault;

use solana_sdk::pubkey::Pubkey;

use crate::{
    libs::solana_client::dex::{meteora_dlmm, pump_swap, raydium_clmm},
    state::{pool::PoolState, store::Store, vault::VaultBalance},
};

/// All typed account caches, owned and mutated only by the critical
/// worker. Array stores are keyed by `(pool, index)`; commits arrive
/// with the pool embedded in the account payload.
pub struct StateCaches {
    pub pools: Store<Pubkey, PoolState>,
    pub vaults: Store<Pubkey, VaultBalance>,
    pub tick_arrays: Store<(Pubkey, i32), Box<raydium_clmm::TickArrayState>>,
    pub bin_arrays: Store<(Pubkey, i64), Box<meteora_dlmm::BinArray>>,
    pub clmm_configs: Store<Pubkey, raydium_clmm::AmmConfig>,
    pub pump_configs: Store<Pubkey, pump_swap::GlobalConfig>,
}

impl StateCaches {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: Store::new("pool"),
            vaults: Store::new("vault"),
            tick_arrays: Store::new("tick_array"),
            bin_arrays: Store::new("bin_array"),
            clmm_configs: Store::new("clmm_config"),
            pump_configs: Store::new("pump_config"),
        }
    }
}

impl Default for StateCaches {
    fn default() -> Self {
        Self::new()
    }
}
