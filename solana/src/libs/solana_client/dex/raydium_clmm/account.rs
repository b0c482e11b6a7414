use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{
    parser::DexEntity,
    raydium_clmm::constants::{
        RAYDIUM_CLMM_ID, REWARD_NUM, TICK_ARRAY_BITMAP_SIZE, TICK_ARRAY_SIZE,
        TICK_ARRAY_SIZE_USIZE,
    },
};

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PoolState {
    /// Bump to identify PDA
    pub bump: [u8; 1],
    pub amm_config: [u8; 32],
    pub owner: [u8; 32],

    /// Token pair of the pool, where token_mint_0 address < token_mint_1
    pub token_mint_0: [u8; 32],
    pub token_mint_1: [u8; 32],

    pub token_vault_0: [u8; 32],
    pub token_vault_1: [u8; 32],

    pub observation_key: [u8; 32],

    pub mint_decimals_0: u8,
    pub mint_decimals_1: u8,

    /// The minimum number of ticks between initialized ticks
    pub tick_spacing: u16,
    /// Currently in-range liquidity
    pub liquidity: u128,
    /// Current price as sqrt(token_1/token_0), Q64.64
    pub sqrt_price_x64: u128,
    /// Tick of the last transition that was run
    pub tick_current: i32,

    pub padding3: u16,
    pub padding4: u16,

    pub fee_growth_global_0_x64: u128,
    pub fee_growth_global_1_x64: u128,

    pub protocol_fees_token_0: u64,
    pub protocol_fees_token_1: u64,

    pub swap_in_amount_token_0: u128,
    pub swap_out_amount_token_1: u128,
    pub swap_in_amount_token_1: u128,
    pub swap_out_amount_token_0: u128,

    /// bit4 set disables swap
    pub status: u8,
    pub padding: [u8; 7],

    pub reward_infos: [RewardInfo; REWARD_NUM],

    /// Packed initialized tick array state, 512 arrays each side
    pub tick_array_bitmap: [u64; 16],

    pub total_fees_token_0: u64,
    pub total_fees_claimed_token_0: u64,
    pub total_fees_token_1: u64,
    pub total_fees_claimed_token_1: u64,

    pub fund_fees_token_0: u64,
    pub fund_fees_token_1: u64,

    pub open_time: u64,
    pub recent_epoch: u64,

    pub padding1: [u64; 24],
    pub padding2: [u64; 32],
}

impl DexEntity for PoolState {
    const PROGRAM_ID: Pubkey = RAYDIUM_CLMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[247, 237, 227, 245, 215, 195, 222, 70];
    const DATA_SIZE: usize = 1544;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

impl PoolState {
    #[must_use]
    pub fn amm_config(&self) -> Pubkey {
        Pubkey::new_from_array(self.amm_config)
    }

    #[must_use]
    pub fn token_mint_0(&self) -> Pubkey {
        Pubkey::new_from_array(self.token_mint_0)
    }

    #[must_use]
    pub fn token_mint_1(&self) -> Pubkey {
        Pubkey::new_from_array(self.token_mint_1)
    }

    #[must_use]
    pub fn token_vault_0(&self) -> Pubkey {
        Pubkey::new_from_array(self.token_vault_0)
    }

    #[must_use]
    pub fn token_vault_1(&self) -> Pubkey {
        Pubkey::new_from_array(self.token_vault_1)
    }

    #[must_use]
    pub fn is_swap_enabled(&self) -> bool {
        self.status & (1 << 4) == 0
    }

    /// Start index of the array holding `tick`.
    #[must_use]
    pub fn tick_array_start_index(&self, tick: i32) -> i32 {
        let spacing = self.tick_spacing;
        let ticks_per_array = i32::from(spacing) * TICK_ARRAY_SIZE;
        tick.div_euclid(ticks_per_array) * ticks_per_array
    }

    /// Bitmap check for a tick array start index. `None` when the index
    /// falls outside the pool-held bitmap (extension bitmap territory),
    /// in which case existence is unknown rather than false.
    #[must_use]
    pub fn is_tick_array_initialized(&self, start_index: i32) -> Option<bool> {
        let spacing = self.tick_spacing;
        let ticks_per_array = i32::from(spacing) * TICK_ARRAY_SIZE;
        if start_index % ticks_per_array != 0 {
            return Some(false);
        }

        let offset = start_index / ticks_per_array + TICK_ARRAY_BITMAP_SIZE;
        if !(0..TICK_ARRAY_BITMAP_SIZE * 2).contains(&offset) {
            return None;
        }

        let bitmap = self.tick_array_bitmap;
        let word = (offset / 64) as usize;
        let bit = (offset % 64) as u32;
        Some(bitmap[word] & (1u64 << bit) != 0)
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RewardInfo {
    pub reward_state: u8,
    pub open_time: u64,
    pub end_time: u64,
    pub last_update_time: u64,
    /// Q64.64 tokens per second per unit of liquidity
    pub emissions_per_second_x64: u128,
    pub reward_total_emissioned: u64,
    pub reward_claimed: u64,
    pub token_mint: [u8; 32],
    pub token_vault: [u8; 32],
    pub authority: [u8; 32],
    pub reward_growth_global_x64: u128,
}

/// Per-tier fee configuration referenced by the pool. The simulator
/// must use `trade_fee_rate` from here, never a constant.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AmmConfig {
    pub bump: u8,
    pub index: u16,
    pub owner: [u8; 32],
    /// Share of the trade fee, denominated 1e6
    pub protocol_fee_rate: u32,
    /// Trade fee, denominated 1e6
    pub trade_fee_rate: u32,
    pub tick_spacing: u16,
    pub fund_fee_rate: u32,
    pub padding_u32: u32,
    pub fund_owner: [u8; 32],
    pub padding: [u64; 3],
}

impl DexEntity for AmmConfig {
    const PROGRAM_ID: Pubkey = RAYDIUM_CLMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[218, 244, 33, 104, 203, 203, 43, 111];
    const DATA_SIZE: usize = 117;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TickState {
    pub tick: i32,
    /// Net liquidity change when crossing left to right
    pub liquidity_net: i128,
    /// Total position liquidity referencing this tick
    pub liquidity_gross: u128,
    pub fee_growth_outside_0_x64: u128,
    pub fee_growth_outside_1_x64: u128,
    pub reward_growths_outside_x64: [u128; REWARD_NUM],
    pub padding: [u32; 13],
}

impl TickState {
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        let gross = self.liquidity_gross;
        gross != 0
    }
}

/// One array of 60 consecutive tick slots, keyed by
/// `(pool, start_tick_index)`.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TickArrayState {
    pub pool_id: [u8; 32],
    pub start_tick_index: i32,
    pub ticks: [TickState; TICK_ARRAY_SIZE_USIZE],
    pub initialized_tick_count: u8,
    pub recent_epoch: u64,
    pub padding: [u8; 107],
}

impl DexEntity for TickArrayState {
    const PROGRAM_ID: Pubkey = RAYDIUM_CLMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[192, 155, 85, 205, 49, 249, 129, 42];
    const DATA_SIZE: usize = 10_240;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

impl TickArrayState {
    #[must_use]
    pub fn pool_id(&self) -> Pubkey {
        Pubkey::new_from_array(self.pool_id)
    }

    /// Copies out the tick slots; packed layout forbids references
    /// into the array, so walkers should take this copy once.
    #[must_use]
    pub fn ticks(&self) -> [TickState; TICK_ARRAY_SIZE_USIZE] {
        self.ticks
    }
}
