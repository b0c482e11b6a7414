use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{
    meteora_dlmm::constants::{BIN_ARRAY_BITMAP_SIZE, MAX_BINS_PER_ARRAY, METEORA_DLMM_ID},
    parser::DexEntity,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LbPair {
    pub parameters: StaticParameters,
    pub v_parameters: VariableParameters,
    pub bump_seed: [u8; 1],
    pub bin_step_seed: [u8; 2],
    pub pair_type: u8,
    pub active_id: i32,
    pub bin_step: u16,
    pub status: u8,
    pub require_base_factor_seed: u8,
    pub base_factor_seed: [u8; 2],
    pub activation_type: u8,
    pub creator_pool_on_off_control: u8,
    pub token_x_mint: [u8; 32],
    pub token_y_mint: [u8; 32],
    pub reserve_x: [u8; 32],
    pub reserve_y: [u8; 32],
    pub protocol_fee: ProtocolFee,
    pub _padding_1: [u8; 32],
    pub reward_infos: [RewardInfo; 2],
    pub oracle: [u8; 32],
    pub bin_array_bitmap: [u64; 16],
    pub last_updated_at: i64,
    pub _padding_2: [u8; 32],
    pub pre_activation_swap_address: [u8; 32],
    pub base_key: [u8; 32],
    pub activation_point: u64,
    pub pre_activation_duration: u64,
    pub _padding_3: [u8; 8],
    pub _padding_4: u64,
    pub creator: [u8; 32],
    pub token_mint_x_program_flag: u8,
    pub token_mint_y_program_flag: u8,
    pub _reserved: [u8; 22],
}

impl DexEntity for LbPair {
    const PROGRAM_ID: Pubkey = METEORA_DLMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[33, 11, 49, 98, 181, 101, 177, 13];
    const DATA_SIZE: usize = 904;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

impl LbPair {
    #[must_use]
    pub fn token_x_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.token_x_mint)
    }

    #[must_use]
    pub fn token_y_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.token_y_mint)
    }

    #[must_use]
    pub fn reserve_x(&self) -> Pubkey {
        Pubkey::new_from_array(self.reserve_x)
    }

    #[must_use]
    pub fn reserve_y(&self) -> Pubkey {
        Pubkey::new_from_array(self.reserve_y)
    }

    #[must_use]
    pub fn oracle(&self) -> Pubkey {
        Pubkey::new_from_array(self.oracle)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status == 0
    }

    /// Bitmap check for a bin array index. `None` when the index falls
    /// outside the pair-held bitmap (extension account territory), in
    /// which case existence is unknown rather than false.
    #[must_use]
    pub fn is_bin_array_initialized(&self, index: i64) -> Option<bool> {
        let offset = index + BIN_ARRAY_BITMAP_SIZE;
        if !(0..BIN_ARRAY_BITMAP_SIZE * 2).contains(&offset) {
            return None;
        }
        let word = (offset / 64) as usize;
        let bit = (offset % 64) as u32;
        Some(self.bin_array_bitmap[word] & (1u64 << bit) != 0)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StaticParameters {
    pub base_factor: u16,
    pub filter_period: u16,
    pub decay_period: u16,
    pub reduction_factor: u16,
    pub variable_fee_control: u32,
    pub max_volatility_accumulator: u32,
    pub min_bin_id: i32,
    pub max_bin_id: i32,
    pub protocol_share: u16,
    pub padding: [u8; 6],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct VariableParameters {
    pub volatility_accumulator: u32,
    pub volatility_reference: u32,
    pub index_reference: i32,
    pub padding: [u8; 4],
    pub last_update_timestamp: i64,
    pub padding1: [u8; 8],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ProtocolFee {
    pub amount_x: u64,
    pub amount_y: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RewardInfo {
    pub mint: [u8; 32],
    pub vault: [u8; 32],
    pub funder: [u8; 32],
    pub reward_per_second: u128,
    pub reward_index: u128,
    pub last_update_timestamp: i64,
    pub padding: [u8; 8],
}

/// One liquidity bin: reserves on each side plus fee growth trackers.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Bin {
    pub amount_x: u64,
    pub amount_y: u64,
    pub price: u128,
    pub liquidity_supply: u128,
    pub reward_per_token_stored: [u128; 2],
    pub fee_amount_x_per_token_stored: u128,
    pub fee_amount_y_per_token_stored: u128,
    pub amount_x_in: u128,
    pub amount_y_in: u128,
}

impl Bin {
    #[must_use]
    pub fn is_empty_side(&self, y_side: bool) -> bool {
        if y_side {
            self.amount_y == 0
        } else {
            self.amount_x == 0
        }
    }
}

/// 70 consecutive bins, keyed by `(lb_pair, index)`.
/// `start_bin_id = index * 70`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BinArray {
    pub index: i64,
    pub version: u8,
    pub padding: [u8; 7],
    pub lb_pair: [u8; 32],
    pub bins: [Bin; MAX_BINS_PER_ARRAY],
}

impl DexEntity for BinArray {
    const PROGRAM_ID: Pubkey = METEORA_DLMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[92, 142, 92, 220, 5, 148, 70, 181];
    const DATA_SIZE: usize = 10_136;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

impl BinArray {
    #[must_use]
    pub fn lb_pair(&self) -> Pubkey {
        Pubkey::new_from_array(self.lb_pair)
    }

    #[must_use]
    pub fn start_bin_id(&self) -> i32 {
        (self.index * i64::from(super::constants::BINS_PER_ARRAY)) as i32
    }

    /// Bin for an absolute bin id, when it lives in this array.
    #[must_use]
    pub fn bin(&self, bin_id: i32) -> Option<&Bin> {
        let offset = i64::from(bin_id) - i64::from(self.start_bin_id());
        if !(0..MAX_BINS_PER_ARRAY as i64).contains(&offset) {
            return None;
        }
        self.bins.get(offset as usize)
    }
}

/// Array index holding an absolute bin id (floor division, negative
/// ids included).
#[must_use]
pub fn bin_array_index(bin_id: i32) -> i64 {
    i64::from(bin_id).div_euclid(i64::from(super::constants::BINS_PER_ARRAY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(size_of::<LbPair>() + 8, LbPair::DATA_SIZE);
        assert_eq!(size_of::<Bin>(), 144);
        assert_eq!(size_of::<BinArray>() + 8, BinArray::DATA_SIZE);
    }

    #[test]
    fn test_lb_pair_roundtrip() {
        let mint_x = Pubkey::new_unique();
        let mut pair = LbPair::zeroed();
        pair.token_x_mint = mint_x.to_bytes();
        pair.active_id = -3_456;
        pair.bin_step = 25;

        let mut data = LbPair::DISCRIMINATOR.to_vec();
        data.extend_from_slice(bytemuck::bytes_of(&pair));
        assert_eq!(data.len(), LbPair::DATA_SIZE);

        let decoded = LbPair::deserialize(&data).unwrap();
        assert_eq!(decoded.token_x_mint(), mint_x);
        assert_eq!(decoded.active_id, -3_456);
        assert_eq!(decoded.bin_step, 25);
    }

    #[test]
    fn test_bin_array_index_floors() {
        assert_eq!(bin_array_index(0), 0);
        assert_eq!(bin_array_index(69), 0);
        assert_eq!(bin_array_index(70), 1);
        assert_eq!(bin_array_index(-1), -1);
        assert_eq!(bin_array_index(-70), -1);
        assert_eq!(bin_array_index(-71), -2);
    }

    #[test]
    fn test_bin_lookup_within_array() {
        let mut array = BinArray::zeroed();
        array.index = -1;
        array.bins[69].amount_x = 42;

        // Array -1 spans bins [-70, -1]; bin -1 is slot 69.
        assert_eq!(array.start_bin_id(), -70);
        assert_eq!(array.bin(-1).unwrap().amount_x, 42);
        assert!(array.bin(0).is_none());
        assert!(array.bin(-71).is_none());
    }

    #[test]
    fn test_bin_array_bitmap() {
        let mut pair = LbPair::zeroed();
        // Index 0 -> offset 512 -> word 8, bit 0.
        pair.bin_array_bitmap[8] = 1;
        assert_eq!(pair.is_bin_array_initialized(0), Some(true));
        assert_eq!(pair.is_bin_array_initialized(1), Some(false));
        // Index -1 -> offset 511 -> word 7, bit 63.
        pair.bin_array_bitmap[7] = 1u64 << 63;
        assert_eq!(pair.is_bin_array_initialized(-1), Some(true));
        assert_eq!(pair.is_bin_array_initialized(513), None);
        assert_eq!(pair.is_bin_array_initialized(-513), None);
    }
}
