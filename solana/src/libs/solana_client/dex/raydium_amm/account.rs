use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{parser::DexEntity, raydium_amm::constants::RAYDIUM_AMM_ID};

/// Fee ratios, all numerator/denominator pairs.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Fees {
    pub min_separate_numerator: u64,
    pub min_separate_denominator: u64,
    pub trade_fee_numerator: u64,
    pub trade_fee_denominator: u64,
    pub pnl_numerator: u64,
    pub pnl_denominator: u64,
    pub swap_fee_numerator: u64,
    pub swap_fee_denominator: u64,
}

/// Running pnl/volume bookkeeping kept on the pool.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StateData {
    pub need_take_pnl_coin: u64,
    pub need_take_pnl_pc: u64,
    pub total_pnl_pc: u64,
    pub total_pnl_coin: u64,
    pub pool_open_time: u64,
    pub punish_pc_amount: u64,
    pub punish_coin_amount: u64,
    pub orderbook_to_init_time: u64,
    pub swap_coin_in_amount: u128,
    pub swap_pc_out_amount: u128,
    pub swap_acc_pc_fee: u64,
    pub swap_pc_in_amount: u128,
    pub swap_coin_out_amount: u128,
    pub swap_acc_coin_fee: u64,
}

/// V4 pool account: no discriminator, matched by owner + exact length.
/// Coin = base (A side), pc = quote (B side). Vault balances include
/// amounts owed to the protocol (`need_take_pnl_*`), which must be
/// subtracted to get tradable reserves.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AmmInfo {
    pub status: u64,
    pub nonce: u64,
    pub order_num: u64,
    pub depth: u64,
    pub coin_decimals: u64,
    pub pc_decimals: u64,
    pub state: u64,
    pub reset_flag: u64,
    pub min_size: u64,
    pub vol_max_cut_ratio: u64,
    pub amount_wave: u64,
    pub coin_lot_size: u64,
    pub pc_lot_size: u64,
    pub min_price_multiplier: u64,
    pub max_price_multiplier: u64,
    pub sys_decimal_value: u64,
    pub fees: Fees,
    pub state_data: StateData,
    pub coin_vault: [u8; 32],
    pub pc_vault: [u8; 32],
    pub coin_vault_mint: [u8; 32],
    pub pc_vault_mint: [u8; 32],
    pub lp_mint: [u8; 32],
    pub open_orders: [u8; 32],
    pub market: [u8; 32],
    pub market_program: [u8; 32],
    pub target_orders: [u8; 32],
    pub withdraw_queue: [u8; 32],
    pub token_temp_lp: [u8; 32],
    pub amm_owner: [u8; 32],
    pub pnl_owner: [u8; 32],
}

impl DexEntity for AmmInfo {
    const PROGRAM_ID: Pubkey = RAYDIUM_AMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[];
    const DATA_SIZE: usize = 752;

    fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() != Self::DATA_SIZE {
            return None;
        }
        Self::deserialize_bytemuck(data)
    }
}

impl AmmInfo {
    #[must_use]
    pub fn coin_vault(&self) -> Pubkey {
        Pubkey::new_from_array(self.coin_vault)
    }

    #[must_use]
    pub fn pc_vault(&self) -> Pubkey {
        Pubkey::new_from_array(self.pc_vault)
    }

    #[must_use]
    pub fn coin_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.coin_vault_mint)
    }

    #[must_use]
    pub fn pc_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.pc_vault_mint)
    }

    #[must_use]
    pub fn open_orders(&self) -> Pubkey {
        Pubkey::new_from_array(self.open_orders)
    }

    /// Status 1 = initialized, 6 = swap-only; both allow trading.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self.status, 1 | 6)
    }

    /// Swap fee in basis points, rounded up the way the program rounds
    /// fee charges.
    #[must_use]
    pub fn swap_fee_bps(&self) -> Option<u64> {
        let numerator = self.fees.swap_fee_numerator;
        let denominator = self.fees.swap_fee_denominator;
        if denominator == 0 {
            return None;
        }
        Some((numerator as u128 * 10_000).div_ceil(denominator as u128) as u64)
    }
}
