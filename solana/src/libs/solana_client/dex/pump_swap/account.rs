use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{parser::DexEntity, pump_swap::constants::PUMP_SWAP_ID};

/// Bonding-pair pool account. Vault reserves are not cached on the
/// pool; they live in the two token accounts referenced here.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Pool {
    pub pool_bump: u8,
    pub index: u16,
    pub creator: [u8; 32],
    pub base_mint: [u8; 32],
    pub quote_mint: [u8; 32],
    pub lp_mint: [u8; 32],
    pub pool_base_token_account: [u8; 32],
    pub pool_quote_token_account: [u8; 32],
    pub lp_supply: u64,
    pub coin_creator: [u8; 32],
}

impl DexEntity for Pool {
    const PROGRAM_ID: Pubkey = PUMP_SWAP_ID;
    const DISCRIMINATOR: &'static [u8] = &[241, 154, 109, 4, 17, 177, 109, 188];
    const DATA_SIZE: usize = 243;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

impl Pool {
    #[must_use]
    pub fn base_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.base_mint)
    }

    #[must_use]
    pub fn quote_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.quote_mint)
    }

    #[must_use]
    pub fn base_vault(&self) -> Pubkey {
        Pubkey::new_from_array(self.pool_base_token_account)
    }

    #[must_use]
    pub fn quote_vault(&self) -> Pubkey {
        Pubkey::new_from_array(self.pool_quote_token_account)
    }
}

/// Program-wide fee configuration: `PDA(["global_config"])`.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GlobalConfig {
    pub admin: [u8; 32],
    pub lp_fee_basis_points: u64,
    pub protocol_fee_basis_points: u64,
    pub disable_flags: u8,
    pub protocol_fee_recipients: [[u8; 32]; 8],
    pub coin_creator_fee_basis_points: u64,
}

impl DexEntity for GlobalConfig {
    const PROGRAM_ID: Pubkey = PUMP_SWAP_ID;
    const DISCRIMINATOR: &'static [u8] = &[149, 8, 156, 202, 160, 252, 176, 217];
    const DATA_SIZE: usize = 321;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

impl GlobalConfig {
    /// Fees are deducted from input; lp and protocol shares add up on
    /// the same side.
    #[must_use]
    pub fn total_fee_bps(&self) -> u64 {
        self.lp_fee_basis_points + self.protocol_fee_basis_points
    }

    #[must_use]
    pub fn swaps_disabled(&self) -> bool {
        self.disable_flags != 0
    }
}

#[must_use]
pub fn global_config_address() -> Pubkey {
    Pubkey::find_program_address(&[b"global_config"], &PUMP_SWAP_ID).0
}
