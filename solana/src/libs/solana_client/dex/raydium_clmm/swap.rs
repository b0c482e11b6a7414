//! Anchor `swap` / `swap_v2` payloads. Both carry the same args and
//! the same leading account order, so one resolver covers them.
//! Direction is pinned by the input/output vault accounts, which are
//! matched against the cached pool's vault 0/1 downstream.

use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{
    model::{ExactSide, PendingSwap, Venue},
    parser::DexEntity,
    raydium_clmm::constants::RAYDIUM_CLMM_ID,
};

const MIN_SWAP_ACCOUNTS: usize = 10;

const IDX_PAYER: usize = 0;
const IDX_POOL: usize = 2;
const IDX_USER_INPUT: usize = 3;
const IDX_USER_OUTPUT: usize = 4;
const IDX_INPUT_VAULT: usize = 5;
const IDX_OUTPUT_VAULT: usize = 6;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SwapArgs {
    pub amount: u64,
    pub other_amount_threshold: u64,
    pub sqrt_price_limit_x64: u128,
    pub is_base_input: u8,
}

impl DexEntity for SwapArgs {
    const PROGRAM_ID: Pubkey = RAYDIUM_CLMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[248, 198, 158, 145, 225, 117, 135, 200];
    const DATA_SIZE: usize = 41;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

/// Token-2022-aware variant; same args, extra trailing accounts.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SwapV2Args {
    pub amount: u64,
    pub other_amount_threshold: u64,
    pub sqrt_price_limit_x64: u128,
    pub is_base_input: u8,
}

impl DexEntity for SwapV2Args {
    const PROGRAM_ID: Pubkey = RAYDIUM_CLMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[43, 4, 237, 11, 26, 201, 30, 98];
    const DATA_SIZE: usize = 41;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

pub fn resolve_swap(
    amount: u64,
    other_amount_threshold: u64,
    is_base_input: u8,
    accounts: &[Pubkey],
) -> Option<PendingSwap> {
    if accounts.len() < MIN_SWAP_ACCOUNTS {
        return None;
    }

    Some(PendingSwap {
        venue: Venue::RaydiumClmm,
        pool: accounts[IDX_POOL],
        authority: accounts[IDX_PAYER],
        user_source: accounts[IDX_USER_INPUT],
        user_destination: accounts[IDX_USER_OUTPUT],
        venue_vault_in: Some(accounts[IDX_INPUT_VAULT]),
        venue_vault_out: Some(accounts[IDX_OUTPUT_VAULT]),
        amount,
        other_amount_threshold,
        exact_side: if is_base_input != 0 {
            ExactSide::Input
        } else {
            ExactSide::Output
        },
        direction: None,
    })
}
