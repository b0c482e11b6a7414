//! V4 swap instructions use single-byte legacy tags, not Anchor
//! hashes: `9` = swap_base_in, `11` = swap_base_out. Direction is not
//! encoded; it follows from which mint the user source account holds,
//! so it is resolved downstream against the cached pool.

use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{
    model::{ExactSide, PendingSwap, Venue},
    parser::DexEntity,
    raydium_amm::constants::RAYDIUM_AMM_ID,
};

const IDX_POOL: usize = 1;

/// Exact input: `amount_in` fixed, `minimum_amount_out` floor.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SwapBaseIn {
    pub amount_in: u64,
    pub minimum_amount_out: u64,
}

impl DexEntity for SwapBaseIn {
    const PROGRAM_ID: Pubkey = RAYDIUM_AMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[9];
    const DATA_SIZE: usize = 17;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

/// Exact output: `amount_out` fixed, `max_amount_in` ceiling.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SwapBaseOut {
    pub max_amount_in: u64,
    pub amount_out: u64,
}

impl DexEntity for SwapBaseOut {
    const PROGRAM_ID: Pubkey = RAYDIUM_AMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[11];
    const DATA_SIZE: usize = 17;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

/// The instruction comes in a 17-account form and an 18-account form
/// that inserts `target_orders` at index 4; user accounts sit at the
/// tail either way.
fn user_indexes(accounts: &[Pubkey]) -> Option<(usize, usize, usize)> {
    match accounts.len() {
        17 => Some((14, 15, 16)),
        18 => Some((15, 16, 17)),
        _ => None,
    }
}

pub fn resolve_swap_base_in(args: &SwapBaseIn, accounts: &[Pubkey]) -> Option<PendingSwap> {
    let (src, dst, owner) = user_indexes(accounts)?;
    Some(PendingSwap {
        venue: Venue::RaydiumAmm,
        pool: accounts[IDX_POOL],
        authority: accounts[owner],
        user_source: accounts[src],
        user_destination: accounts[dst],
        venue_vault_in: None,
        venue_vault_out: None,
        amount: args.amount_in,
        other_amount_threshold: args.minimum_amount_out,
        exact_side: ExactSide::Input,
        direction: None,
    })
}

pub fn resolve_swap_base_out(args: &SwapBaseOut, accounts: &[Pubkey]) -> Option<PendingSwap> {
    let (src, dst, owner) = user_indexes(accounts)?;
    Some(PendingSwap {
        venue: Venue::RaydiumAmm,
        pool: accounts[IDX_POOL],
        authority: accounts[owner],
        user_source: accounts[src],
        user_destination: accounts[dst],
        venue_vault_in: None,
        venue_vault_out: None,
        amount: args.amount_out,
        other_amount_threshold: args.max_amount_in,
        exact_side: ExactSide::Output,
        direction: None,
    })
}
