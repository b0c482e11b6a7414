//! Swap instruction contract.
//!
//! Data layout: `discriminator(8) || amount(u64 LE) || threshold(u64 LE)
//! || exact_side(u8)`. Account order is binding:
//! `[pool, global_config, base_vault, quote_vault, user_base, user_quote,
//! user_authority, token_program(s)...]`.

use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{
    model::{ExactSide, PendingSwap, SwapDirection, Venue},
    parser::DexEntity,
    pump_swap::constants::PUMP_SWAP_ID,
};

const MIN_SWAP_ACCOUNTS: usize = 7;

const IDX_POOL: usize = 0;
const IDX_BASE_VAULT: usize = 2;
const IDX_QUOTE_VAULT: usize = 3;
const IDX_USER_BASE: usize = 4;
const IDX_USER_QUOTE: usize = 5;
const IDX_AUTHORITY: usize = 6;

/// Quote in, base out.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BuyArgs {
    pub amount: u64,
    pub threshold: u64,
    pub exact_side: u8,
}

impl DexEntity for BuyArgs {
    const PROGRAM_ID: Pubkey = PUMP_SWAP_ID;
    const DISCRIMINATOR: &'static [u8] = &[102, 6, 61, 18, 1, 218, 235, 234];
    const DATA_SIZE: usize = 25;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

/// Base in, quote out.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SellArgs {
    pub amount: u64,
    pub threshold: u64,
    pub exact_side: u8,
}

impl DexEntity for SellArgs {
    const PROGRAM_ID: Pubkey = PUMP_SWAP_ID;
    const DISCRIMINATOR: &'static [u8] = &[51, 230, 133, 164, 1, 127, 131, 173];
    const DATA_SIZE: usize = 25;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

fn exact_side_from_flag(flag: u8) -> ExactSide {
    if flag == 0 {
        ExactSide::Input
    } else {
        ExactSide::Output
    }
}

pub fn resolve_buy(args: &BuyArgs, accounts: &[Pubkey]) -> Option<PendingSwap> {
    resolve(
        args.amount,
        args.threshold,
        args.exact_side,
        SwapDirection::BtoA,
        accounts,
    )
}

pub fn resolve_sell(args: &SellArgs, accounts: &[Pubkey]) -> Option<PendingSwap> {
    resolve(
        args.amount,
        args.threshold,
        args.exact_side,
        SwapDirection::AtoB,
        accounts,
    )
}

fn resolve(
    amount: u64,
    threshold: u64,
    exact_side: u8,
    direction: SwapDirection,
    accounts: &[Pubkey],
) -> Option<PendingSwap> {
    if accounts.len() < MIN_SWAP_ACCOUNTS {
        return None;
    }

    let (user_source, user_destination, vault_in, vault_out) = match direction {
        SwapDirection::AtoB => (
            accounts[IDX_USER_BASE],
            accounts[IDX_USER_QUOTE],
            accounts[IDX_BASE_VAULT],
            accounts[IDX_QUOTE_VAULT],
        ),
        SwapDirection::BtoA => (
            accounts[IDX_USER_QUOTE],
            accounts[IDX_USER_BASE],
            accounts[IDX_QUOTE_VAULT],
            accounts[IDX_BASE_VAULT],
        ),
    };

    Some(PendingSwap {
        venue: Venue::PumpSwap,
        pool: accounts[IDX_POOL],
        authority: accounts[IDX_AUTHORITY],
        user_source,
        user_destination,
        venue_vault_in: Some(vault_in),
        venue_vault_out: Some(vault_out),
        amount,
        other_amount_threshold: threshold,
        exact_side: exact_side_from_flag(exact_side),
        direction: Some(direction),
    })
}
