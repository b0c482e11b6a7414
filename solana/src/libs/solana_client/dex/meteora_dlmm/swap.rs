//! Anchor `swap` payload: exact input only. The instruction does not
//! encode direction; the user-in token account is matched against the
//! pair's mints downstream.

use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{
    meteora_dlmm::constants::METEORA_DLMM_ID,
    model::{ExactSide, PendingSwap, Venue},
    parser::DexEntity,
};

const MIN_SWAP_ACCOUNTS: usize = 11;

const IDX_PAIR: usize = 0;
const IDX_USER_IN: usize = 4;
const IDX_USER_OUT: usize = 5;
const IDX_USER: usize = 10;

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SwapArgs {
    pub amount_in: u64,
    pub min_amount_out: u64,
}

impl DexEntity for SwapArgs {
    const PROGRAM_ID: Pubkey = METEORA_DLMM_ID;
    const DISCRIMINATOR: &'static [u8] = &[248, 198, 158, 145, 225, 117, 135, 200];
    const DATA_SIZE: usize = 24;

    fn deserialize(data: &[u8]) -> Option<Self> {
        Self::deserialize_bytemuck(data)
    }
}

pub fn resolve_swap(args: &SwapArgs, accounts: &[Pubkey]) -> Option<PendingSwap> {
    if accounts.len() < MIN_SWAP_ACCOUNTS {
        return None;
    }

    Some(PendingSwap {
        venue: Venue::MeteoraDlmm,
        pool: accounts[IDX_PAIR],
        authority: accounts[IDX_USER],
        user_source: accounts[IDX_USER_IN],
        user_destination: accounts[IDX_USER_OUT],
        venue_vault_in: None,
        venue_vault_out: None,
        amount: args.amount_in,
        other_amount_threshold: args.min_amount_out,
        exact_side: ExactSide::Input,
        direction: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_swap_args() {
        let args = SwapArgs {
            amount_in: 77,
            min_amount_out: 70,
        };
        let mut data = SwapArgs::DISCRIMINATOR.to_vec();
        data.extend_from_slice(bytemuck::bytes_of(&args));
        assert_eq!(data.len(), SwapArgs::DATA_SIZE);

        let decoded = SwapArgs::deserialize(&data).unwrap();
        assert_eq!({ decoded.amount_in }, 77);
        assert_eq!({ decoded.min_amount_out }, 70);
    }

    #[test]
    fn test_resolve_maps_accounts() {
        let args = SwapArgs {
            amount_in: 1,
            min_amount_out: 1,
        };
        let accounts: Vec<Pubkey> = (0..13).map(|_| Pubkey::new_unique()).collect();
        let swap = resolve_swap(&args, &accounts).unwrap();

        assert_eq!(swap.venue, Venue::MeteoraDlmm);
        assert_eq!(swap.pool, accounts[0]);
        assert_eq!(swap.user_source, accounts[4]);
        assert_eq!(swap.user_destination, accounts[5]);
        assert_eq!(swap.authority, accounts[10]);
        assert_eq!(swap.exact_side, ExactSide::Input);
        assert_eq!(swap.direction, None);
    }

    #[test]
    fn test_resolve_rejects_short_accounts() {
        let args = SwapArgs {
            amount_in: 1,
            min_amount_out: 1,
        };
        let accounts: Vec<Pubkey> = (0..8).map(|_| Pubkey::new_unique()).collect();
        assert!(resolve_swap(&args, &accounts).is_none());
    }
}
