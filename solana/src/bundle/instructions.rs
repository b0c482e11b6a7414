//! Venue swap instruction synthesis for our own legs, mirroring the
//! account orders the decoders consume.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::{
    bundle::builder::BundleError,
    libs::solana_client::{
        dex::{
            DexEntity, SwapDirection, Venue,
            meteora_dlmm::{self, METEORA_DLMM_ID},
            pump_swap::{self, PUMP_SWAP_ID},
            raydium_clmm::{self, RAYDIUM_CLMM_ID},
        },
        utils::derive_associated_token_account,
    },
    state::pool::PoolState,
};

pub struct SwapIxParams<'a> {
    pub payer: Pubkey,
    pub pool: Pubkey,
    pub state: &'a PoolState,
    pub direction: SwapDirection,
    pub amount_in: u64,
    pub min_amount_out: u64,
    pub tick_array_indexes: &'a [i32],
    pub bin_array_indexes: &'a [i64],
}

/// Builds the venue swap instruction for one of our legs.
///
/// The CP-book venue needs the attached order-book market accounts,
/// which the engine does not track; plans on it are not buildable.
pub fn build_swap_instruction(params: &SwapIxParams<'_>) -> Result<Instruction, BundleError> {
    match params.state {
        PoolState::PumpSwap(pool) => Ok(pump_swap_instruction(params, pool)),
        PoolState::RaydiumClmm(pool) => Ok(clmm_instruction(params, pool)),
        PoolState::MeteoraDlmm(pair) => Ok(dlmm_instruction(params, pair)),
        PoolState::RaydiumAmm(_) => Err(BundleError::UnsupportedVenue(Venue::RaydiumAmm)),
    }
}

/// Binding account order:
/// `[pool, global_config, base_vault, quote_vault, user_base,
/// user_quote, user_authority, token_program]`.
/// Data: `disc(8) || amount_in || min_out || exact_side(0)`.
fn pump_swap_instruction(params: &SwapIxParams<'_>, pool: &pump_swap::Pool) -> Instruction {
    let user_base =
        derive_associated_token_account(&params.payer, &pool.base_mint(), &spl_token::ID);
    let user_quote =
        derive_associated_token_account(&params.payer, &pool.quote_mint(), &spl_token::ID);

    let discriminator = match params.direction {
        // Spending quote for base is a buy.
        SwapDirection::BtoA => pump_swap::BuyArgs::DISCRIMINATOR,
        SwapDirection::AtoB => pump_swap::SellArgs::DISCRIMINATOR,
    };

    let mut data = discriminator.to_vec();
    data.extend_from_slice(&params.amount_in.to_le_bytes());
    data.extend_from_slice(&params.min_amount_out.to_le_bytes());
    data.push(0);

    Instruction {
        program_id: PUMP_SWAP_ID,
        accounts: vec![
            AccountMeta::new(params.pool, false),
            AccountMeta::new_readonly(pump_swap::global_config_address(), false),
            AccountMeta::new(pool.base_vault(), false),
            AccountMeta::new(pool.quote_vault(), false),
            AccountMeta::new(user_base, false),
            AccountMeta::new(user_quote, false),
            AccountMeta::new(params.payer, true),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
        data,
    }
}

fn clmm_instruction(params: &SwapIxParams<'_>, pool: &raydium_clmm::PoolState) -> Instruction {
    let (input_mint, output_mint, input_vault, output_vault) = match params.direction {
        SwapDirection::AtoB => (
            pool.token_mint_0(),
            pool.token_mint_1(),
            pool.token_vault_0(),
            pool.token_vault_1(),
        ),
        SwapDirection::BtoA => (
            pool.token_mint_1(),
            pool.token_mint_0(),
            pool.token_vault_1(),
            pool.token_vault_0(),
        ),
    };

    let user_input = derive_associated_token_account(&params.payer, &input_mint, &spl_token::ID);
    let user_output = derive_associated_token_account(&params.payer, &output_mint, &spl_token::ID);

    let mut data = raydium_clmm::SwapArgs::DISCRIMINATOR.to_vec();
    data.extend_from_slice(&params.amount_in.to_le_bytes());
    data.extend_from_slice(&params.min_amount_out.to_le_bytes());
    data.extend_from_slice(&0u128.to_le_bytes());
    data.push(1); // exact input

    let mut accounts = vec![
        AccountMeta::new(params.payer, true),
        AccountMeta::new_readonly(pool.amm_config(), false),
        AccountMeta::new(params.pool, false),
        AccountMeta::new(user_input, false),
        AccountMeta::new(user_output, false),
        AccountMeta::new(input_vault, false),
        AccountMeta::new(output_vault, false),
        AccountMeta::new(Pubkey::new_from_array(pool.observation_key), false),
        AccountMeta::new_readonly(spl_token::ID, false),
    ];
    for index in params.tick_array_indexes {
        accounts.push(AccountMeta::new(
            tick_array_address(&params.pool, *index),
            false,
        ));
    }

    Instruction {
        program_id: RAYDIUM_CLMM_ID,
        accounts,
        data,
    }
}

fn dlmm_instruction(params: &SwapIxParams<'_>, pair: &meteora_dlmm::LbPair) -> Instruction {
    let (input_mint, output_mint) = match params.direction {
        SwapDirection::AtoB => (pair.token_x_mint(), pair.token_y_mint()),
        SwapDirection::BtoA => (pair.token_y_mint(), pair.token_x_mint()),
    };

    let user_input = derive_associated_token_account(&params.payer, &input_mint, &spl_token::ID);
    let user_output = derive_associated_token_account(&params.payer, &output_mint, &spl_token::ID);

    let mut data = meteora_dlmm::SwapArgs::DISCRIMINATOR.to_vec();
    data.extend_from_slice(&params.amount_in.to_le_bytes());
    data.extend_from_slice(&params.min_amount_out.to_le_bytes());

    let mut accounts = vec![
        AccountMeta::new(params.pool, false),
        // No bitmap extension: the program id is the anchor "none".
        AccountMeta::new_readonly(METEORA_DLMM_ID, false),
        AccountMeta::new(pair.reserve_x(), false),
        AccountMeta::new(pair.reserve_y(), false),
        AccountMeta::new(user_input, false),
        AccountMeta::new(user_output, false),
        AccountMeta::new_readonly(pair.token_x_mint(), false),
        AccountMeta::new_readonly(pair.token_y_mint(), false),
        AccountMeta::new(pair.oracle(), false),
        // No host fee account.
        AccountMeta::new_readonly(METEORA_DLMM_ID, false),
        AccountMeta::new(params.payer, true),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(spl_token::ID, false),
    ];
    for index in params.bin_array_indexes {
        accounts.push(AccountMeta::new(
            bin_array_address(&params.pool, *index),
            false,
        ));
    }

    Instruction {
        program_id: METEORA_DLMM_ID,
        accounts,
        data,
    }
}

#[must_use]
pub fn tick_array_address(pool: &Pubkey, start_index: i32) -> Pubkey {
    Pubkey::find_program_address(
        &[b"tick_array", pool.as_ref(), &start_index.to_be_bytes()],
        &RAYDIUM_CLMM_ID,
    )
    .0
}

#[must_use]
pub fn bin_array_address(lb_pair: &Pubkey, index: i64) -> Pubkey {
    Pubkey::find_program_address(
        &[b"bin_array", lb_pair.as_ref(), &index.to_le_bytes()],
        &METEORA_DLMM_ID,
    )
    .0
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;

    #[test]
    fn test_pump_swap_instruction_shape() {
        let mut pool = pump_swap::Pool::zeroed();
        pool.base_mint = Pubkey::new_unique().to_bytes();
        pool.quote_mint = Pubkey::new_unique().to_bytes();
        pool.pool_base_token_account = Pubkey::new_unique().to_bytes();
        pool.pool_quote_token_account = Pubkey::new_unique().to_bytes();
        let state = PoolState::PumpSwap(Box::new(pool));

        let params = SwapIxParams {
            payer: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            state: &state,
            direction: SwapDirection::BtoA,
            amount_in: 1_000_000,
            min_amount_out: 990_000,
            tick_array_indexes: &[],
            bin_array_indexes: &[],
        };

        let ix = build_swap_instruction(&params).unwrap();
        assert_eq!(ix.program_id, PUMP_SWAP_ID);
        assert_eq!(ix.accounts.len(), 8);
        assert_eq!(ix.accounts[0].pubkey, params.pool);
        assert!(ix.accounts[6].is_signer);
        assert_eq!(ix.data.len(), 25);
        assert!(ix.data.starts_with(pump_swap::BuyArgs::DISCRIMINATOR));
        assert_eq!(&ix.data[8..16], &1_000_000u64.to_le_bytes());
    }

    #[test]
    fn test_clmm_instruction_includes_tick_arrays() {
        let mut pool = raydium_clmm::PoolState::zeroed();
        pool.amm_config = Pubkey::new_unique().to_bytes();
        pool.token_mint_0 = Pubkey::new_unique().to_bytes();
        pool.token_mint_1 = Pubkey::new_unique().to_bytes();
        pool.token_vault_0 = Pubkey::new_unique().to_bytes();
        pool.token_vault_1 = Pubkey::new_unique().to_bytes();
        let vault_0 = pool.token_vault_0();
        let state = PoolState::RaydiumClmm(Box::new(pool));

        let params = SwapIxParams {
            payer: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            state: &state,
            direction: SwapDirection::AtoB,
            amount_in: 5,
            min_amount_out: 4,
            tick_array_indexes: &[-600, 0, 600],
            bin_array_indexes: &[],
        };

        let ix = build_swap_instruction(&params).unwrap();
        assert_eq!(ix.program_id, RAYDIUM_CLMM_ID);
        assert_eq!(ix.accounts.len(), 9 + 3);
        // AtoB: vault 0 is the input vault.
        assert_eq!(ix.accounts[5].pubkey, vault_0);
        assert_eq!(ix.data.len(), 41);
        assert_eq!(*ix.data.last().unwrap(), 1);
    }

    #[test]
    fn test_dlmm_instruction_shape() {
        let mut pair = meteora_dlmm::LbPair::zeroed();
        pair.token_x_mint = Pubkey::new_unique().to_bytes();
        pair.token_y_mint = Pubkey::new_unique().to_bytes();
        pair.reserve_x = Pubkey::new_unique().to_bytes();
        pair.reserve_y = Pubkey::new_unique().to_bytes();
        pair.oracle = Pubkey::new_unique().to_bytes();
        let state = PoolState::MeteoraDlmm(Box::new(pair));

        let params = SwapIxParams {
            payer: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            state: &state,
            direction: SwapDirection::AtoB,
            amount_in: 10,
            min_amount_out: 9,
            tick_array_indexes: &[],
            bin_array_indexes: &[-1, 0],
        };

        let ix = build_swap_instruction(&params).unwrap();
        assert_eq!(ix.program_id, METEORA_DLMM_ID);
        assert_eq!(ix.accounts.len(), 13 + 2);
        assert_eq!(ix.data.len(), 24);
        assert!(ix.accounts[10].is_signer);
    }

    #[test]
    fn test_cp_book_is_not_buildable() {
        let state = PoolState::RaydiumAmm(Box::new(
            crate::libs::solana_client::dex::raydium_amm::AmmInfo::zeroed(),
        ));
        let params = SwapIxParams {
            payer: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            state: &state,
            direction: SwapDirection::AtoB,
            amount_in: 1,
            min_amount_out: 1,
            tick_array_indexes: &[],
            bin_array_indexes: &[],
        };
        assert!(matches!(
            build_swap_instruction(&params),
            Err(BundleError::UnsupportedVenue(Venue::RaydiumAmm))
        ));
    }

    #[test]
    fn test_pda_addresses_are_deterministic() {
        let pool = Pubkey::new_unique();
        assert_eq!(tick_array_address(&pool, -600), tick_array_address(&pool, -600));
        assert_ne!(tick_array_address(&pool, -600), tick_array_address(&pool, 0));
        assert_eq!(bin_array_address(&pool, 3), bin_array_address(&pool, 3));
    }
}
