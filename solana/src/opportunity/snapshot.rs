//! Scratch snapshot assembly: resolves a pool's frozen dependency set
//! out of the caches (speculative overlay included) into the mutable
//! state the simulation kernel runs on. Reads exactly the accounts the
//! frozen topology names, nothing else.

use ahash::AHashMap;
use bytemuck::Zeroable;
use engine::enums::RejectReason;
use solana_sdk::pubkey::Pubkey;

use crate::{
    libs::solana_client::{
        dex::{
            PendingSwap, SwapDirection, meteora_dlmm::BinArray, pump_swap,
            raydium_amm::DEFAULT_SWAP_FEE_BPS, raydium_clmm::TickArrayState,
        },
        utils::is_associated_token_account,
    },
    sim::{
        clmm::ClmmState,
        composer::PoolSnapshot,
        dlmm::{self, DlmmParams},
    },
    state::{
        StateCaches, fee_oracle::FeeOracle, pool::PoolState, speculative::SpeculativeLayer,
        topology::FrozenTopology,
    },
};

/// Builds the simulation snapshot for an Active pool from its frozen
/// topology. CP reserves go through the speculative overlay; the
/// concentrated/binned engines run on pool state + arrays (their
/// pending victims are simulated explicitly, not overlaid).
pub fn build_snapshot(
    state: &PoolState,
    topology: &FrozenTopology,
    caches: &StateCaches,
    speculative: &SpeculativeLayer,
    fee_oracle: &FeeOracle,
) -> Result<PoolSnapshot, RejectReason> {
    match state {
        PoolState::PumpSwap(_) | PoolState::RaydiumAmm(_) => {
            let (reserve_a, confirmed_slot_a) = vault_amount(caches, &topology.base_vault)?;
            let (reserve_b, confirmed_slot_b) = vault_amount(caches, &topology.quote_vault)?;

            let (reserve_a, reserve_b) = adjust_reserves(state, reserve_a, reserve_b);

            let snap = speculative.snapshot(
                &topology.pool,
                reserve_a,
                reserve_b,
                confirmed_slot_a.max(confirmed_slot_b),
            );
            if snap.reserve_a == 0 || snap.reserve_b == 0 {
                return Err(RejectReason::EmptyPool);
            }

            let fee_bps = cp_fee_bps(state, topology, caches, fee_oracle)?;
            Ok(PoolSnapshot::Cp {
                reserve_a: snap.reserve_a,
                reserve_b: snap.reserve_b,
                fee_bps,
            })
        }
        PoolState::RaydiumClmm(p) => {
            let config = topology.amm_config.ok_or(RejectReason::MissingTopology)?;
            let fee_rate = caches
                .clmm_configs
                .get(&config)
                .map(|entry| u64::from(entry.value.trade_fee_rate))
                .ok_or(RejectReason::MissingTopology)?;

            let mut arrays = AHashMap::new();
            for index in &topology.tick_array_indexes {
                let Some((array, _virtual)) =
                    caches.tick_arrays.get_or_virtual(&(topology.pool, *index), || {
                        let mut blank = TickArrayState::zeroed();
                        blank.start_tick_index = *index;
                        Box::new(blank)
                    })
                else {
                    return Err(RejectReason::MissingTopology);
                };
                arrays.insert(*index, array);
            }

            Ok(PoolSnapshot::Clmm {
                state: ClmmState {
                    sqrt_price_x64: p.sqrt_price_x64,
                    liquidity: p.liquidity,
                    tick_current: p.tick_current,
                    tick_spacing: p.tick_spacing,
                },
                arrays,
                fee_rate,
            })
        }
        PoolState::MeteoraDlmm(p) => {
            let mut arrays = AHashMap::new();
            for index in &topology.bin_array_indexes {
                let Some((array, _virtual)) =
                    caches.bin_arrays.get_or_virtual(&(topology.pool, *index), || {
                        let mut blank = BinArray::zeroed();
                        blank.index = *index;
                        Box::new(blank)
                    })
                else {
                    return Err(RejectReason::MissingTopology);
                };
                arrays.insert(*index, array);
            }

            let params = DlmmParams::from_pair(p);
            let fee_rate = dlmm::composed_fee_rate(&params);
            Ok(PoolSnapshot::Dlmm {
                active_id: p.active_id,
                params,
                arrays,
                fee_rate,
            })
        }
    }
}

fn vault_amount(caches: &StateCaches, vault: &Pubkey) -> Result<(u64, u64), RejectReason> {
    caches
        .vaults
        .get(vault)
        .map(|entry| (entry.value.amount, entry.slot))
        .ok_or(RejectReason::MissingReserves)
}

/// Vault balances are not always the tradable reserves: the CP-book
/// venue accrues protocol pnl inside its vaults.
fn adjust_reserves(state: &PoolState, reserve_a: u64, reserve_b: u64) -> (u64, u64) {
    match state {
        PoolState::RaydiumAmm(p) => (
            reserve_a.saturating_sub(p.state_data.need_take_pnl_coin),
            reserve_b.saturating_sub(p.state_data.need_take_pnl_pc),
        ),
        _ => (reserve_a, reserve_b),
    }
}

/// Fee sourcing policy: pool state first, then the fee oracle, then
/// the venue default. The kernel itself never holds a fallback.
fn cp_fee_bps(
    state: &PoolState,
    topology: &FrozenTopology,
    caches: &StateCaches,
    fee_oracle: &FeeOracle,
) -> Result<u64, RejectReason> {
    match state {
        PoolState::PumpSwap(_) => {
            if let Some(config) = topology.amm_config
                && let Some(entry) = caches.pump_configs.get(&config)
            {
                return Ok(entry.value.total_fee_bps());
            }
            if let Some(learned) = fee_oracle
                .fee_bps(&topology.pool, SwapDirection::AtoB)
                .or_else(|| fee_oracle.fee_bps(&topology.pool, SwapDirection::BtoA))
            {
                return Ok(learned);
            }
            Ok(pump_swap::DEFAULT_LP_FEE_BPS + pump_swap::DEFAULT_PROTOCOL_FEE_BPS)
        }
        PoolState::RaydiumAmm(p) => Ok(p
            .swap_fee_bps()
            .or_else(|| {
                fee_oracle
                    .fee_bps(&topology.pool, SwapDirection::AtoB)
                    .or_else(|| fee_oracle.fee_bps(&topology.pool, SwapDirection::BtoA))
            })
            .unwrap_or(DEFAULT_SWAP_FEE_BPS)),
        PoolState::RaydiumClmm(_) | PoolState::MeteoraDlmm(_) => Err(RejectReason::Unknown),
    }
}

/// Pins the victim's direction when the instruction did not: vault
/// identity first (exact), then associated-token-account inference
/// against the user's wallet. Unresolvable flows stay `None` and are
/// rejected as weird upstream.
#[must_use]
pub fn resolve_direction(swap: &PendingSwap, state: &PoolState) -> Option<SwapDirection> {
    if let Some(direction) = swap.direction {
        return Some(direction);
    }

    if let Some(vault_in) = swap.venue_vault_in {
        if vault_in == state.vault_a() {
            return Some(SwapDirection::AtoB);
        }
        if vault_in == state.vault_b() {
            return Some(SwapDirection::BtoA);
        }
    }

    let mint_a = state.mint_a();
    let mint_b = state.mint_b();

    if is_associated_token_account(&swap.user_source, &swap.authority, &mint_a) {
        return Some(SwapDirection::AtoB);
    }
    if is_associated_token_account(&swap.user_source, &swap.authority, &mint_b) {
        return Some(SwapDirection::BtoA);
    }
    if is_associated_token_account(&swap.user_destination, &swap.authority, &mint_b) {
        return Some(SwapDirection::AtoB);
    }
    if is_associated_token_account(&swap.user_destination, &swap.authority, &mint_a) {
        return Some(SwapDirection::BtoA);
    }

    None
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;
    use crate::{
        libs::solana_client::{
            dex::{ExactSide, UpdateSource, Venue},
            utils::derive_associated_token_account,
        },
        state::vault::VaultBalance,
    };

    fn pump_state(base_vault: Pubkey, quote_vault: Pubkey) -> PoolState {
        let mut pool = pump_swap::Pool::zeroed();
        pool.base_mint = Pubkey::new_unique().to_bytes();
        pool.quote_mint = Pubkey::new_unique().to_bytes();
        pool.pool_base_token_account = base_vault.to_bytes();
        pool.pool_quote_token_account = quote_vault.to_bytes();
        PoolState::PumpSwap(Box::new(pool))
    }

    fn topology_for(pool: Pubkey, state: &PoolState) -> FrozenTopology {
        FrozenTopology {
            pool,
            venue: state.venue(),
            base_vault: state.vault_a(),
            quote_vault: state.vault_b(),
            tick_array_indexes: vec![],
            bin_array_indexes: vec![],
            amm_config: state.amm_config(),
            frozen_at_slot: 100,
            frozen_at_ms: 1,
        }
    }

    fn commit_vault(caches: &mut StateCaches, key: Pubkey, amount: u64) {
        caches.vaults.commit(
            key,
            VaultBalance {
                amount,
                mint: Pubkey::new_unique(),
            },
            100,
            0,
            UpdateSource::Grpc,
        );
    }

    #[test]
    fn test_cp_snapshot_with_overlay() {
        let pool_key = Pubkey::new_unique();
        let base_vault = Pubkey::new_unique();
        let quote_vault = Pubkey::new_unique();
        let state = pump_state(base_vault, quote_vault);
        let topology = topology_for(pool_key, &state);

        let mut caches = StateCaches::new();
        commit_vault(&mut caches, base_vault, 1_000);
        commit_vault(&mut caches, quote_vault, 2_000);

        let mut speculative = SpeculativeLayer::new(5_000);
        speculative.apply(
            &crate::state::speculative::PendingEntry {
                signature: solana_sdk::signature::Signature::from([1u8; 64]),
                slot: 101,
                deltas: vec![crate::state::speculative::PoolDelta {
                    pool: pool_key,
                    vault_a_delta: 100,
                    vault_b_delta: -182,
                }],
            },
            0,
        );

        let snapshot = build_snapshot(
            &state,
            &topology,
            &caches,
            &speculative,
            &FeeOracle::new(),
        )
        .unwrap();

        match snapshot {
            PoolSnapshot::Cp {
                reserve_a,
                reserve_b,
                fee_bps,
            } => {
                assert_eq!(reserve_a, 1_100);
                assert_eq!(reserve_b, 1_818);
                // No config cached, no oracle entry: defaults.
                assert_eq!(fee_bps, 25);
            }
            _ => panic!("expected CP snapshot"),
        }
    }

    #[test]
    fn test_missing_vault_rejects() {
        let pool_key = Pubkey::new_unique();
        let state = pump_state(Pubkey::new_unique(), Pubkey::new_unique());
        let topology = topology_for(pool_key, &state);

        let result = build_snapshot(
            &state,
            &topology,
            &StateCaches::new(),
            &SpeculativeLayer::new(5_000),
            &FeeOracle::new(),
        );
        assert_eq!(result.unwrap_err(), RejectReason::MissingReserves);
    }

    #[test]
    fn test_resolve_direction_by_vault_identity() {
        let base_vault = Pubkey::new_unique();
        let quote_vault = Pubkey::new_unique();
        let state = pump_state(base_vault, quote_vault);

        let swap = PendingSwap {
            venue: Venue::RaydiumClmm,
            pool: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            user_source: Pubkey::new_unique(),
            user_destination: Pubkey::new_unique(),
            venue_vault_in: Some(quote_vault),
            venue_vault_out: Some(base_vault),
            amount: 1,
            other_amount_threshold: 0,
            exact_side: ExactSide::Input,
            direction: None,
        };

        assert_eq!(resolve_direction(&swap, &state), Some(SwapDirection::BtoA));
    }

    #[test]
    fn test_resolve_direction_by_ata() {
        let state = pump_state(Pubkey::new_unique(), Pubkey::new_unique());
        let wallet = Pubkey::new_unique();
        let source_ata =
            derive_associated_token_account(&wallet, &state.mint_a(), &spl_token::ID);

        let swap = PendingSwap {
            venue: Venue::MeteoraDlmm,
            pool: Pubkey::new_unique(),
            authority: wallet,
            user_source: source_ata,
            user_destination: Pubkey::new_unique(),
            venue_vault_in: None,
            venue_vault_out: None,
            amount: 1,
            other_amount_threshold: 0,
            exact_side: ExactSide::Input,
            direction: None,
        };

        assert_eq!(resolve_direction(&swap, &state), Some(SwapDirection::AtoB));
    }

    #[test]
    fn test_unresolvable_direction_is_none() {
        let state = pump_state(Pubkey::new_unique(), Pubkey::new_unique());
        let swap = PendingSwap {
            venue: Venue::RaydiumAmm,
            pool: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            user_source: Pubkey::new_unique(),
            user_destination: Pubkey::new_unique(),
            venue_vault_in: None,
            venue_vault_out: None,
            amount: 1,
            other_amount_threshold: 0,
            exact_side: ExactSide::Input,
            direction: None,
        };

        assert_eq!(resolve_direction(&swap, &state), None);
    }
}
