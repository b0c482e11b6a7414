//! Sequential multi-hop composition. Each leg runs against a scratch
//! snapshot of its pool, mutating it so later legs (including a return
//! trip through the same pool) see the post-swap state.

use ahash::AHashMap;
use ruint::aliases::U256;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::{
    libs::solana_client::dex::{
        SwapDirection, meteora_dlmm::BinArray, raydium_clmm::TickArrayState,
    },
    sim::{
        clmm::{self, ClmmState},
        cp,
        dlmm::{self, DlmmParams},
        model::{SimError, SimOutput, SwapLeg},
    },
};

/// Mutable per-pool scratch state for one composition run.
#[derive(Debug, Clone)]
pub enum PoolSnapshot {
    Cp {
        reserve_a: u64,
        reserve_b: u64,
        fee_bps: u64,
    },
    Clmm {
        state: ClmmState,
        arrays: AHashMap<i32, Box<TickArrayState>>,
        fee_rate: u64,
    },
    Dlmm {
        active_id: i32,
        params: DlmmParams,
        arrays: AHashMap<i64, Box<BinArray>>,
        fee_rate: u128,
    },
}

impl PoolSnapshot {
    /// Runs one exact-input swap and folds the state change into the
    /// snapshot.
    pub fn swap(
        &mut self,
        amount_in: u64,
        direction: SwapDirection,
    ) -> Result<SimOutput, SimError> {
        match self {
            Self::Cp {
                reserve_a,
                reserve_b,
                fee_bps,
            } => {
                let (reserve_in, reserve_out) = match direction {
                    SwapDirection::AtoB => (*reserve_a, *reserve_b),
                    SwapDirection::BtoA => (*reserve_b, *reserve_a),
                };
                let quote = cp::get_amount_out(reserve_in, reserve_out, amount_in, *fee_bps)?;
                match direction {
                    SwapDirection::AtoB => {
                        *reserve_a = quote.new_reserve_in;
                        *reserve_b = quote.new_reserve_out;
                    }
                    SwapDirection::BtoA => {
                        *reserve_b = quote.new_reserve_in;
                        *reserve_a = quote.new_reserve_out;
                    }
                }
                Ok(SimOutput {
                    amount_out: quote.amount_out,
                    fee_paid: quote.fee_paid,
                    price_impact_bps: quote.price_impact_bps,
                })
            }
            Self::Clmm {
                state,
                arrays,
                fee_rate,
            } => {
                let zero_for_one = direction == SwapDirection::AtoB;
                let spot =
                    clmm_spot_out(state.sqrt_price_x64, amount_in, zero_for_one)?;
                let result =
                    clmm::simulate_swap(state, arrays, amount_in, zero_for_one, *fee_rate)?;
                *state = result.state;
                Ok(SimOutput {
                    amount_out: result.amount_out,
                    fee_paid: result.fee_paid,
                    price_impact_bps: impact_bps(spot, result.amount_out),
                })
            }
            Self::Dlmm {
                active_id,
                params,
                arrays,
                fee_rate,
            } => {
                let swap_for_y = direction == SwapDirection::AtoB;
                let spot = dlmm_spot_out(*active_id, params.bin_step, amount_in, swap_for_y)?;
                let result = dlmm::simulate_swap(
                    *active_id,
                    params,
                    arrays,
                    amount_in,
                    swap_for_y,
                    *fee_rate,
                )?;
                *active_id = result.active_id;
                Ok(SimOutput {
                    amount_out: result.amount_out,
                    fee_paid: result.fee_paid,
                    price_impact_bps: impact_bps(spot, result.amount_out),
                })
            }
        }
    }
}

/// Fee-free fill at the current sqrt price, for impact accounting.
fn clmm_spot_out(sqrt_price_x64: u128, amount_in: u64, zero_for_one: bool) -> Result<u64, SimError> {
    let price_sq = U256::from(sqrt_price_x64) * U256::from(sqrt_price_x64);
    let out = if zero_for_one {
        (U256::from(amount_in) * price_sq) >> 128usize
    } else {
        if price_sq.is_zero() {
            return Err(SimError::MathOverflow);
        }
        (U256::from(amount_in) << 128usize) / price_sq
    };
    Ok(u64::try_from(out).unwrap_or(u64::MAX))
}

fn dlmm_spot_out(active_id: i32, bin_step: u16, amount_in: u64, swap_for_y: bool) -> Result<u64, SimError> {
    let price = dlmm::get_price_from_id(active_id, bin_step)?;
    let out = if swap_for_y {
        (U256::from(amount_in) * U256::from(price)) >> 64usize
    } else {
        (U256::from(amount_in) << 64usize) / U256::from(price)
    };
    Ok(u64::try_from(out).unwrap_or(u64::MAX))
}

fn impact_bps(spot_out: u64, actual_out: u64) -> u64 {
    if spot_out == 0 || actual_out >= spot_out {
        return 0;
    }
    (u128::from(spot_out - actual_out) * 10_000 / u128::from(spot_out)) as u64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathValidation {
    pub valid: bool,
    pub circular: bool,
    pub error: Option<String>,
}

/// Checks token continuity and placeholder mints across a route.
#[must_use]
pub fn validate_path(legs: &[SwapLeg]) -> PathValidation {
    if legs.is_empty() {
        return PathValidation {
            valid: false,
            circular: false,
            error: Some("Empty path".to_owned()),
        };
    }

    for (i, leg) in legs.iter().enumerate() {
        if leg.input_mint == Pubkey::default() || leg.output_mint == Pubkey::default() {
            return PathValidation {
                valid: false,
                circular: false,
                error: Some(format!("Placeholder mint at leg {i}")),
            };
        }
    }

    for (i, pair) in legs.windows(2).enumerate() {
        if pair[0].output_mint != pair[1].input_mint {
            return PathValidation {
                valid: false,
                circular: false,
                error: Some(format!("Token discontinuity at leg {i}")),
            };
        }
    }

    let circular = legs[0].input_mint == legs[legs.len() - 1].output_mint;
    PathValidation {
        valid: true,
        circular,
        error: None,
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("invalid path: {0}")]
    Invalid(String),
    #[error("no snapshot for pool {0}")]
    MissingPool(Pubkey),
    #[error("simulation failed at leg {leg}: {source}")]
    Sim { leg: usize, source: SimError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    pub final_amount: u64,
    pub leg_outputs: Vec<u64>,
    /// For circular paths, `net_output - net_input` in the starting
    /// mint's units.
    pub circular_profit: Option<i128>,
}

/// Executes a route leg by leg, threading `output_i -> input_{i+1}`
/// through the scratch snapshots.
pub fn execute_path(
    legs: &[SwapLeg],
    pools: &mut AHashMap<Pubkey, PoolSnapshot>,
) -> Result<PathResult, ComposeError> {
    let validation = validate_path(legs);
    if !validation.valid {
        return Err(ComposeError::Invalid(
            validation.error.unwrap_or_else(|| "invalid".to_owned()),
        ));
    }

    let mut amount = legs[0].input_amount;
    let mut leg_outputs = Vec::with_capacity(legs.len());

    for (i, leg) in legs.iter().enumerate() {
        let snapshot = pools
            .get_mut(&leg.pool)
            .ok_or(ComposeError::MissingPool(leg.pool))?;
        let output = snapshot
            .swap(amount, leg.direction)
            .map_err(|source| ComposeError::Sim { leg: i, source })?;
        amount = output.amount_out;
        leg_outputs.push(amount);
    }

    let circular_profit = validation
        .circular
        .then(|| i128::from(amount) - i128::from(legs[0].input_amount));

    Ok(PathResult {
        final_amount: amount,
        leg_outputs,
        circular_profit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::solana_client::dex::ExactSide;

    fn leg(pool: Pubkey, input_mint: Pubkey, output_mint: Pubkey, amount: u64) -> SwapLeg {
        SwapLeg {
            program_id: Pubkey::new_unique(),
            pool,
            direction: SwapDirection::AtoB,
            input_mint,
            output_mint,
            input_amount: amount,
            min_output_amount: 0,
            exact_side: ExactSide::Input,
        }
    }

    #[test]
    fn test_circular_path_is_valid() {
        let (m1, m2, m3) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let legs = vec![
            leg(Pubkey::new_unique(), m1, m2, 100),
            leg(Pubkey::new_unique(), m2, m3, 0),
            leg(Pubkey::new_unique(), m3, m1, 0),
        ];

        let validation = validate_path(&legs);
        assert!(validation.valid);
        assert!(validation.circular);
        assert_eq!(validation.error, None);
    }

    #[test]
    fn test_token_discontinuity_is_reported_with_leg_index() {
        let (m1, m2, m3, m4) = (
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
        );
        let legs = vec![
            leg(Pubkey::new_unique(), m1, m2, 100),
            leg(Pubkey::new_unique(), m2, m3, 0),
            leg(Pubkey::new_unique(), m4, m1, 0),
        ];

        let validation = validate_path(&legs);
        assert!(!validation.valid);
        assert_eq!(
            validation.error.as_deref(),
            Some("Token discontinuity at leg 1")
        );
    }

    #[test]
    fn test_placeholder_mint_rejected() {
        let m1 = Pubkey::new_unique();
        let legs = vec![leg(Pubkey::new_unique(), Pubkey::default(), m1, 100)];
        let validation = validate_path(&legs);
        assert!(!validation.valid);
        assert_eq!(
            validation.error.as_deref(),
            Some("Placeholder mint at leg 0")
        );
    }

    #[test]
    fn test_two_hop_execution_threads_outputs() {
        let (m1, m2, m3) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let (p1, p2) = (Pubkey::new_unique(), Pubkey::new_unique());

        let mut pools = AHashMap::from_iter([
            (
                p1,
                PoolSnapshot::Cp {
                    reserve_a: 1_000_000_000,
                    reserve_b: 1_000_000_000,
                    fee_bps: 25,
                },
            ),
            (
                p2,
                PoolSnapshot::Cp {
                    reserve_a: 2_000_000_000,
                    reserve_b: 1_000_000_000,
                    fee_bps: 25,
                },
            ),
        ]);

        let legs = vec![leg(p1, m1, m2, 10_000_000), leg(p2, m2, m3, 0)];
        let result = execute_path(&legs, &mut pools).unwrap();

        assert_eq!(result.leg_outputs.len(), 2);
        // Leg 1 near 1:1 minus fee/impact; leg 2 near 1:2.
        assert!(result.leg_outputs[0] < 10_000_000);
        assert!(result.leg_outputs[0] > 9_800_000);
        assert!(result.final_amount < result.leg_outputs[0] / 2 + 10_000);
        assert!(result.circular_profit.is_none());
    }

    #[test]
    fn test_round_trip_through_one_pool_loses_value() {
        let (m1, m2) = (Pubkey::new_unique(), Pubkey::new_unique());
        let p = Pubkey::new_unique();

        let mut pools = AHashMap::from_iter([(
            p,
            PoolSnapshot::Cp {
                reserve_a: 1_000_000_000,
                reserve_b: 1_000_000_000,
                fee_bps: 25,
            },
        )]);

        let mut enter = leg(p, m1, m2, 50_000_000);
        enter.direction = SwapDirection::AtoB;
        let mut exit = leg(p, m2, m1, 0);
        exit.direction = SwapDirection::BtoA;

        let result = execute_path(&[enter, exit], &mut pools).unwrap();
        let profit = result.circular_profit.unwrap();
        assert!(profit < 0, "round trip should lose fees and impact");
    }

    #[test]
    fn test_missing_pool_snapshot() {
        let (m1, m2) = (Pubkey::new_unique(), Pubkey::new_unique());
        let p = Pubkey::new_unique();
        let mut pools = AHashMap::new();

        let result = execute_path(&[leg(p, m1, m2, 100)], &mut pools);
        assert!(matches!(result, Err(ComposeError::MissingPool(pool)) if pool == p));
    }
}
