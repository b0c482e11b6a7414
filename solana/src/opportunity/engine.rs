//! Backrun search: size a counter-trade against a pending victim swap
//! along a fixed candidate ladder and keep the best net result after
//! gas and tip.

use engine::enums::RejectReason;
use solana_sdk::pubkey::Pubkey;

use crate::{
    config::StrategyConfig,
    libs::solana_client::dex::{ExactSide, PendingSwap, SwapDirection, Venue},
    sim::{composer::PoolSnapshot, cp, model::SimError},
    state::pool::PoolState,
};

/// Raw-unit floor under which victim swaps are rounding noise.
const DUST_AMOUNT: u64 = 10_000;

/// A sized, profitable backrun ready for bundle assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackrunPlan {
    pub pool: Pubkey,
    pub venue: Venue,
    /// Victim's direction; our enter leg runs the opposite way.
    pub victim_direction: SwapDirection,
    pub input_amount: u64,
    pub expected_intermediate: u64,
    pub expected_final: u64,
    pub min_intermediate: u64,
    pub min_final: u64,
    pub gross_profit: i128,
    pub net_profit: i128,
    pub gas_cost: u64,
    pub tip: u64,
}

pub struct OpportunityEngine {
    candidate_ladder: Vec<u64>,
    min_profit_lamports: u64,
    slippage_bps: u64,
    gas_cost: u64,
    tip: u64,
}

impl OpportunityEngine {
    #[must_use]
    pub fn new(strategy: &StrategyConfig) -> Self {
        Self {
            candidate_ladder: strategy.candidate_lamports.clone(),
            min_profit_lamports: strategy.min_profit_lamports,
            slippage_bps: strategy.slippage_bps,
            gas_cost: (u128::from(strategy.compute_unit_limit)
                * u128::from(strategy.compute_unit_price)
                / 1_000_000) as u64,
            tip: strategy.tip_lamports,
        }
    }

    /// Evaluates one victim swap against the pool snapshot. The
    /// snapshot must be post-speculative-overlay, pre-victim.
    pub fn evaluate(
        &self,
        pool: Pubkey,
        state: &PoolState,
        snapshot: &PoolSnapshot,
        victim: &PendingSwap,
        victim_direction: SwapDirection,
    ) -> Result<BackrunPlan, RejectReason> {
        let victim_amount_in = self.victim_amount_in(snapshot, victim, victim_direction)?;
        if victim_amount_in < DUST_AMOUNT {
            return Err(RejectReason::DustInput);
        }

        // Victim swap on scratch state.
        let mut post_victim = snapshot.clone();
        post_victim
            .swap(victim_amount_in, victim_direction)
            .map_err(map_sim_error)?;

        // Ladder search: the enter leg buys the dislocated side on the
        // post-victim state; the exit leg prices against the
        // pre-victim baseline, i.e. the fair value the pool reverts to
        // once arbitrage flow rebalances it.
        let mut best: Option<(u64, u64, u64, i128)> = None;
        for &candidate in &self.candidate_ladder {
            let mut enter_scratch = post_victim.clone();
            let Ok(enter) = enter_scratch.swap(candidate, victim_direction.reverse()) else {
                continue;
            };

            let mut exit_scratch = snapshot.clone();
            let Ok(exit) = exit_scratch.swap(enter.amount_out, victim_direction) else {
                continue;
            };

            let gross = i128::from(exit.amount_out) - i128::from(candidate);
            let is_better = best.is_none_or(|(_, _, _, g)| gross > g);
            if is_better {
                best = Some((candidate, enter.amount_out, exit.amount_out, gross));
            }
        }

        let Some((input_amount, intermediate, final_amount, gross_profit)) = best else {
            return Err(RejectReason::SimFailure);
        };
        if gross_profit <= 0 {
            return Err(RejectReason::NoSpread);
        }

        let net_profit = gross_profit - i128::from(self.gas_cost) - i128::from(self.tip);
        if net_profit < i128::from(self.min_profit_lamports) {
            return Err(RejectReason::BelowThreshold);
        }

        Ok(BackrunPlan {
            pool,
            venue: state.venue(),
            victim_direction,
            input_amount,
            expected_intermediate: intermediate,
            expected_final: final_amount,
            min_intermediate: self.apply_slippage(intermediate),
            min_final: self.apply_slippage(final_amount),
            gross_profit,
            net_profit,
            gas_cost: self.gas_cost,
            tip: self.tip,
        })
    }

    /// Effective victim input. Exact-output victims are back-solved
    /// from their requested output via the exact-output formula; that
    /// back-solve only exists in closed form for CP state.
    fn victim_amount_in(
        &self,
        snapshot: &PoolSnapshot,
        victim: &PendingSwap,
        direction: SwapDirection,
    ) -> Result<u64, RejectReason> {
        match victim.exact_side {
            ExactSide::Input => Ok(victim.amount),
            ExactSide::Output => match snapshot {
                PoolSnapshot::Cp {
                    reserve_a,
                    reserve_b,
                    fee_bps,
                } => {
                    let (reserve_in, reserve_out) = match direction {
                        SwapDirection::AtoB => (*reserve_a, *reserve_b),
                        SwapDirection::BtoA => (*reserve_b, *reserve_a),
                    };
                    cp::get_amount_in(reserve_in, reserve_out, victim.amount, *fee_bps)
                        .map_err(map_sim_error)
                }
                PoolSnapshot::Clmm { .. } | PoolSnapshot::Dlmm { .. } => {
                    Err(RejectReason::WeirdFlow)
                }
            },
        }
    }

    fn apply_slippage(&self, expected: u64) -> u64 {
        (u128::from(expected) * (10_000 - u128::from(self.slippage_bps)) / 10_000) as u64
    }

    #[must_use]
    pub fn gas_cost(&self) -> u64 {
        self.gas_cost
    }
}

fn map_sim_error(err: SimError) -> RejectReason {
    match err {
        SimError::InsufficientLiquidity => RejectReason::InsufficientLiquidity,
        SimError::MathOverflow => RejectReason::MathOverflow,
        SimError::NoTickArray(_) | SimError::MissingBinArray(_) => RejectReason::MissingTopology,
        SimError::InvalidInput => RejectReason::SimFailure,
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;
    use crate::{config::StrategyConfig, libs::solana_client::dex::pump_swap};

    fn strategy(min_profit: u64) -> StrategyConfig {
        StrategyConfig {
            candidate_lamports: vec![
                10_000_000,
                50_000_000,
                100_000_000,
                250_000_000,
                500_000_000,
                1_000_000_000,
            ],
            min_profit_lamports: min_profit,
            slippage_bps: 50,
            compute_unit_limit: 400_000,
            compute_unit_price: 50_000,
            tip_lamports: 10_000,
            pending_timeout_ms: 5_000,
            pending_high_water: 4_096,
            tick_array_radius: 1,
            bin_array_radius: 1,
        }
    }

    fn pump_state() -> PoolState {
        PoolState::PumpSwap(Box::new(pump_swap::Pool::zeroed()))
    }

    fn victim(amount: u64, exact_side: ExactSide) -> PendingSwap {
        PendingSwap {
            venue: Venue::PumpSwap,
            pool: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            user_source: Pubkey::new_unique(),
            user_destination: Pubkey::new_unique(),
            venue_vault_in: None,
            venue_vault_out: None,
            amount,
            other_amount_threshold: 0,
            exact_side,
            direction: Some(SwapDirection::AtoB),
        }
    }

    fn deep_pool() -> PoolSnapshot {
        PoolSnapshot::Cp {
            reserve_a: 1_000_000_000_000,
            reserve_b: 500_000_000_000,
            fee_bps: 25,
        }
    }

    #[test]
    fn test_large_victim_yields_profitable_backrun() {
        let engine = OpportunityEngine::new(&strategy(1_000));
        // Victim dumps 5% of the A reserve: a large price dislocation.
        let plan = engine
            .evaluate(
                Pubkey::new_unique(),
                &pump_state(),
                &deep_pool(),
                &victim(50_000_000_000, ExactSide::Input),
                SwapDirection::AtoB,
            )
            .unwrap();

        assert!(plan.gross_profit > 0);
        assert!(plan.net_profit >= 1_000);
        assert!(plan.min_final < plan.expected_final);
        assert_eq!(plan.gas_cost, 400_000 * 50_000 / 1_000_000);
        // The enter leg runs opposite the victim.
        assert_eq!(plan.victim_direction, SwapDirection::AtoB);
    }

    #[test]
    fn test_tiny_victim_has_no_spread() {
        let engine = OpportunityEngine::new(&strategy(1_000));
        // A 0.002% dislocation cannot cover two swap fees.
        let result = engine.evaluate(
            Pubkey::new_unique(),
            &pump_state(),
            &deep_pool(),
            &victim(20_000_000, ExactSide::Input),
            SwapDirection::AtoB,
        );
        assert_eq!(result.unwrap_err(), RejectReason::NoSpread);
    }

    #[test]
    fn test_dust_victim_rejected() {
        let engine = OpportunityEngine::new(&strategy(1_000));
        let result = engine.evaluate(
            Pubkey::new_unique(),
            &pump_state(),
            &deep_pool(),
            &victim(9_999, ExactSide::Input),
            SwapDirection::AtoB,
        );
        assert_eq!(result.unwrap_err(), RejectReason::DustInput);
    }

    #[test]
    fn test_below_threshold_rejected() {
        // Demand an absurd minimum profit.
        let engine = OpportunityEngine::new(&strategy(u64::MAX / 4));
        let result = engine.evaluate(
            Pubkey::new_unique(),
            &pump_state(),
            &deep_pool(),
            &victim(50_000_000_000, ExactSide::Input),
            SwapDirection::AtoB,
        );
        assert_eq!(result.unwrap_err(), RejectReason::BelowThreshold);
    }

    #[test]
    fn test_exact_output_victim_back_solved() {
        let engine = OpportunityEngine::new(&strategy(1_000));
        // Victim wants an exact 20B of B out (4% of that reserve).
        let plan = engine
            .evaluate(
                Pubkey::new_unique(),
                &pump_state(),
                &deep_pool(),
                &victim(20_000_000_000, ExactSide::Output),
                SwapDirection::AtoB,
            )
            .unwrap();
        assert!(plan.net_profit > 0);
    }

    #[test]
    fn test_exact_output_unsupported_on_concentrated() {
        let engine = OpportunityEngine::new(&strategy(1_000));
        let snapshot = PoolSnapshot::Clmm {
            state: crate::sim::clmm::ClmmState {
                sqrt_price_x64: 1u128 << 64,
                liquidity: 1,
                tick_current: 0,
                tick_spacing: 1,
            },
            arrays: ahash::AHashMap::new(),
            fee_rate: 2_500,
        };

        let result = engine.evaluate(
            Pubkey::new_unique(),
            &pump_state(),
            &snapshot,
            &victim(50_000_000, ExactSide::Output),
            SwapDirection::AtoB,
        );
        assert_eq!(result.unwrap_err(), RejectReason::WeirdFlow);
    }
}
