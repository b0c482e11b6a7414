use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::libs::solana_client::dex::{ExactSide, SwapDirection};

/// Simulation failure taxonomy. Every variant maps onto a rejection
/// reason at the opportunity layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    #[error("math overflow")]
    MathOverflow,
    #[error("no tick array at start index {0}")]
    NoTickArray(i32),
    #[error("missing bin array at index {0}")]
    MissingBinArray(i64),
    #[error("invalid input")]
    InvalidInput,
}

/// Output of a single simulated swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimOutput {
    pub amount_out: u64,
    pub fee_paid: u64,
    /// Execution shortfall versus the pre-swap spot price.
    pub price_impact_bps: u64,
}

/// One hop of a route, fully resolved to mints and a direction.
#[derive(Debug, Clone)]
pub struct SwapLeg {
    pub program_id: Pubkey,
    pub pool: Pubkey,
    pub direction: SwapDirection,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub input_amount: u64,
    pub min_output_amount: u64,
    pub exact_side: ExactSide,
}
