//! Bundle assembly: compute budget, the two swap legs, the relay tip,
//! one signed transaction; plus the validation gate every bundle
//! passes before submission.

use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::{Transaction, VersionedTransaction},
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    bundle::instructions::{SwapIxParams, build_swap_instruction},
    libs::solana_client::{dex::Venue, utils::SYSTEM_PROGRAM_ID},
    opportunity::BackrunPlan,
    state::{pool::PoolState, topology::FrozenTopology},
};

const COMPUTE_BUDGET_PROGRAM_ID: Pubkey = pubkey!("ComputeBudget111111111111111111111111111111");

/// Relay acceptance limit.
pub const MAX_BUNDLE_TXS: usize = 5;

/// Bundles older than this are stale regardless of content.
pub const MAX_BUNDLE_AGE_MS: u64 = 60_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    #[error("Bundle is empty")]
    Empty,
    #[error("Bundle too large")]
    TooLarge,
    #[error("Tip too low")]
    TipTooLow,
    #[error("Bundle too old")]
    TooOld,
    #[error("Unsigned transaction in bundle")]
    Unsigned,
    #[error("Venue {0} has no instruction builder")]
    UnsupportedVenue(Venue),
    #[error("Serialization failed")]
    Serialization,
}

/// An assembled bundle ready for relay submission.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub id: Uuid,
    pub transactions: Vec<VersionedTransaction>,
    pub tip_lamports: u64,
    pub tip_account: Pubkey,
    pub blockhash: Hash,
    pub created_at_ms: u64,
}

impl Bundle {
    /// Wire-serializes every transaction for the relay.
    pub fn serialize_transactions(&self) -> Result<Vec<Vec<u8>>, BundleError> {
        self.transactions
            .iter()
            .map(|tx| bincode::serialize(tx).map_err(|_| BundleError::Serialization))
            .collect()
    }
}

/// The validation gate: age, size, tip floor, signatures.
pub fn validate_bundle(bundle: &Bundle, tip_floor: u64, now_ms: u64) -> Result<(), BundleError> {
    if bundle.transactions.is_empty() {
        return Err(BundleError::Empty);
    }
    if bundle.transactions.len() > MAX_BUNDLE_TXS {
        return Err(BundleError::TooLarge);
    }
    if bundle.tip_lamports < tip_floor {
        return Err(BundleError::TipTooLow);
    }
    if now_ms.saturating_sub(bundle.created_at_ms) > MAX_BUNDLE_AGE_MS {
        return Err(BundleError::TooOld);
    }
    for tx in &bundle.transactions {
        if tx.signatures.is_empty()
            || tx
                .signatures
                .iter()
                .all(|sig| *sig == solana_sdk::signature::Signature::default())
        {
            return Err(BundleError::Unsigned);
        }
    }
    Ok(())
}

pub struct BundleBuilder {
    payer: Keypair,
    tip_accounts: Vec<Pubkey>,
    compute_unit_limit: u64,
    compute_unit_price: u64,
}

impl BundleBuilder {
    #[must_use]
    pub fn new(
        payer: Keypair,
        tip_accounts: Vec<Pubkey>,
        compute_unit_limit: u64,
        compute_unit_price: u64,
    ) -> Self {
        Self {
            payer,
            tip_accounts,
            compute_unit_limit,
            compute_unit_price,
        }
    }

    #[must_use]
    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    /// Builds the backrun bundle: `[victim_raw?, our_tx]`, where our
    /// transaction carries budget + enter + exit + tip.
    pub fn build_backrun(
        &self,
        plan: &BackrunPlan,
        state: &PoolState,
        topology: &FrozenTopology,
        victim_raw: Option<VersionedTransaction>,
        blockhash: Hash,
        tip_lamports: u64,
        now_ms: u64,
    ) -> Result<Bundle, BundleError> {
        let enter = build_swap_instruction(&SwapIxParams {
            payer: self.payer.pubkey(),
            pool: plan.pool,
            state,
            direction: plan.victim_direction.reverse(),
            amount_in: plan.input_amount,
            min_amount_out: plan.min_intermediate,
            tick_array_indexes: &topology.tick_array_indexes,
            bin_array_indexes: &topology.bin_array_indexes,
        })?;

        let exit = build_swap_instruction(&SwapIxParams {
            payer: self.payer.pubkey(),
            pool: plan.pool,
            state,
            direction: plan.victim_direction,
            amount_in: plan.expected_intermediate,
            min_amount_out: plan.min_final,
            tick_array_indexes: &topology.tick_array_indexes,
            bin_array_indexes: &topology.bin_array_indexes,
        })?;

        let tip_account = self.pick_tip_account(now_ms);
        let instructions = vec![
            set_compute_unit_limit(self.compute_unit_limit as u32),
            set_compute_unit_price(self.compute_unit_price),
            enter,
            exit,
            transfer_lamports(&self.payer.pubkey(), &tip_account, tip_lamports),
        ];

        let tx = Transaction::new_signed_with_payer(
            &instructions,
            Some(&self.payer.pubkey()),
            &[&self.payer],
            blockhash,
        );

        let mut transactions = Vec::with_capacity(2);
        if let Some(victim) = victim_raw {
            transactions.push(victim);
        }
        transactions.push(VersionedTransaction::from(tx));

        Ok(Bundle {
            id: Uuid::new_v4(),
            transactions,
            tip_lamports,
            tip_account,
            blockhash,
            created_at_ms: now_ms,
        })
    }

    fn pick_tip_account(&self, now_ms: u64) -> Pubkey {
        let index = (now_ms as usize) % self.tip_accounts.len();
        self.tip_accounts[index]
    }
}

fn set_compute_unit_limit(units: u32) -> Instruction {
    let mut data = vec![2u8];
    data.extend_from_slice(&units.to_le_bytes());
    Instruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: vec![],
        data,
    }
}

fn set_compute_unit_price(micro_lamports: u64) -> Instruction {
    let mut data = vec![3u8];
    data.extend_from_slice(&micro_lamports.to_le_bytes());
    Instruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: vec![],
        data,
    }
}

/// System transfer, hand-encoded: variant 2 (`Transfer`) + lamports.
fn transfer_lamports(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    let mut data = 2u32.to_le_bytes().to_vec();
    data.extend_from_slice(&lamports.to_le_bytes());
    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*from, true),
            AccountMeta::new(*to, false),
        ],
        data,
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;
    use crate::libs::solana_client::dex::{SwapDirection, pump_swap};

    fn sample_plan(pool: Pubkey) -> BackrunPlan {
        BackrunPlan {
            pool,
            venue: Venue::PumpSwap,
            victim_direction: SwapDirection::AtoB,
            input_amount: 100_000_000,
            expected_intermediate: 201_000_000,
            expected_final: 101_000_000,
            min_intermediate: 200_000_000,
            min_final: 100_500_000,
            gross_profit: 1_000_000,
            net_profit: 960_000,
            gas_cost: 20_000,
            tip: 20_000,
        }
    }

    fn sample_state() -> PoolState {
        let mut pool = pump_swap::Pool::zeroed();
        pool.base_mint = Pubkey::new_unique().to_bytes();
        pool.quote_mint = Pubkey::new_unique().to_bytes();
        pool.pool_base_token_account = Pubkey::new_unique().to_bytes();
        pool.pool_quote_token_account = Pubkey::new_unique().to_bytes();
        PoolState::PumpSwap(Box::new(pool))
    }

    fn sample_topology(pool: Pubkey, state: &PoolState) -> FrozenTopology {
        FrozenTopology {
            pool,
            venue: Venue::PumpSwap,
            base_vault: state.vault_a(),
            quote_vault: state.vault_b(),
            tick_array_indexes: vec![],
            bin_array_indexes: vec![],
            amm_config: None,
            frozen_at_slot: 1,
            frozen_at_ms: 1,
        }
    }

    fn builder() -> BundleBuilder {
        BundleBuilder::new(
            Keypair::new(),
            vec![Pubkey::new_unique(), Pubkey::new_unique()],
            400_000,
            50_000,
        )
    }

    fn build_sample(tip: u64) -> Bundle {
        let pool = Pubkey::new_unique();
        let state = sample_state();
        let topology = sample_topology(pool, &state);
        builder()
            .build_backrun(
                &sample_plan(pool),
                &state,
                &topology,
                None,
                Hash::new_unique(),
                tip,
                1_000_000,
            )
            .unwrap()
    }

    #[test]
    fn test_build_backrun_is_signed_and_tipped() {
        let bundle = build_sample(1_500);

        assert_eq!(bundle.transactions.len(), 1);
        assert_eq!(bundle.tip_lamports, 1_500);
        validate_bundle(&bundle, 1_000, 1_000_000).unwrap();

        // Budget, enter, exit, tip.
        let tx = &bundle.transactions[0];
        assert_eq!(tx.message.instructions().len(), 5);

        let serialized = bundle.serialize_transactions().unwrap();
        assert_eq!(serialized.len(), 1);
        assert!(!serialized[0].is_empty());
    }

    #[test]
    fn test_tip_floor_enforced() {
        let bundle = build_sample(500);
        assert_eq!(
            validate_bundle(&bundle, 1_000, 1_000_000).unwrap_err(),
            BundleError::TipTooLow
        );

        let bundle = build_sample(1_500);
        assert!(validate_bundle(&bundle, 1_000, 1_000_000).is_ok());
    }

    #[test]
    fn test_size_cap_enforced() {
        let mut bundle = build_sample(1_500);
        let tx = bundle.transactions[0].clone();
        for _ in 0..5 {
            bundle.transactions.push(tx.clone());
        }
        assert_eq!(
            validate_bundle(&bundle, 1_000, 1_000_000).unwrap_err(),
            BundleError::TooLarge
        );
    }

    #[test]
    fn test_empty_and_stale_rejected() {
        let mut bundle = build_sample(1_500);
        bundle.transactions.clear();
        assert_eq!(
            validate_bundle(&bundle, 1_000, 1_000_000).unwrap_err(),
            BundleError::Empty
        );

        let bundle = build_sample(1_500);
        let too_late = bundle.created_at_ms + MAX_BUNDLE_AGE_MS + 1;
        assert_eq!(
            validate_bundle(&bundle, 1_000, too_late).unwrap_err(),
            BundleError::TooOld
        );
    }

    #[test]
    fn test_unsigned_rejected() {
        let mut bundle = build_sample(1_500);
        for sig in &mut bundle.transactions[0].signatures {
            *sig = solana_sdk::signature::Signature::default();
        }
        assert_eq!(
            validate_bundle(&bundle, 1_000, 1_000_000).unwrap_err(),
            BundleError::Unsigned
        );
    }
}
