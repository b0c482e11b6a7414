use anyhow::bail;
use engine::Validatable;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Yellowstone gRPC endpoint (accounts + transactions).
    pub grpc_endpoint: String,
    /// Optional API token for authenticated endpoints.
    pub x_token: Option<String>,
    /// JSON RPC endpoint for bootstrap snapshots and ALT backfill.
    pub rpc_endpoint: String,
    /// Path to the payer keypair (json array format).
    pub payer_keypair_path: String,
    /// ALT hotlist file, loaded at boot and appended on discovery.
    #[serde(default)]
    pub alt_hotlist_path: Option<String>,
    /// Evidence JSONL output path.
    #[serde(default = "defaults::evidence_path")]
    pub evidence_path: String,
    pub relay: RelayConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Relay JSON-RPC endpoints, tried round-robin.
    pub endpoints: Vec<String>,
    /// Lamport transfer targets for the tip instruction; one is picked
    /// at random per bundle.
    pub tip_accounts: Vec<String>,
    #[serde(default = "defaults::tip_floor_lamports")]
    pub tip_floor_lamports: u64,
    #[serde(default = "defaults::max_retries")]
    pub max_retries: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    /// Candidate input ladder in lamports.
    #[serde(default = "defaults::candidate_lamports")]
    pub candidate_lamports: Vec<u64>,
    pub min_profit_lamports: u64,
    #[serde(default = "defaults::slippage_bps")]
    pub slippage_bps: u64,
    pub compute_unit_limit: u64,
    pub compute_unit_price: u64,
    #[serde(default = "defaults::tip_lamports")]
    pub tip_lamports: u64,
    /// Speculative overlay expiry for a pending signature.
    #[serde(default = "defaults::pending_timeout_ms")]
    pub pending_timeout_ms: u64,
    /// Ingress drop threshold on the pending-signature queue.
    #[serde(default = "defaults::pending_high_water")]
    pub pending_high_water: usize,
    /// Tick-array window radius (arrays each side of the current one).
    #[serde(default = "defaults::tick_radius")]
    pub tick_array_radius: i32,
    /// Bin-array window radius around the active bin's array.
    #[serde(default = "defaults::bin_radius")]
    pub bin_array_radius: i64,
}

mod defaults {
    pub fn evidence_path() -> String {
        "evidence.jsonl".to_owned()
    }

    pub fn tip_floor_lamports() -> u64 {
        1_000
    }

    pub fn max_retries() -> usize {
        3
    }

    pub fn candidate_lamports() -> Vec<u64> {
        // [0.01, 0.05, 0.1, 0.25, 0.5, 1.0] SOL
        vec![
            10_000_000,
            50_000_000,
            100_000_000,
            250_000_000,
            500_000_000,
            1_000_000_000,
        ]
    }

    pub fn slippage_bps() -> u64 {
        50
    }

    pub fn tip_lamports() -> u64 {
        10_000
    }

    pub fn pending_timeout_ms() -> u64 {
        5_000
    }

    pub fn pending_high_water() -> usize {
        4_096
    }

    pub fn tick_radius() -> i32 {
        1
    }

    pub fn bin_radius() -> i64 {
        1
    }
}

impl Validatable for Config {
    fn validate(&mut self) -> anyhow::Result<()> {
        if self.rpc_endpoint.is_empty() {
            bail!("RPC endpoint cannot be empty");
        }
        if self.grpc_endpoint.is_empty() {
            bail!("gRPC endpoint cannot be empty");
        }
        if self.payer_keypair_path.is_empty() {
            bail!("Payer keypair path cannot be empty");
        }
        if self.relay.endpoints.is_empty() {
            bail!("At least one relay endpoint is required");
        }
        if self.relay.tip_accounts.is_empty() {
            bail!("At least one relay tip account is required");
        }
        for addr in &self.relay.tip_accounts {
            if addr.parse::<Pubkey>().is_err() {
                bail!("Invalid tip account pubkey: {addr}");
            }
        }
        if self.strategy.candidate_lamports.is_empty() {
            bail!("Candidate ladder cannot be empty");
        }
        if self.strategy.tip_lamports < self.relay.tip_floor_lamports {
            bail!(
                "Configured tip {} is below the relay floor {}",
                self.strategy.tip_lamports,
                self.relay.tip_floor_lamports
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            grpc_endpoint: "https://grpc.example.org".to_owned(),
            x_token: None,
            rpc_endpoint: "https://rpc.example.org".to_owned(),
            payer_keypair_path: "payer.json".to_owned(),
            alt_hotlist_path: None,
            evidence_path: defaults::evidence_path(),
            relay: RelayConfig {
                endpoints: vec!["https://relay.example.org".to_owned()],
                tip_accounts: vec![Pubkey::new_unique().to_string()],
                tip_floor_lamports: defaults::tip_floor_lamports(),
                max_retries: defaults::max_retries(),
            },
            strategy: StrategyConfig {
                candidate_lamports: defaults::candidate_lamports(),
                min_profit_lamports: 100_000,
                slippage_bps: defaults::slippage_bps(),
                compute_unit_limit: 400_000,
                compute_unit_price: 50_000,
                tip_lamports: defaults::tip_lamports(),
                pending_timeout_ms: defaults::pending_timeout_ms(),
                pending_high_water: defaults::pending_high_water(),
                tick_array_radius: 1,
                bin_array_radius: 1,
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_tip_below_floor_fails() {
        let mut cfg = base_config();
        cfg.strategy.tip_lamports = 500;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_tip_account_fails() {
        let mut cfg = base_config();
        cfg.relay.tip_accounts = vec!["not-a-pubkey".to_owned()];
        assert!(cfg.validate().is_err());
    }
}
