use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{Venue, meteora_dlmm, pump_swap, raydium_amm, raydium_clmm};

/// The one pool representation the rest of the pipeline works with: a
/// closed tagged variant over the four venue payloads. Simulation and
/// topology dispatch on the tag; no virtual dispatch on the hot path.
#[derive(Debug, Clone)]
pub enum PoolState {
    PumpSwap(Box<pump_swap::Pool>),
    RaydiumAmm(Box<raydium_amm::AmmInfo>),
    RaydiumClmm(Box<raydium_clmm::PoolState>),
    MeteoraDlmm(Box<meteora_dlmm::LbPair>),
}

impl PoolState {
    #[must_use]
    pub fn venue(&self) -> Venue {
        match self {
            Self::PumpSwap(_) => Venue::PumpSwap,
            Self::RaydiumAmm(_) => Venue::RaydiumAmm,
            Self::RaydiumClmm(_) => Venue::RaydiumClmm,
            Self::MeteoraDlmm(_) => Venue::MeteoraDlmm,
        }
    }

    /// A-side vault: base / coin / token0 / tokenX.
    #[must_use]
    pub fn vault_a(&self) -> Pubkey {
        match self {
            Self::PumpSwap(p) => p.base_vault(),
            Self::RaydiumAmm(p) => p.coin_vault(),
            Self::RaydiumClmm(p) => p.token_vault_0(),
            Self::MeteoraDlmm(p) => p.reserve_x(),
        }
    }

    #[must_use]
    pub fn vault_b(&self) -> Pubkey {
        match self {
            Self::PumpSwap(p) => p.quote_vault(),
            Self::RaydiumAmm(p) => p.pc_vault(),
            Self::RaydiumClmm(p) => p.token_vault_1(),
            Self::MeteoraDlmm(p) => p.reserve_y(),
        }
    }

    #[must_use]
    pub fn mint_a(&self) -> Pubkey {
        match self {
            Self::PumpSwap(p) => p.base_mint(),
            Self::RaydiumAmm(p) => p.coin_mint(),
            Self::RaydiumClmm(p) => p.token_mint_0(),
            Self::MeteoraDlmm(p) => p.token_x_mint(),
        }
    }

    #[must_use]
    pub fn mint_b(&self) -> Pubkey {
        match self {
            Self::PumpSwap(p) => p.quote_mint(),
            Self::RaydiumAmm(p) => p.pc_mint(),
            Self::RaydiumClmm(p) => p.token_mint_1(),
            Self::MeteoraDlmm(p) => p.token_y_mint(),
        }
    }

    /// Fee/parameter config account the simulator additionally reads,
    /// when the venue keeps one outside the pool.
    #[must_use]
    pub fn amm_config(&self) -> Option<Pubkey> {
        match self {
            Self::PumpSwap(_) => Some(pump_swap::global_config_address()),
            Self::RaydiumAmm(_) => None,
            Self::RaydiumClmm(p) => Some(p.amm_config()),
            Self::MeteoraDlmm(_) => None,
        }
    }

    /// Open-orders attachment (CP-book venue only).
    #[must_use]
    pub fn open_orders(&self) -> Option<Pubkey> {
        match self {
            Self::RaydiumAmm(p) => Some(p.open_orders()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::PumpSwap(_) => true,
            Self::RaydiumAmm(p) => p.is_enabled(),
            Self::RaydiumClmm(p) => p.is_swap_enabled(),
            Self::MeteoraDlmm(p) => p.is_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;

    #[test]
    fn test_dispatch_on_tag() {
        let mut amm = raydium_amm::AmmInfo::zeroed();
        amm.status = 6;
        let coin_vault = Pubkey::new_unique();
        amm.coin_vault = coin_vault.to_bytes();

        let pool = PoolState::RaydiumAmm(Box::new(amm));
        assert_eq!(pool.venue(), Venue::RaydiumAmm);
        assert_eq!(pool.vault_a(), coin_vault);
        assert!(pool.amm_config().is_none());
        assert!(pool.open_orders().is_some());
        assert!(pool.is_enabled());
    }

    #[test]
    fn test_clmm_exposes_config() {
        let mut clmm = raydium_clmm::PoolState::zeroed();
        let config = Pubkey::new_unique();
        clmm.amm_config = config.to_bytes();

        let pool = PoolState::RaydiumClmm(Box::new(clmm));
        assert_eq!(pool.amm_config(), Some(config));
    }
}
