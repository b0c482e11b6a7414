use crate::libs::solana_client::dex::{
    meteora_dlmm,
    model::{AccountEntity, IxEntity, Venue},
    pump_swap, raydium_amm, raydium_clmm,
    registry::core::DexRegistry,
};

/// Populates the registry with every supported venue.
///
/// This is the single configuration point mapping low-level on-chain
/// structs to the domain wrappers the pipeline works with.
pub fn fill_registry(reg: &mut DexRegistry) {
    // PumpSwap (constant-product bonding pair)
    reg.add_account::<pump_swap::Pool>(Venue::PumpSwap, AccountEntity::PumpSwapPool);
    reg.add_account::<pump_swap::GlobalConfig>(Venue::PumpSwap, AccountEntity::PumpSwapConfig);
    reg.add_instruction::<pump_swap::BuyArgs>(Venue::PumpSwap, IxEntity::PumpSwapBuy);
    reg.add_instruction::<pump_swap::SellArgs>(Venue::PumpSwap, IxEntity::PumpSwapSell);

    // Raydium V4 (constant-product with serum book attachment)
    reg.add_account::<raydium_amm::AmmInfo>(Venue::RaydiumAmm, AccountEntity::AmmInfo);
    reg.add_instruction::<raydium_amm::SwapBaseIn>(Venue::RaydiumAmm, IxEntity::AmmSwapBaseIn);
    reg.add_instruction::<raydium_amm::SwapBaseOut>(Venue::RaydiumAmm, IxEntity::AmmSwapBaseOut);

    // Raydium CLMM (concentrated liquidity, tick arrays)
    reg.add_account::<raydium_clmm::PoolState>(Venue::RaydiumClmm, AccountEntity::ClmmPool);
    reg.add_account::<raydium_clmm::AmmConfig>(Venue::RaydiumClmm, AccountEntity::ClmmConfig);
    reg.add_account::<raydium_clmm::TickArrayState>(Venue::RaydiumClmm, AccountEntity::TickArray);
    reg.add_instruction::<raydium_clmm::SwapArgs>(Venue::RaydiumClmm, IxEntity::ClmmSwap);
    reg.add_instruction::<raydium_clmm::SwapV2Args>(Venue::RaydiumClmm, IxEntity::ClmmSwapV2);

    // Meteora DLMM (discretized bins)
    reg.add_account::<meteora_dlmm::LbPair>(Venue::MeteoraDlmm, AccountEntity::LbPair);
    reg.add_account::<meteora_dlmm::BinArray>(Venue::MeteoraDlmm, AccountEntity::BinArray);
    reg.add_instruction::<meteora_dlmm::SwapArgs>(Venue::MeteoraDlmm, IxEntity::DlmmSwap);
}
