pub mod meteora_dlmm;
pub mod model;
pub mod parser;
pub mod pump_swap;
pub mod raydium_amm;
pub mod raydium_clmm;
pub mod registry;

pub use model::{
    AccountEntity, AccountUpdate, BlockMetaEvent, Event, ExactSide, IxEntity, MessagePayload,
    PendingSwap, SlotEvent, SwapDirection, TokenBalance, TxMeta, TxUpdate, UpdateSource, Venue,
};
pub use parser::DexEntity;
pub use registry::DEX_REGISTRY;
