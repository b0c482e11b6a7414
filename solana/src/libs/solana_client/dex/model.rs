use std::fmt::{Display, Formatter};

use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::libs::solana_client::{
    dex::{meteora_dlmm, pump_swap, raydium_amm, raydium_clmm},
    message::DecodedMessage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    PumpSwap,
    RaydiumAmm,
    RaydiumClmm,
    MeteoraDlmm,
}

impl Venue {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PumpSwap => "pump_swap",
            Self::RaydiumAmm => "raydium_amm",
            Self::RaydiumClmm => "raydium_clmm",
            Self::MeteoraDlmm => "meteora_dlmm",
        }
    }

    #[must_use]
    pub fn program_id(self) -> Pubkey {
        match self {
            Self::PumpSwap => pump_swap::PUMP_SWAP_ID,
            Self::RaydiumAmm => raydium_amm::RAYDIUM_AMM_ID,
            Self::RaydiumClmm => raydium_clmm::RAYDIUM_CLMM_ID,
            Self::MeteoraDlmm => meteora_dlmm::METEORA_DLMM_ID,
        }
    }
}

impl Display for Venue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an update came from. Convergence gating (§ topology) treats
/// these differently: gRPC is always current, bootstrap only at or
/// after the subscription start slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    Bootstrap,
    Grpc,
    Pending,
}

impl UpdateSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Grpc => "grpc",
            Self::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    BlockMeta(BlockMetaEvent),
    Slot(SlotEvent),
    Account(Box<AccountUpdate>),
    Tx(Box<TxUpdate>),
}

#[derive(Debug, Clone)]
pub struct BlockMetaEvent {
    pub slot: u64,
    pub blockhash: String,
    pub block_time: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SlotEvent {
    pub slot: u64,
    pub parent: Option<u64>,
    pub status: i32,
}

/// A raw account write. `(slot, write_version)` totally orders writes
/// to one key; the caches enforce that ordering on commit.
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub pubkey: Pubkey,
    pub owner: Pubkey,
    pub slot: u64,
    pub write_version: u64,
    pub data: Vec<u8>,
    pub source: UpdateSource,
    /// Signature of the transaction that produced the write, when the
    /// stream provides it; used to retire speculative overlays.
    pub txn_signature: Option<Signature>,
}

/// A transaction observed on the stream. The pending source delivers
/// raw message bytes; the gRPC source delivers an already-parsed
/// message with loaded ALT addresses from meta.
#[derive(Debug, Clone)]
pub struct TxUpdate {
    pub signature: Signature,
    pub slot: u64,
    pub source: UpdateSource,
    pub message: MessagePayload,
    pub meta: Option<TxMeta>,
}

#[derive(Debug, Clone)]
pub enum MessagePayload {
    Raw(Vec<u8>),
    Parsed(DecodedMessage),
}

#[derive(Debug, Clone, Default)]
pub struct TxMeta {
    pub loaded_writable: Vec<Pubkey>,
    pub loaded_readonly: Vec<Pubkey>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: Pubkey,
    pub amount: u64,
}

/// A decoded account update after registry dispatch.
#[derive(Debug, Clone)]
pub enum AccountEntity {
    PumpSwapPool(Box<pump_swap::Pool>),
    PumpSwapConfig(Box<pump_swap::GlobalConfig>),
    AmmInfo(Box<raydium_amm::AmmInfo>),
    ClmmPool(Box<raydium_clmm::PoolState>),
    ClmmConfig(Box<raydium_clmm::AmmConfig>),
    TickArray(Box<raydium_clmm::TickArrayState>),
    LbPair(Box<meteora_dlmm::LbPair>),
    BinArray(Box<meteora_dlmm::BinArray>),
}

/// A decoded swap instruction payload after registry dispatch.
#[derive(Debug, Clone)]
pub enum IxEntity {
    PumpSwapBuy(Box<pump_swap::BuyArgs>),
    PumpSwapSell(Box<pump_swap::SellArgs>),
    AmmSwapBaseIn(Box<raydium_amm::SwapBaseIn>),
    AmmSwapBaseOut(Box<raydium_amm::SwapBaseOut>),
    ClmmSwap(Box<raydium_clmm::SwapArgs>),
    ClmmSwapV2(Box<raydium_clmm::SwapV2Args>),
    DlmmSwap(Box<meteora_dlmm::SwapArgs>),
}

/// A venue swap extracted from a transaction, with its instruction
/// accounts mapped through the resolved key list. `direction` is only
/// present when the instruction itself pins it; otherwise the
/// opportunity engine resolves it against cached pool state.
#[derive(Debug, Clone)]
pub struct PendingSwap {
    pub venue: Venue,
    pub pool: Pubkey,
    pub authority: Pubkey,
    pub user_source: Pubkey,
    pub user_destination: Pubkey,
    /// Pool-side vaults when the instruction layout exposes them in
    /// swap direction order (CLMM input/output vaults).
    pub venue_vault_in: Option<Pubkey>,
    pub venue_vault_out: Option<Pubkey>,
    pub amount: u64,
    pub other_amount_threshold: u64,
    pub exact_side: ExactSide,
    pub direction: Option<SwapDirection>,
}

/// A = base / token0 / tokenX side of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapDirection {
    AtoB,
    BtoA,
}

impl SwapDirection {
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::AtoB => Self::BtoA,
            Self::BtoA => Self::AtoB,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExactSide {
    Input,
    Output,
}
