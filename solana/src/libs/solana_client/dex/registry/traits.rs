use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::model::{AccountEntity, IxEntity};

/// Criteria used to locate a parser in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryLookup {
    /// Account data, dispatched on the owning program and exact data
    /// length.
    Account { program_id: Pubkey, size: usize },
    /// Instruction payload, dispatched on the program and a byte
    /// discriminator prefix (8-byte Anchor hashes, 1-byte legacy tags).
    Instruction {
        program_id: Pubkey,
        discriminator: &'static [u8],
    },
}

impl RegistryLookup {
    #[must_use]
    pub fn program_id(&self) -> Pubkey {
        match self {
            Self::Account { program_id, .. } => *program_id,
            Self::Instruction { program_id, .. } => *program_id,
        }
    }
}

/// A parsing function over raw bytes.
pub type ParserFn<T> = Box<dyn Fn(&[u8]) -> Option<T> + Send + Sync + 'static>;

/// Container for the two parser families a venue registers.
pub enum DexParser {
    Account(ParserFn<AccountEntity>),
    Instruction(ParserFn<IxEntity>),
}
