use ahash::{AHashMap, AHashSet};
use solana_sdk::pubkey::Pubkey;

use crate::libs::solana_client::dex::{
    model::{AccountEntity, IxEntity, Venue},
    parser::DexEntity,
    registry::traits::{DexParser, RegistryLookup},
};

/// A registered parser: venue tag for metrics labels, discriminator for
/// the cheap pre-decode predicate, and the parse closure itself.
pub struct RegistryItem {
    pub name: &'static str,
    pub venue: Venue,
    pub discriminator: &'static [u8],
    pub parser: DexParser,
}

/// Outcome of dispatching one account update, mirroring the fixed
/// skip/fail taxonomy: unknown owner, known owner but non-pool data,
/// or a matching discriminator whose decode still failed.
pub enum AccountDecode {
    Decoded(AccountEntity),
    SkippedNonTarget,
    SkippedNonPool,
    Failed(Venue),
}

pub struct DexRegistry {
    map: AHashMap<RegistryLookup, RegistryItem>,
    programs: AHashSet<Pubkey>,
}

impl DexRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: AHashMap::new(),
            programs: AHashSet::new(),
        }
    }

    /// Registers an account entity keyed by `(program, data length)`.
    pub fn add_account<T>(&mut self, venue: Venue, wrap: fn(Box<T>) -> AccountEntity)
    where
        T: DexEntity + 'static,
    {
        let lookup = RegistryLookup::Account {
            program_id: T::PROGRAM_ID,
            size: T::DATA_SIZE,
        };
        let parse = move |data: &[u8]| T::parse_into(data, wrap);

        self.programs.insert(T::PROGRAM_ID);
        self.map.insert(
            lookup,
            RegistryItem {
                name: std::any::type_name::<T>(),
                venue,
                discriminator: T::DISCRIMINATOR,
                parser: DexParser::Account(Box::new(parse)),
            },
        );
    }

    /// Registers an instruction entity keyed by `(program, discriminator)`.
    pub fn add_instruction<T>(&mut self, venue: Venue, wrap: fn(Box<T>) -> IxEntity)
    where
        T: DexEntity + 'static,
    {
        let lookup = RegistryLookup::Instruction {
            program_id: T::PROGRAM_ID,
            discriminator: T::DISCRIMINATOR,
        };
        let parse = move |data: &[u8]| T::parse_into(data, wrap);

        self.programs.insert(T::PROGRAM_ID);
        self.map.insert(
            lookup,
            RegistryItem {
                name: std::any::type_name::<T>(),
                venue,
                discriminator: T::DISCRIMINATOR,
                parser: DexParser::Instruction(Box::new(parse)),
            },
        );
    }

    #[must_use]
    pub fn is_known_program(&self, program_id: &Pubkey) -> bool {
        self.programs.contains(program_id)
    }

    #[must_use]
    pub fn program_ids(&self) -> Vec<Pubkey> {
        self.programs.iter().copied().collect()
    }

    #[must_use]
    pub fn get_account_item(&self, program_id: &Pubkey, size: usize) -> Option<&RegistryItem> {
        self.map.get(&RegistryLookup::Account {
            program_id: *program_id,
            size,
        })
    }

    /// Finds the best matching instruction parser for a payload.
    ///
    /// Longest discriminator wins so a 1-byte legacy tag can coexist
    /// with 8-byte Anchor hashes under the same program.
    #[must_use]
    pub fn get_instruction_item(
        &self,
        program_id: &Pubkey,
        payload: &[u8],
    ) -> Option<&RegistryItem> {
        self.map
            .iter()
            .filter_map(|(lookup, item)| match lookup {
                RegistryLookup::Instruction {
                    program_id: pid,
                    discriminator,
                } if pid == program_id && payload.starts_with(discriminator) => {
                    Some((discriminator.len(), item))
                }
                _ => None,
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, item)| item)
    }

    /// Dispatches one account update through the skip/fail taxonomy.
    #[must_use]
    pub fn decode_account(&self, owner: &Pubkey, data: &[u8]) -> AccountDecode {
        let Some(item) = self.get_account_item(owner, data.len()) else {
            return if self.is_known_program(owner) {
                AccountDecode::SkippedNonPool
            } else {
                AccountDecode::SkippedNonTarget
            };
        };

        if !data.starts_with(item.discriminator) {
            return AccountDecode::SkippedNonPool;
        }

        match &item.parser {
            DexParser::Account(parse) => match parse(data) {
                Some(entity) => AccountDecode::Decoded(entity),
                None => AccountDecode::Failed(item.venue),
            },
            DexParser::Instruction(_) => AccountDecode::SkippedNonPool,
        }
    }

    /// Dispatches one instruction payload; `None` means no parser
    /// claimed it (not an error, most instructions are not swaps).
    #[must_use]
    pub fn decode_instruction(&self, program_id: &Pubkey, payload: &[u8]) -> Option<IxEntity> {
        let item = self.get_instruction_item(program_id, payload)?;
        match &item.parser {
            DexParser::Instruction(parse) => parse(payload),
            DexParser::Account(_) => None,
        }
    }
}

impl Default for DexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;
    use crate::libs::solana_client::dex::{
        DexEntity, pump_swap, raydium_amm, registry::DEX_REGISTRY,
    };

    #[test]
    fn test_unknown_owner_is_non_target() {
        let data = vec![0u8; pump_swap::Pool::DATA_SIZE];
        let outcome = DEX_REGISTRY.decode_account(&Pubkey::new_unique(), &data);
        assert!(matches!(outcome, AccountDecode::SkippedNonTarget));
    }

    #[test]
    fn test_known_owner_wrong_size_is_non_pool() {
        let data = vec![0u8; 99];
        let outcome = DEX_REGISTRY.decode_account(&pump_swap::PUMP_SWAP_ID, &data);
        assert!(matches!(outcome, AccountDecode::SkippedNonPool));
    }

    #[test]
    fn test_known_owner_wrong_discriminator_is_non_pool() {
        // Right length, wrong first 8 bytes.
        let mut data = vec![0xAAu8; pump_swap::Pool::DATA_SIZE];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let outcome = DEX_REGISTRY.decode_account(&pump_swap::PUMP_SWAP_ID, &data);
        assert!(matches!(outcome, AccountDecode::SkippedNonPool));
    }

    #[test]
    fn test_matching_account_decodes() {
        let pool = pump_swap::Pool::zeroed();
        let mut data = pump_swap::Pool::DISCRIMINATOR.to_vec();
        data.extend_from_slice(bytemuck::bytes_of(&pool));

        let outcome = DEX_REGISTRY.decode_account(&pump_swap::PUMP_SWAP_ID, &data);
        assert!(matches!(
            outcome,
            AccountDecode::Decoded(AccountEntity::PumpSwapPool(_))
        ));
    }

    #[test]
    fn test_instruction_dispatch_single_byte_tag() {
        let mut payload = vec![9u8];
        payload.extend_from_slice(&[0u8; 16]);

        let entity = DEX_REGISTRY
            .decode_instruction(&raydium_amm::RAYDIUM_AMM_ID, &payload)
            .unwrap();
        assert!(matches!(entity, IxEntity::AmmSwapBaseIn(_)));

        // Tag 10 is not a swap.
        let mut payload = vec![10u8];
        payload.extend_from_slice(&[0u8; 16]);
        assert!(
            DEX_REGISTRY
                .decode_instruction(&raydium_amm::RAYDIUM_AMM_ID, &payload)
                .is_none()
        );
    }

    #[test]
    fn test_instruction_dispatch_anchor_discriminator() {
        let mut payload = pump_swap::BuyArgs::DISCRIMINATOR.to_vec();
        payload.extend_from_slice(&[0u8; 17]);

        let entity = DEX_REGISTRY
            .decode_instruction(&pump_swap::PUMP_SWAP_ID, &payload)
            .unwrap();
        assert!(matches!(entity, IxEntity::PumpSwapBuy(_)));
    }
}
