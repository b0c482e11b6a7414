//! Transaction message decoder: legacy and v0 wire formats, compact-u16
//! lengths, and synchronous ALT resolution against the local cache.

use solana_sdk::{hash::Hash, pubkey::Pubkey};
use thiserror::Error;

use crate::libs::solana_client::{
    alt::AltCache,
    codec::{CodecError, Cursor},
};

/// High bit of the first message byte marks a versioned message.
const VERSION_PREFIX_MASK: u8 = 0x80;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("unsupported message version {0}")]
    UnsupportedVersion(u8),
    #[error("lookup index {index} out of bounds for table {table} (len {len})")]
    LookupIndexOutOfBounds {
        table: Pubkey,
        index: u8,
        len: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVersion {
    Legacy,
    V0,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledIx {
    pub program_id_index: u8,
    pub account_indexes: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltLookup {
    pub table: Pubkey,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

/// A parsed message. When every referenced lookup table was cached,
/// `resolved` is true and `account_keys` holds the full key list in
/// the binding order `static ++ loaded_writable ++ loaded_readonly`.
/// Otherwise `alt_misses` lists the absent tables and `account_keys`
/// falls back to the static keys only.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    pub version: MessageVersion,
    pub header: MessageHeader,
    pub static_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledIx>,
    pub lookups: Vec<AltLookup>,
    pub account_keys: Vec<Pubkey>,
    pub alt_misses: Vec<Pubkey>,
    pub resolved: bool,
}

impl DecodedMessage {
    #[must_use]
    pub fn key(&self, index: u8) -> Option<&Pubkey> {
        self.account_keys.get(index as usize)
    }

    #[must_use]
    pub fn program_id(&self, ix: &CompiledIx) -> Option<&Pubkey> {
        self.key(ix.program_id_index)
    }
}

/// Decodes raw message bytes. Never blocks: missing lookup tables are
/// reported, not awaited.
pub fn decode_message(bytes: &[u8], alts: &AltCache) -> Result<DecodedMessage, MessageError> {
    let mut cur = Cursor::new(bytes);

    let first = cur.peek_u8()?;
    let version = if first & VERSION_PREFIX_MASK != 0 {
        cur.read_u8()?;
        let v = first & !VERSION_PREFIX_MASK;
        if v != 0 {
            return Err(MessageError::UnsupportedVersion(v));
        }
        MessageVersion::V0
    } else {
        MessageVersion::Legacy
    };

    let header = MessageHeader {
        num_required_signatures: cur.read_u8()?,
        num_readonly_signed: cur.read_u8()?,
        num_readonly_unsigned: cur.read_u8()?,
    };

    let key_count = cur.read_compact_u16()? as usize;
    let mut static_keys = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        static_keys.push(cur.read_pubkey()?);
    }

    let blockhash_bytes: [u8; 32] = cur.read_bytes(32)?.try_into().unwrap();
    let recent_blockhash = Hash::new_from_array(blockhash_bytes);

    let ix_count = cur.read_compact_u16()? as usize;
    let mut instructions = Vec::with_capacity(ix_count);
    for _ in 0..ix_count {
        let program_id_index = cur.read_u8()?;
        let account_indexes = cur.read_compact_bytes()?.to_vec();
        let data = cur.read_compact_bytes()?.to_vec();
        instructions.push(CompiledIx {
            program_id_index,
            account_indexes,
            data,
        });
    }

    let mut lookups = Vec::new();
    if version == MessageVersion::V0 {
        let lookup_count = cur.read_compact_u16()? as usize;
        for _ in 0..lookup_count {
            let table = cur.read_pubkey()?;
            let writable_indexes = cur.read_compact_bytes()?.to_vec();
            let readonly_indexes = cur.read_compact_bytes()?.to_vec();
            lookups.push(AltLookup {
                table,
                writable_indexes,
                readonly_indexes,
            });
        }
    }

    let (account_keys, alt_misses, resolved) = resolve_keys(&static_keys, &lookups, alts)?;

    Ok(DecodedMessage {
        version,
        header,
        static_keys,
        recent_blockhash,
        instructions,
        lookups,
        account_keys,
        alt_misses,
        resolved,
    })
}

fn resolve_keys(
    static_keys: &[Pubkey],
    lookups: &[AltLookup],
    alts: &AltCache,
) -> Result<(Vec<Pubkey>, Vec<Pubkey>, bool), MessageError> {
    let mut misses = Vec::new();
    let mut loaded_writable = Vec::new();
    let mut loaded_readonly = Vec::new();

    for lookup in lookups {
        let Some(addresses) = alts.get(&lookup.table) else {
            misses.push(lookup.table);
            continue;
        };

        let resolve = |index: u8| -> Result<Pubkey, MessageError> {
            addresses.get(index as usize).copied().ok_or(
                MessageError::LookupIndexOutOfBounds {
                    table: lookup.table,
                    index,
                    len: addresses.len(),
                },
            )
        };

        for &index in &lookup.writable_indexes {
            loaded_writable.push(resolve(index)?);
        }
        for &index in &lookup.readonly_indexes {
            loaded_readonly.push(resolve(index)?);
        }
    }

    if !misses.is_empty() {
        return Ok((static_keys.to_vec(), misses, false));
    }

    let mut account_keys = static_keys.to_vec();
    account_keys.append(&mut loaded_writable);
    account_keys.append(&mut loaded_readonly);
    Ok((account_keys, misses, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_compact_u16(out: &mut Vec<u8>, mut value: u16) {
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if value == 0 {
                break;
            }
        }
    }

    fn encode_legacy(keys: &[Pubkey], blockhash: &Hash, ixs: &[CompiledIx]) -> Vec<u8> {
        let mut out = vec![1u8, 0, 1];
        push_compact_u16(&mut out, keys.len() as u16);
        for key in keys {
            out.extend_from_slice(key.as_ref());
        }
        out.extend_from_slice(blockhash.as_ref());
        push_compact_u16(&mut out, ixs.len() as u16);
        for ix in ixs {
            out.push(ix.program_id_index);
            push_compact_u16(&mut out, ix.account_indexes.len() as u16);
            out.extend_from_slice(&ix.account_indexes);
            push_compact_u16(&mut out, ix.data.len() as u16);
            out.extend_from_slice(&ix.data);
        }
        out
    }

    fn encode_v0(
        keys: &[Pubkey],
        blockhash: &Hash,
        ixs: &[CompiledIx],
        lookups: &[AltLookup],
    ) -> Vec<u8> {
        let mut out = vec![0x80];
        let mut rest = encode_legacy(keys, blockhash, ixs);
        out.append(&mut rest);
        push_compact_u16(&mut out, lookups.len() as u16);
        for lookup in lookups {
            out.extend_from_slice(lookup.table.as_ref());
            push_compact_u16(&mut out, lookup.writable_indexes.len() as u16);
            out.extend_from_slice(&lookup.writable_indexes);
            push_compact_u16(&mut out, lookup.readonly_indexes.len() as u16);
            out.extend_from_slice(&lookup.readonly_indexes);
        }
        out
    }

    fn sample_ix() -> CompiledIx {
        CompiledIx {
            program_id_index: 1,
            account_indexes: vec![0, 2],
            data: vec![9, 1, 2, 3],
        }
    }

    #[test]
    fn test_decode_legacy() {
        let (alts, _rx) = AltCache::new();
        let keys = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let blockhash = Hash::new_unique();
        let bytes = encode_legacy(&keys, &blockhash, &[sample_ix()]);

        let msg = decode_message(&bytes, &alts).unwrap();
        assert_eq!(msg.version, MessageVersion::Legacy);
        assert_eq!(msg.header.num_required_signatures, 1);
        assert_eq!(msg.static_keys, keys);
        assert_eq!(msg.account_keys, keys);
        assert_eq!(msg.recent_blockhash, blockhash);
        assert_eq!(msg.instructions, vec![sample_ix()]);
        assert!(msg.resolved);
        assert!(msg.alt_misses.is_empty());
    }

    #[test]
    fn test_decode_v0_resolves_in_binding_order() {
        let (alts, _rx) = AltCache::new();
        let table = Pubkey::new_unique();
        let loaded: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
        alts.insert(table, loaded.clone());

        let keys = vec![Pubkey::new_unique()];
        let blockhash = Hash::new_unique();
        let lookup = AltLookup {
            table,
            writable_indexes: vec![2, 0],
            readonly_indexes: vec![3],
        };
        let bytes = encode_v0(&keys, &blockhash, &[sample_ix()], &[lookup]);

        let msg = decode_message(&bytes, &alts).unwrap();
        assert!(msg.resolved);
        // static ++ loaded_writable ++ loaded_readonly, table order kept.
        assert_eq!(
            msg.account_keys,
            vec![keys[0], loaded[2], loaded[0], loaded[3]]
        );
    }

    #[test]
    fn test_decode_v0_reports_misses_without_blocking() {
        let (alts, _rx) = AltCache::new();
        let table = Pubkey::new_unique();

        let keys = vec![Pubkey::new_unique()];
        let blockhash = Hash::new_unique();
        let lookup = AltLookup {
            table,
            writable_indexes: vec![0],
            readonly_indexes: vec![],
        };
        let bytes = encode_v0(&keys, &blockhash, &[sample_ix()], &[lookup]);

        let msg = decode_message(&bytes, &alts).unwrap();
        assert!(!msg.resolved);
        assert_eq!(msg.alt_misses, vec![table]);
        assert_eq!(msg.account_keys, keys);
    }

    #[test]
    fn test_decode_v0_lookup_index_out_of_bounds() {
        let (alts, _rx) = AltCache::new();
        let table = Pubkey::new_unique();
        alts.insert(table, vec![Pubkey::new_unique()]);

        let keys = vec![Pubkey::new_unique()];
        let blockhash = Hash::new_unique();
        let lookup = AltLookup {
            table,
            writable_indexes: vec![5],
            readonly_indexes: vec![],
        };
        let bytes = encode_v0(&keys, &blockhash, &[sample_ix()], &[lookup]);

        assert!(matches!(
            decode_message(&bytes, &alts),
            Err(MessageError::LookupIndexOutOfBounds { index: 5, .. })
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let (alts, _rx) = AltCache::new();
        let bytes = vec![0x81, 1, 0, 1, 0];
        assert_eq!(
            decode_message(&bytes, &alts).unwrap_err(),
            MessageError::UnsupportedVersion(1)
        );
    }

    #[test]
    fn test_truncated_message_rejected() {
        let (alts, _rx) = AltCache::new();
        let keys = vec![Pubkey::new_unique()];
        let blockhash = Hash::new_unique();
        let mut bytes = encode_legacy(&keys, &blockhash, &[sample_ix()]);
        bytes.truncate(bytes.len() - 3);

        assert!(matches!(
            decode_message(&bytes, &alts),
            Err(MessageError::Codec(CodecError::UnexpectedEof { .. }))
        ));
    }
}
