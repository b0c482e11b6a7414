//! Wire-format primitives shared by the transaction decoder: fixed-width
//! little-endian reads, 32-byte pubkeys and the compact-u16 varint.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of data at offset {at} (wanted {wanted} bytes)")]
    UnexpectedEof { at: usize, wanted: usize },
    #[error("over-long compact-u16 encoding at offset {at}")]
    OverlongCompactU16 { at: usize },
    #[error("compact-u16 value exceeds u16 range at offset {at}")]
    CompactU16Overflow { at: usize },
}

/// Forward-only reader over a message byte slice. All reads are bounds
/// checked; nothing is copied until the caller asks for owned data.
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let b = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof {
            at: self.pos,
            wanted: 1,
        })?;
        self.pos += 1;
        Ok(b)
    }

    pub fn peek_u8(&self) -> Result<u8, CodecError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(CodecError::UnexpectedEof {
                at: self.pos,
                wanted: 1,
            })
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(CodecError::UnexpectedEof {
                at: self.pos,
                wanted: len,
            })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn read_u64_le(&mut self) -> Result<u64, CodecError> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_pubkey(&mut self) -> Result<Pubkey, CodecError> {
        let bytes = self.read_bytes(32)?;
        Ok(Pubkey::new_from_array(bytes.try_into().unwrap()))
    }

    /// Reads a compact-u16: 1-3 bytes, 7 value bits per byte, LE group
    /// order. Rejects non-canonical (over-long) encodings and values
    /// above `u16::MAX` — a malformed length must never be interpreted
    /// as a short one.
    pub fn read_compact_u16(&mut self) -> Result<u16, CodecError> {
        let start = self.pos;
        let mut value: u32 = 0;

        for i in 0..3 {
            let byte = self.read_u8()?;
            let group = u32::from(byte & 0x7f);

            // A trailing zero continuation group means the same value
            // fits in fewer bytes.
            if i > 0 && group == 0 {
                return Err(CodecError::OverlongCompactU16 { at: start });
            }

            value |= group << (7 * i);

            if byte & 0x80 == 0 {
                return u16::try_from(value)
                    .map_err(|_| CodecError::CompactU16Overflow { at: start });
            }

            // Third byte may only carry the top two bits of a u16.
            if i == 2 {
                return Err(CodecError::CompactU16Overflow { at: start });
            }
        }

        unreachable!("loop returns within three iterations")
    }

    /// Compact-u16 length followed by that many raw bytes.
    pub fn read_compact_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read_compact_u16()? as usize;
        self.read_bytes(len)
    }
}
