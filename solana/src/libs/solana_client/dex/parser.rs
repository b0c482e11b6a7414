use bytemuck::Pod;
use solana_sdk::pubkey::Pubkey;

/// An on-chain entity owned by one of the target programs: a pool, an
/// auxiliary account (tick array, bin array, fee config) or a swap
/// instruction payload.
///
/// `DATA_SIZE` is the full serialized length including the
/// discriminator; zero means "not length-discriminated" (instruction
/// payloads, discriminator-less accounts are matched by the registry
/// key instead).
pub trait DexEntity: Sized {
    const PROGRAM_ID: Pubkey;
    const DISCRIMINATOR: &'static [u8];
    const DATA_SIZE: usize;

    fn deserialize(data: &[u8]) -> Option<Self>;

    /// Zero-copy read: discriminator check + unaligned pod read of the
    /// payload. Never allocates a new buffer.
    fn deserialize_bytemuck(data: &[u8]) -> Option<Self>
    where
        Self: Pod + Copy,
    {
        let disc_size = Self::DISCRIMINATOR.len();
        let struct_size = disc_size + size_of::<Self>();

        if data.len() < struct_size {
            return None;
        }

        if disc_size > 0 && !data.starts_with(Self::DISCRIMINATOR) {
            return None;
        }

        let payload = data.get(disc_size..struct_size)?;
        Some(bytemuck::pod_read_unaligned(payload))
    }

    fn parse_into<Out, F>(data: &[u8], wrap: F) -> Option<Out>
    where
        F: FnOnce(Box<Self>) -> Out,
    {
        Self::deserialize(data).map(|val| wrap(Box::new(val)))
    }
}
