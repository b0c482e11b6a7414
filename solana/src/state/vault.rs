use solana_sdk::{program_pack::Pack, pubkey::Pubkey};

/// Cached SPL token account balance for a pool vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultBalance {
    pub amount: u64,
    pub mint: Pubkey,
}

/// Decodes a token account into its balance. Works for both the
/// classic program and token-2022 (same 165-byte base layout; 2022
/// extensions trail it, hence the `>=`).
#[must_use]
pub fn decode_vault(data: &[u8]) -> Option<VaultBalance> {
    if data.len() < spl_token::state::Account::LEN {
        return None;
    }

    let account = spl_token::state::Account::unpack_from_slice(
        &data[..spl_token::state::Account::LEN],
    )
    .ok()?;

    Some(VaultBalance {
        amount: account.amount,
        mint: account.mint,
    })
}
