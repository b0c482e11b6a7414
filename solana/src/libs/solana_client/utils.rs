use solana_sdk::{pubkey, pubkey::Pubkey};

pub const SYSTEM_PROGRAM_ID: Pubkey = pubkey!("11111111111111111111111111111111");
pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const WSOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

/// Canonical associated token account for `(wallet, mint)` under the
/// given token program.
#[must_use]
pub fn derive_associated_token_account(
    wallet: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}

/// Whether `account` is the wallet's ATA for `mint` under either token
/// program. Non-ATA token accounts legitimately fail this check; the
/// caller treats that as "cannot infer", not as an error.
#[must_use]
pub fn is_associated_token_account(account: &Pubkey, wallet: &Pubkey, mint: &Pubkey) -> bool {
    *account == derive_associated_token_account(wallet, mint, &spl_token::ID)
        || *account == derive_associated_token_account(wallet, mint, &TOKEN_2022_PROGRAM_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ata_derivation_is_deterministic() {
        let wallet = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let a = derive_associated_token_account(&wallet, &mint, &spl_token::ID);
        let b = derive_associated_token_account(&wallet, &mint, &spl_token::ID);
        assert_eq!(a, b);

        let c = derive_associated_token_account(&wallet, &mint, &TOKEN_2022_PROGRAM_ID);
        assert_ne!(a, c);
    }

    #[test]
    fn test_is_associated_token_account() {
        let wallet = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ata = derive_associated_token_account(&wallet, &mint, &spl_token::ID);
        assert!(is_associated_token_account(&ata, &wallet, &mint));

        let ata_2022 = derive_associated_token_account(&wallet, &mint, &TOKEN_2022_PROGRAM_ID);
        assert!(is_associated_token_account(&ata_2022, &wallet, &mint));

        assert!(!is_associated_token_account(
            &Pubkey::new_unique(),
            &wallet,
            &mint
        ));
    }
}
