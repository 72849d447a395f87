// SPL Token and Sysvar Accounts
//
// Mints and token accounts are unpacked with the spl-token program's own
// `Pack` implementations, which reject uninitialized accounts. The clock
// sysvar is the bincode encoded `Clock`.

use solana_sdk::{clock::Clock, pubkey::Pubkey};
use spl_token::solana_program::program_pack::{IsInitialized, Pack};
#[allow(deprecated)]
pub use spl_token::state::{Account as TokenAccount, AccountState as TokenAccountState, Mint};

use super::check_owner;
use crate::{cache::AccountData, constants::CLOCK_SYSVAR_ID, errors::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainClock {
    pub slot: u64,
    pub unix_timestamp: i64,
}

impl ChainClock {
    pub fn decode(account: &AccountData) -> Result<Self> {
        let clock: Clock = bincode::deserialize(&account.data).map_err(|e| VoterWeightError::AccountDecode {
            address: CLOCK_SYSVAR_ID,
            reason: e.to_string(),
        })?;
        Ok(Self {
            slot: clock.slot,
            unix_timestamp: clock.unix_timestamp,
        })
    }

    pub fn encode(&self) -> bincode::Result<Vec<u8>> {
        bincode::serialize(&Clock {
            slot: self.slot,
            epoch_start_timestamp: self.unix_timestamp,
            unix_timestamp: self.unix_timestamp,
            ..Clock::default()
        })
    }
}

fn unpack<T: Pack + IsInitialized>(address: &Pubkey, account: &AccountData) -> Result<T> {
    check_owner(address, account, &spl_token::ID)?;
    T::unpack(&account.data).map_err(|e| VoterWeightError::AccountDecode {
        address: *address,
        reason: format!("{e:?}"),
    })
}

pub fn decode_mint(address: &Pubkey, account: &AccountData) -> Result<Mint> {
    unpack(address, account)
}

pub fn decode_token_account(address: &Pubkey, account: &AccountData) -> Result<TokenAccount> {
    unpack(address, account)
}

/// Packed, initialized mint.
pub fn encode_mint(supply: u64, decimals: u8) -> Vec<u8> {
    let mint = Mint {
        supply,
        decimals,
        is_initialized: true,
        ..Mint::default()
    };
    let mut data = vec![0u8; Mint::LEN];
    mint.pack_into_slice(&mut data);
    data
}

pub fn encode_token_account(mint: &Pubkey, owner: &Pubkey, amount: u64, state: TokenAccountState) -> Vec<u8> {
    let account = TokenAccount {
        mint: *mint,
        owner: *owner,
        amount,
        state,
        ..TokenAccount::default()
    };
    let mut data = vec![0u8; TokenAccount::LEN];
    account.pack_into_slice(&mut data);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_account_fields() {
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let address = Pubkey::new_unique();
        let data = encode_token_account(&mint, &owner, 42, TokenAccountState::Initialized);
        let account = AccountData::new(spl_token::ID, data);

        let decoded = decode_token_account(&address, &account).unwrap();
        assert_eq!(decoded.mint, mint);
        assert_eq!(decoded.owner, owner);
        assert_eq!(decoded.amount, 42);
        assert!(!decoded.is_frozen());
    }

    #[test]
    fn test_rejects_uninitialized_mint() {
        let account = AccountData::new(spl_token::ID, vec![0u8; Mint::LEN]);
        assert!(matches!(
            decode_mint(&Pubkey::new_unique(), &account),
            Err(VoterWeightError::AccountDecode { .. })
        ));
    }

    #[test]
    fn test_rejects_uninitialized_token_account() {
        let data = encode_token_account(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            5,
            TokenAccountState::Uninitialized,
        );
        let account = AccountData::new(spl_token::ID, data);
        assert!(decode_token_account(&Pubkey::new_unique(), &account).is_err());
    }

    #[test]
    fn test_rejects_foreign_owner() {
        let account = AccountData::new(Pubkey::new_unique(), encode_mint(1_000, 6));
        assert!(matches!(
            decode_mint(&Pubkey::new_unique(), &account),
            Err(VoterWeightError::InvalidAccountOwner { .. })
        ));
    }

    #[test]
    fn test_clock_round_trip() {
        let clock = ChainClock {
            slot: 250,
            unix_timestamp: 1_700_000_000,
        };
        let account = AccountData::new(Pubkey::new_unique(), clock.encode().unwrap());
        assert_eq!(ChainClock::decode(&account).unwrap(), clock);
    }
}
