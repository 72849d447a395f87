pub mod gateway;
pub mod governance;
pub mod locked_stake;
pub mod nft;
pub mod quadratic;
pub mod spl;
pub mod token_haver;
pub mod token_voter;

pub use gateway::*;
pub use governance::*;
pub use locked_stake::*;
pub use nft::*;
pub use quadratic::*;
pub use spl::*;
pub use token_haver::*;
pub use token_voter::*;

use borsh::BorshDeserialize;
use bytemuck::Pod;
use solana_sdk::pubkey::Pubkey;

use crate::{cache::AccountData, constants::ANCHOR_DISCRIMINATOR, errors::*, helpers::account_discriminator};

// Every decoder checks the owning program first: a plugin must never trust
// bytes that another program could have written.
pub fn check_owner(address: &Pubkey, account: &AccountData, expected: &Pubkey) -> Result<()> {
    if account.owner != *expected {
        return Err(VoterWeightError::InvalidAccountOwner {
            address: *address,
            expected: *expected,
            actual: account.owner,
        });
    }
    Ok(())
}

// Strip and verify the 8 byte Anchor account discriminator
pub fn anchor_payload<'a>(address: &Pubkey, account: &'a AccountData, name: &str) -> Result<&'a [u8]> {
    if account.data.len() < ANCHOR_DISCRIMINATOR {
        return Err(VoterWeightError::InvalidDiscriminator(*address));
    }
    let (disc, payload) = account.data.split_at(ANCHOR_DISCRIMINATOR);
    if disc != account_discriminator(name) {
        return Err(VoterWeightError::InvalidDiscriminator(*address));
    }
    Ok(payload)
}

// Borsh decode that tolerates trailing bytes (accounts are allocated with padding)
pub fn decode_borsh<T: BorshDeserialize>(address: &Pubkey, mut bytes: &[u8]) -> Result<T> {
    T::deserialize(&mut bytes).map_err(|e| VoterWeightError::AccountDecode {
        address: *address,
        reason: e.to_string(),
    })
}

// Zero-copy layouts are read unaligned: RPC buffers carry no alignment guarantee
pub fn decode_pod<T: Pod>(address: &Pubkey, bytes: &[u8]) -> Result<T> {
    let size = std::mem::size_of::<T>();
    if bytes.len() < size {
        return Err(VoterWeightError::AccountDecode {
            address: *address,
            reason: format!("expected at least {} bytes, found {}", size, bytes.len()),
        });
    }
    bytemuck::try_pod_read_unaligned(&bytes[..size]).map_err(|e| VoterWeightError::AccountDecode {
        address: *address,
        reason: e.to_string(),
    })
}

/// Owner check + Anchor discriminator + borsh body.
pub fn decode_anchor_account<T: BorshDeserialize>(
    address: &Pubkey,
    account: &AccountData,
    owner: &Pubkey,
    name: &str,
) -> Result<T> {
    check_owner(address, account, owner)?;
    decode_borsh(address, anchor_payload(address, account, name)?)
}

/// Owner check + Anchor discriminator + zero-copy body.
pub fn decode_zero_copy_account<T: Pod>(
    address: &Pubkey,
    account: &AccountData,
    owner: &Pubkey,
    name: &str,
) -> Result<T> {
    check_owner(address, account, owner)?;
    decode_pod(address, anchor_payload(address, account, name)?)
}

// Serialisers used by fixtures and by callers that stage accounts locally

pub fn encode_anchor_account<T: borsh::BorshSerialize>(name: &str, value: &T) -> std::io::Result<Vec<u8>> {
    let mut data = account_discriminator(name).to_vec();
    value.serialize(&mut data)?;
    Ok(data)
}

pub fn encode_zero_copy_account<T: Pod>(name: &str, value: &T) -> Vec<u8> {
    let mut data = account_discriminator(name).to_vec();
    data.extend_from_slice(bytemuck::bytes_of(value));
    data
}
