// Voter Weight Helper Functions
//
// Discriminator and fixed point helpers shared by the account decoders,
// the instruction builders and the plugin adapters.

use sha2::{Digest, Sha256};

use crate::errors::*;

// DISCRIMINATORS

// Anchor instruction discriminator: first 8 bytes of sha256("global:<method>")
pub fn instruction_discriminator(method: &str) -> [u8; 8] {
    discriminator("global", method)
}

// Anchor account discriminator: first 8 bytes of sha256("account:<Name>")
pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator("account", name)
}

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let preimage = format!("{}:{}", namespace, name);
    let hash = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

// FIXED POINT HELPERS

// Convert a native token amount into the common vote denomination.
// Positive shifts multiply by 10^shift, negative shifts divide (rounding down).
pub fn apply_digit_shift(amount: u64, digit_shift: i8) -> Result<u64> {
    let factor = 10u128
        .checked_pow(digit_shift.unsigned_abs() as u32)
        .ok_or(VoterWeightError::Overflow)?;

    let shifted = if digit_shift >= 0 {
        (amount as u128).checked_mul(factor).ok_or(VoterWeightError::Overflow)?
    } else {
        (amount as u128) / factor
    };

    u64::try_from(shifted).map_err(|_| VoterWeightError::Overflow)
}

// amount * numerator / denominator without intermediate overflow
pub fn mul_div(amount: u64, numerator: u64, denominator: u64) -> Result<u64> {
    if denominator == 0 {
        return Err(VoterWeightError::Overflow);
    }
    let value = (amount as u128)
        .checked_mul(numerator as u128)
        .ok_or(VoterWeightError::Overflow)?
        / denominator as u128;
    u64::try_from(value).map_err(|_| VoterWeightError::Overflow)
}

pub fn checked_sum<I: IntoIterator<Item = u64>>(values: I) -> Result<u64> {
    values
        .into_iter()
        .try_fold(0u64, |acc, v| acc.checked_add(v).ok_or(VoterWeightError::Overflow))
}
