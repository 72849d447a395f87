// Token Deposit Registry State
//
// Members deposit any of the registrar's voting mints; weight is the sum of
// the deposits converted to the governing mint's denomination.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::{constants::GOVERNANCE_PROGRAM_ID, errors::*, helpers::apply_digit_shift};

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct TokenVotingMintConfig {
    pub mint: [u8; 32],
    pub digit_shift: i8,
    pub reserved: [u8; 31],
}

impl TokenVotingMintConfig {
    pub fn new(mint: &Pubkey, digit_shift: i8) -> Self {
        Self {
            mint: mint.to_bytes(),
            digit_shift,
            reserved: [0; 31],
        }
    }

    pub fn mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.mint)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct TokenVoterRegistrar {
    pub governance_program_id: [u8; 32],
    pub realm: [u8; 32],
    pub governing_token_mint: [u8; 32],
    pub voting_mint_configs: Vec<TokenVotingMintConfig>,
    pub max_mints: u8,
    pub bump: u8,
}

impl TokenVoterRegistrar {
    pub const ACCOUNT_NAME: &'static str = "Registrar";

    pub fn new(realm: &Pubkey, mint: &Pubkey, voting_mint_configs: Vec<TokenVotingMintConfig>) -> Self {
        Self {
            governance_program_id: GOVERNANCE_PROGRAM_ID.to_bytes(),
            realm: realm.to_bytes(),
            governing_token_mint: mint.to_bytes(),
            max_mints: voting_mint_configs.len() as u8,
            voting_mint_configs,
            bump: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct TokenDepositEntry {
    pub voting_mint_config_idx: u8,
    pub amount_deposited_native: u64,
    pub deposit_slot_hash: u64,
    pub is_used: bool,
    pub reserved: [u8; 7],
}

impl TokenDepositEntry {
    pub fn new(voting_mint_config_idx: u8, amount: u64) -> Self {
        Self {
            voting_mint_config_idx,
            amount_deposited_native: amount,
            deposit_slot_hash: 0,
            is_used: true,
            reserved: [0; 7],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct TokenVoter {
    pub voter_authority: [u8; 32],
    pub registrar: [u8; 32],
    pub deposits: Vec<TokenDepositEntry>,
    pub voter_bump: u8,
    pub voter_weight_record_bump: u8,
}

impl TokenVoter {
    pub const ACCOUNT_NAME: &'static str = "Voter";

    pub fn new(authority: &Pubkey, registrar: &Pubkey, deposits: Vec<TokenDepositEntry>) -> Self {
        Self {
            voter_authority: authority.to_bytes(),
            registrar: registrar.to_bytes(),
            deposits,
            voter_bump: 0,
            voter_weight_record_bump: 0,
        }
    }

    pub fn weight(&self, registrar: &TokenVoterRegistrar) -> Result<u64> {
        let mut total = 0u64;
        for deposit in self.deposits.iter().filter(|d| d.is_used) {
            let Some(config) = registrar.voting_mint_configs.get(deposit.voting_mint_config_idx as usize) else {
                continue;
            };
            total = total
                .checked_add(apply_digit_shift(deposit.amount_deposited_native, config.digit_shift)?)
                .ok_or(VoterWeightError::Overflow)?;
        }
        Ok(total)
    }
}
