use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_system_interface::program::ID as system_program;

use super::anchor_ix;
use crate::{constants::*, errors::*};

#[derive(BorshSerialize)]
struct CreateVoterArgs {
    voter_bump: u8,
    voter_weight_record_bump: u8,
}

pub struct CreateVoterAccounts {
    pub registrar: Pubkey,
    pub voter: Pubkey,
    pub voter_authority: Pubkey,
    pub voter_weight_record: Pubkey,
    pub payer: Pubkey,
}

// Build create_voter instruction (also creates the voter weight record)
pub fn build_create_voter_ix(
    program_id: &Pubkey,
    accounts: &CreateVoterAccounts,
    voter_bump: u8,
    voter_weight_record_bump: u8,
) -> Result<Instruction> {
    anchor_ix(
        program_id,
        "create_voter",
        vec![
            AccountMeta::new_readonly(accounts.registrar, false),
            AccountMeta::new(accounts.voter, false),
            AccountMeta::new_readonly(accounts.voter_authority, true),
            AccountMeta::new(accounts.voter_weight_record, false),
            AccountMeta::new(accounts.payer, true),
            AccountMeta::new_readonly(system_program, false),
            AccountMeta::new_readonly(RENT_SYSVAR_ID, false),
            AccountMeta::new_readonly(INSTRUCTIONS_SYSVAR_ID, false),
        ],
        &CreateVoterArgs {
            voter_bump,
            voter_weight_record_bump,
        },
    )
}

// Build update_voter_weight_record instruction
pub fn build_update_voter_weight_record_ix(
    program_id: &Pubkey,
    registrar: &Pubkey,
    voter: &Pubkey,
    voter_weight_record: &Pubkey,
) -> Result<Instruction> {
    anchor_ix(
        program_id,
        "update_voter_weight_record",
        vec![
            AccountMeta::new_readonly(*registrar, false),
            AccountMeta::new_readonly(*voter, false),
            AccountMeta::new(*voter_weight_record, false),
            AccountMeta::new_readonly(system_program, false),
        ],
        &(),
    )
}
