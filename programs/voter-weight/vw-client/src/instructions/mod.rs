// Plugin Instruction Builders
//
// Every plugin program is an Anchor program: instruction data is the 8 byte
// method discriminator followed by the borsh encoded arguments. Builders only
// construct instructions, they never look at chain state.

pub mod chained;
pub mod locked_stake;
pub mod nft;
pub mod token_haver;
pub mod token_voter;

use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_system_interface::program::ID as system_program;

use crate::{errors::*, helpers::instruction_discriminator};

pub(crate) fn anchor_ix<A: BorshSerialize>(
    program_id: &Pubkey,
    method: &'static str,
    accounts: Vec<AccountMeta>,
    args: &A,
) -> Result<Instruction> {
    let mut data = instruction_discriminator(method).to_vec();
    args.serialize(&mut data).map_err(|e| VoterWeightError::InstructionEncode {
        method,
        reason: e.to_string(),
    })?;

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Accounts shared by every plugin registrar scoped record creation.
pub struct RecordAccounts {
    pub registrar: Pubkey,
    pub record: Pubkey,
    pub realm: Pubkey,
    pub governing_token_mint: Pubkey,
    pub payer: Pubkey,
}

// Build create_voter_weight_record instruction
pub fn build_create_voter_weight_record_ix(
    program_id: &Pubkey,
    accounts: &RecordAccounts,
    governing_token_owner: &Pubkey,
) -> Result<Instruction> {
    anchor_ix(
        program_id,
        "create_voter_weight_record",
        record_metas(accounts),
        &governing_token_owner.to_bytes(),
    )
}

// Build create_max_voter_weight_record instruction
pub fn build_create_max_voter_weight_record_ix(program_id: &Pubkey, accounts: &RecordAccounts) -> Result<Instruction> {
    anchor_ix(program_id, "create_max_voter_weight_record", record_metas(accounts), &())
}

fn record_metas(accounts: &RecordAccounts) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new_readonly(accounts.registrar, false),
        AccountMeta::new(accounts.record, false),
        AccountMeta::new_readonly(accounts.realm, false),
        AccountMeta::new_readonly(accounts.governing_token_mint, false),
        AccountMeta::new(accounts.payer, true),
        AccountMeta::new_readonly(system_program, false),
    ]
}
