// Chained Plugin Instruction Builders
//
// Quadratic and gateway plugins read the previous plugin's voter weight record
// (or the token owner record for the first plugin) as their input account.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use super::anchor_ix;
use crate::errors::*;

// Build quadratic update_voter_weight_record instruction
pub fn build_quadratic_update_ix(
    program_id: &Pubkey,
    registrar: &Pubkey,
    input_voter_weight: &Pubkey,
    voter_weight_record: &Pubkey,
) -> Result<Instruction> {
    anchor_ix(
        program_id,
        "update_voter_weight_record",
        vec![
            AccountMeta::new_readonly(*registrar, false),
            AccountMeta::new_readonly(*input_voter_weight, false),
            AccountMeta::new(*voter_weight_record, false),
        ],
        &(),
    )
}

// Build gateway update_voter_weight_record instruction
pub fn build_gateway_update_ix(
    program_id: &Pubkey,
    registrar: &Pubkey,
    input_voter_weight: &Pubkey,
    gateway_token: &Pubkey,
    voter_weight_record: &Pubkey,
) -> Result<Instruction> {
    anchor_ix(
        program_id,
        "update_voter_weight_record",
        vec![
            AccountMeta::new_readonly(*registrar, false),
            AccountMeta::new_readonly(*input_voter_weight, false),
            AccountMeta::new_readonly(*gateway_token, false),
            AccountMeta::new(*voter_weight_record, false),
        ],
        &(),
    )
}
