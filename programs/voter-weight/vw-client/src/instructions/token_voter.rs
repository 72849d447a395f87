use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use super::anchor_ix;
use crate::errors::*;

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
        ],
        &(),
    )
}
