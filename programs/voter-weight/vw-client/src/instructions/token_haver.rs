use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use super::anchor_ix;
use crate::errors::*;

// Build update_voter_weight_record instruction; held token accounts go in the remaining accounts
pub fn build_update_voter_weight_record_ix(
    program_id: &Pubkey,
    registrar: &Pubkey,
    voter_weight_record: &Pubkey,
    token_accounts: &[Pubkey],
) -> Result<Instruction> {
    let mut accounts = vec![
        AccountMeta::new_readonly(*registrar, false),
        AccountMeta::new(*voter_weight_record, false),
    ];
    accounts.extend(token_accounts.iter().map(|account| AccountMeta::new_readonly(*account, false)));
    anchor_ix(program_id, "update_voter_weight_record", accounts, &())
}
