// NFT Voter Instruction Builders
//
// NFTs are passed as remaining accounts: (token account, metadata) pairs for
// weight updates, plus the nft vote record PDA for cast_nft_vote.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use solana_system_interface::program::ID as system_program;

use super::anchor_ix;
use crate::{errors::*, state::VoterWeightAction};

/// Accounts describing one NFT presented to the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NftVoteAccounts {
    pub token_account: Pubkey,
    pub metadata: Pubkey,
    pub nft_vote_record: Pubkey,
}

// Build update_voter_weight_record instruction from (token account, metadata) pairs
pub fn build_update_voter_weight_record_ix(
    program_id: &Pubkey,
    registrar: &Pubkey,
    voter_weight_record: &Pubkey,
    action: VoterWeightAction,
    holdings: &[(Pubkey, Pubkey)],
) -> Result<Instruction> {
    let mut accounts = vec![
        AccountMeta::new_readonly(*registrar, false),
        AccountMeta::new(*voter_weight_record, false),
    ];
    for (token_account, metadata) in holdings {
        accounts.push(AccountMeta::new_readonly(*token_account, false));
        accounts.push(AccountMeta::new_readonly(*metadata, false));
    }
    anchor_ix(program_id, "update_voter_weight_record", accounts, &action)
}

pub struct CastNftVoteAccounts {
    pub registrar: Pubkey,
    pub voter_weight_record: Pubkey,
    pub voter_token_owner_record: Pubkey,
    pub voter_authority: Pubkey,
    pub payer: Pubkey,
}

// Build cast_nft_vote instruction for one chunk of NFTs
pub fn build_cast_nft_vote_ix(
    program_id: &Pubkey,
    accounts: &CastNftVoteAccounts,
    proposal: &Pubkey,
    nfts: &[NftVoteAccounts],
) -> Result<Instruction> {
    let mut metas = vec![
        AccountMeta::new_readonly(accounts.registrar, false),
        AccountMeta::new(accounts.voter_weight_record, false),
        AccountMeta::new_readonly(accounts.voter_token_owner_record, false),
        AccountMeta::new_readonly(accounts.voter_authority, true),
        AccountMeta::new(accounts.payer, true),
        AccountMeta::new_readonly(system_program, false),
    ];
    for nft in nfts {
        metas.push(AccountMeta::new_readonly(nft.token_account, false));
        metas.push(AccountMeta::new_readonly(nft.metadata, false));
        metas.push(AccountMeta::new(nft.nft_vote_record, false));
    }
    anchor_ix(program_id, "cast_nft_vote", metas, &proposal.to_bytes())
}

pub struct RelinquishNftVoteAccounts {
    pub registrar: Pubkey,
    pub voter_weight_record: Pubkey,
    pub governance: Pubkey,
    pub proposal: Pubkey,
    pub voter_token_owner_record: Pubkey,
    pub voter_authority: Pubkey,
    pub vote_record: Pubkey,
    pub beneficiary: Pubkey,
}

// Build relinquish_nft_vote instruction; closes the given nft vote records
pub fn build_relinquish_nft_vote_ix(
    program_id: &Pubkey,
    accounts: &RelinquishNftVoteAccounts,
    nft_vote_records: &[Pubkey],
) -> Result<Instruction> {
    let mut metas = vec![
        AccountMeta::new_readonly(accounts.registrar, false),
        AccountMeta::new(accounts.voter_weight_record, false),
        AccountMeta::new_readonly(accounts.governance, false),
        AccountMeta::new_readonly(accounts.proposal, false),
        AccountMeta::new_readonly(accounts.voter_token_owner_record, false),
        AccountMeta::new_readonly(accounts.voter_authority, true),
        AccountMeta::new_readonly(accounts.vote_record, false),
        AccountMeta::new(accounts.beneficiary, false),
    ];
    metas.extend(nft_vote_records.iter().map(|record| AccountMeta::new(*record, false)));
    anchor_ix(program_id, "relinquish_nft_vote", metas, &())
}
