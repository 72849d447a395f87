// NFT Voter Plugin
//
// Every verified NFT from a configured collection is worth that collection's
// weight. Holdings come from the asset index; the plugin keeps no member
// account besides its voter weight record and the per-proposal nft vote
// records created while casting.

use async_trait::async_trait;
use futures::future::try_join_all;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use super::*;
use crate::{
    cache::OwnedAsset,
    instructions::nft::*,
    state::{decode_anchor_account, NftRegistrar},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NftPlugin {
    program_id: Pubkey,
}

impl NftPlugin {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    async fn load_registrar(&self, ctx: &PluginContext<'_>) -> Result<Option<(Pubkey, NftRegistrar)>> {
        let Some((address, account)) = ctx.registrar(&self.resolver()).await? else {
            return Ok(None);
        };
        let registrar = decode_anchor_account(&address, &account, &self.program_id, NftRegistrar::ACCOUNT_NAME)?;
        Ok(Some((address, registrar)))
    }

    /// Member NFTs that count towards the weight, with the weight of each.
    async fn voting_nfts(
        &self,
        ctx: &PluginContext<'_>,
        registrar: &NftRegistrar,
        member: &Pubkey,
    ) -> Result<Vec<(OwnedAsset, u64)>> {
        let assets = ctx.cache.owned_assets(member).await?;
        Ok(assets
            .iter()
            .filter(|asset| asset.collection_verified)
            .filter_map(|asset| {
                let config = registrar.collection_config(&asset.collection?)?;
                Some((asset.clone(), config.weight))
            })
            .collect())
    }

    fn nft_accounts(&self, asset: &OwnedAsset, proposal: &Pubkey) -> Result<NftVoteAccounts> {
        Ok(NftVoteAccounts {
            token_account: asset.token_account,
            metadata: address::token_metadata(&asset.mint)?.0,
            nft_vote_record: address::nft_vote_record(&self.program_id, proposal, &asset.mint)?.0,
        })
    }

    async fn cast_vote_ixs(
        &self,
        ctx: &PluginContext<'_>,
        registrar: &Pubkey,
        nfts: &[(OwnedAsset, u64)],
        request: &UpdateRequest,
        proposal: &Pubkey,
    ) -> Result<Vec<Instruction>> {
        let accounts: Vec<NftVoteAccounts> = nfts
            .iter()
            .map(|(asset, _)| self.nft_accounts(asset, proposal))
            .collect::<Result<_>>()?;

        // An NFT votes once per proposal
        let voted = try_join_all(accounts.iter().map(|nft| ctx.exists(&nft.nft_vote_record))).await?;
        let fresh: Vec<NftVoteAccounts> = accounts
            .into_iter()
            .zip(voted)
            .filter(|(_, voted)| !voted)
            .map(|(nft, _)| nft)
            .collect();
        debug!(member = %request.member, fresh = fresh.len(), "nfts left to cast");

        let cast_accounts = CastNftVoteAccounts {
            registrar: *registrar,
            voter_weight_record: voter_weight_record(self, ctx, &request.member)?,
            voter_token_owner_record: ctx.token_owner_record(&request.member)?,
            voter_authority: request.member,
            payer: request.payer,
        };
        fresh
            .chunks(MAX_NFTS_PER_CAST_VOTE)
            .map(|chunk| build_cast_nft_vote_ix(&self.program_id, &cast_accounts, proposal, chunk))
            .collect()
    }

    async fn relinquish_ixs(
        &self,
        ctx: &PluginContext<'_>,
        registrar: &Pubkey,
        nfts: &[(OwnedAsset, u64)],
        request: &UpdateRequest,
        governance: &Pubkey,
        proposal: &Pubkey,
    ) -> Result<Vec<Instruction>> {
        let records: Vec<Pubkey> = nfts
            .iter()
            .map(|(asset, _)| Ok(address::nft_vote_record(&self.program_id, proposal, &asset.mint)?.0))
            .collect::<Result<_>>()?;
        let exists = try_join_all(records.iter().map(|record| ctx.exists(record))).await?;
        let records: Vec<Pubkey> = records
            .into_iter()
            .zip(exists)
            .filter_map(|(record, exists)| exists.then_some(record))
            .collect();
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let token_owner_record = ctx.token_owner_record(&request.member)?;
        let accounts = RelinquishNftVoteAccounts {
            registrar: *registrar,
            voter_weight_record: voter_weight_record(self, ctx, &request.member)?,
            governance: *governance,
            proposal: *proposal,
            voter_token_owner_record: token_owner_record,
            voter_authority: request.member,
            vote_record: address::governance_vote_record(&ctx.governance_program_id, proposal, &token_owner_record)?.0,
            beneficiary: request.payer,
        };
        Ok(vec![build_relinquish_nft_vote_ix(&self.program_id, &accounts, &records)?])
    }
}

#[async_trait]
impl VoterWeightPlugin for NftPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::NftHolding
    }

    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn calculate_voter_weight(
        &self,
        ctx: &PluginContext<'_>,
        member: &Pubkey,
        _input: Option<u64>,
    ) -> Result<PluginWeight> {
        let Some((_, registrar)) = self.load_registrar(ctx).await? else {
            return Ok(PluginWeight::NotConfigured);
        };
        let nfts = self.voting_nfts(ctx, &registrar, member).await?;
        if nfts.is_empty() {
            return Ok(PluginWeight::NoRecord);
        }
        let weight = crate::helpers::checked_sum(nfts.iter().map(|(_, weight)| *weight))?;
        Ok(PluginWeight::resolved(weight))
    }

    async fn calculate_max_voter_weight(&self, ctx: &PluginContext<'_>, _input: Option<u64>) -> Result<PluginWeight> {
        let Some((_, registrar)) = self.load_registrar(ctx).await? else {
            return Ok(PluginWeight::NotConfigured);
        };
        let mut total = 0u64;
        for config in &registrar.collection_configs {
            let collection_weight = (config.size as u64)
                .checked_mul(config.weight)
                .ok_or(VoterWeightError::Overflow)?;
            total = total.checked_add(collection_weight).ok_or(VoterWeightError::Overflow)?;
        }
        Ok(PluginWeight::resolved(total))
    }

    async fn update_voter_weight_record(
        &self,
        ctx: &PluginContext<'_>,
        request: &UpdateRequest,
    ) -> Result<Option<PendingOperations>> {
        let Some((registrar_address, registrar)) = self.load_registrar(ctx).await? else {
            return Ok(None);
        };
        let nfts = self.voting_nfts(ctx, &registrar, &request.member).await?;

        match request.action {
            GovernanceAction::RelinquishVote { governance, proposal } => {
                let post = self
                    .relinquish_ixs(ctx, &registrar_address, &nfts, request, &governance, &proposal)
                    .await?;
                Ok(Some(PendingOperations { pre: Vec::new(), post }))
            }
            GovernanceAction::CastVote { proposal } => {
                let mut pre = record_setup(self, ctx, request).await?;
                pre.extend(
                    self.cast_vote_ixs(ctx, &registrar_address, &nfts, request, &proposal)
                        .await?,
                );
                Ok(Some(PendingOperations::pre(pre)))
            }
            action => {
                let Some(weight_action) = action.weight_action() else {
                    return Ok(Some(PendingOperations::default()));
                };
                let holdings: Vec<(Pubkey, Pubkey)> = nfts
                    .iter()
                    .map(|(asset, _)| Ok((asset.token_account, address::token_metadata(&asset.mint)?.0)))
                    .collect::<Result<_>>()?;

                let mut pre = record_setup(self, ctx, request).await?;
                pre.push(build_update_voter_weight_record_ix(
                    &self.program_id,
                    &registrar_address,
                    &voter_weight_record(self, ctx, &request.member)?,
                    weight_action,
                    &holdings,
                )?);
                Ok(Some(PendingOperations::pre(pre)))
            }
        }
    }
}
