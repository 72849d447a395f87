// Locked Stake Plugin (voter stake registry)
//
// Weight decays as lockups run down, so the contribution carries the slot it
// was computed at as its expiry.

use async_trait::async_trait;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::debug;

use super::*;
use crate::{
    instructions::locked_stake::{build_create_voter_ix, build_update_voter_weight_record_ix, CreateVoterAccounts},
    state::{decode_mint, decode_zero_copy_account, LockedStakeRegistrar, LockedStakeVoter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedStakePlugin {
    program_id: Pubkey,
}

impl LockedStakePlugin {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    async fn load_registrar(&self, ctx: &PluginContext<'_>) -> Result<Option<(Pubkey, LockedStakeRegistrar)>> {
        let Some((address, account)) = ctx.registrar(&self.resolver()).await? else {
            return Ok(None);
        };
        let registrar = decode_zero_copy_account(&address, &account, &self.program_id, LockedStakeRegistrar::ACCOUNT_NAME)?;
        Ok(Some((address, registrar)))
    }

    fn voter_address(&self, ctx: &PluginContext<'_>, member: &Pubkey) -> Result<AccountAddress> {
        self.resolver()
            .member_state(&ctx.realm, &ctx.governing_token_mint, member)
    }
}

#[async_trait]
impl VoterWeightPlugin for LockedStakePlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::LockedStake
    }

    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    // create_voter initialises the voter and its weight record together
    async fn create_voter_weight_record(
        &self,
        ctx: &PluginContext<'_>,
        member: &Pubkey,
        payer: &Pubkey,
    ) -> Result<Option<Instruction>> {
        let resolver = self.resolver();
        let (Some(registrar), AccountAddress::Derived { address: voter, bump: voter_bump }) = (
            resolver.registrar(&ctx.realm, &ctx.governing_token_mint)?.address(),
            self.voter_address(ctx, member)?,
        ) else {
            return Ok(None);
        };
        let AccountAddress::Derived { address: record, bump: record_bump } =
            resolver.voter_weight_record(&ctx.realm, &ctx.governing_token_mint, member)?
        else {
            return Ok(None);
        };
        if ctx.exists(&voter).await? {
            return Ok(None);
        }

        let accounts = CreateVoterAccounts {
            registrar,
            voter,
            voter_authority: *member,
            voter_weight_record: record,
            payer: *payer,
        };
        build_create_voter_ix(&self.program_id, &accounts, voter_bump, record_bump).map(Some)
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
        let Some(voter_address) = self.voter_address(ctx, member)?.address() else {
            return Ok(PluginWeight::NoRecord);
        };
        let Some(account) = ctx.account(&voter_address).await? else {
            debug!(%member, "no locked stake voter");
            return Ok(PluginWeight::NoRecord);
        };
        let voter: LockedStakeVoter =
            decode_zero_copy_account(&voter_address, &account, &self.program_id, LockedStakeVoter::ACCOUNT_NAME)?;

        let clock = ctx.clock().await?;
        let weight = voter.weight(&registrar, registrar.clock_unix_timestamp(clock.unix_timestamp))?;
        Ok(PluginWeight::Resolved {
            weight,
            expiry: Some(clock.slot),
        })
    }

    async fn calculate_max_voter_weight(&self, ctx: &PluginContext<'_>, _input: Option<u64>) -> Result<PluginWeight> {
        let Some((_, registrar)) = self.load_registrar(ctx).await? else {
            return Ok(PluginWeight::NotConfigured);
        };

        let mut total = 0u64;
        for config in registrar.active_voting_mints() {
            let mint = config.mint();
            let account = ctx.required_account(&mint, "voting mint").await?;
            let supply = decode_mint(&mint, &account)?.supply;
            total = total
                .checked_add(config.max_vote_weight(supply)?)
                .ok_or(VoterWeightError::Overflow)?;
        }
        Ok(PluginWeight::resolved(total))
    }

    async fn update_voter_weight_record(
        &self,
        ctx: &PluginContext<'_>,
        request: &UpdateRequest,
    ) -> Result<Option<PendingOperations>> {
        let Some((registrar, _)) = self.load_registrar(ctx).await? else {
            return Ok(None);
        };
        if matches!(request.action, GovernanceAction::RelinquishVote { .. }) {
            return Ok(Some(PendingOperations::default()));
        }

        let voter = self
            .voter_address(ctx, &request.member)?
            .address()
            .ok_or(VoterWeightError::DerivationFailed("voter"))?;
        let record = voter_weight_record(self, ctx, &request.member)?;

        let mut pre = record_setup(self, ctx, request).await?;
        pre.push(build_update_voter_weight_record_ix(&self.program_id, &registrar, &voter, &record)?);
        Ok(Some(PendingOperations::pre(pre)))
    }
}
