use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use super::*;
use crate::{
    helpers::apply_digit_shift,
    instructions::token_voter::build_update_voter_weight_record_ix,
    state::{decode_anchor_account, decode_mint, TokenVoter, TokenVoterRegistrar},
};

/// Token deposit plugin: weight is the member's deposits across the registrar's voting mints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenVoterPlugin {
    program_id: Pubkey,
}

impl TokenVoterPlugin {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    async fn load_registrar(&self, ctx: &PluginContext<'_>) -> Result<Option<(Pubkey, TokenVoterRegistrar)>> {
        let Some((address, account)) = ctx.registrar(&self.resolver()).await? else {
            return Ok(None);
        };
        let registrar = decode_anchor_account(&address, &account, &self.program_id, TokenVoterRegistrar::ACCOUNT_NAME)?;
        Ok(Some((address, registrar)))
    }

    fn voter_address(&self, ctx: &PluginContext<'_>, member: &Pubkey) -> Result<Pubkey> {
        self.resolver()
            .member_state(&ctx.realm, &ctx.governing_token_mint, member)?
            .address()
            .ok_or(VoterWeightError::DerivationFailed("voter"))
    }
}

#[async_trait]
impl VoterWeightPlugin for TokenVoterPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::TokenDeposit
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
        let voter_address = self.voter_address(ctx, member)?;
        let Some(account) = ctx.account(&voter_address).await? else {
            debug!(%member, "no token voter");
            return Ok(PluginWeight::NoRecord);
        };
        let voter: TokenVoter = decode_anchor_account(&voter_address, &account, &self.program_id, TokenVoter::ACCOUNT_NAME)?;
        Ok(PluginWeight::resolved(voter.weight(&registrar)?))
    }

    async fn calculate_max_voter_weight(&self, ctx: &PluginContext<'_>, _input: Option<u64>) -> Result<PluginWeight> {
        let Some((_, registrar)) = self.load_registrar(ctx).await? else {
            return Ok(PluginWeight::NotConfigured);
        };
        let mut total = 0u64;
        for config in &registrar.voting_mint_configs {
            let mint = config.mint();
            let account = ctx.required_account(&mint, "voting mint").await?;
            let supply = apply_digit_shift(decode_mint(&mint, &account)?.supply, config.digit_shift)?;
            total = total.checked_add(supply).ok_or(VoterWeightError::Overflow)?;
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

        let mut pre = record_setup(self, ctx, request).await?;
        // Without a voter there is nothing to refresh: a new record starts at zero
        let voter = self.voter_address(ctx, &request.member)?;
        if ctx.exists(&voter).await? {
            let record = voter_weight_record(self, ctx, &request.member)?;
            pre.push(build_update_voter_weight_record_ix(&self.program_id, &registrar, &voter, &record)?);
        }
        Ok(Some(PendingOperations::pre(pre)))
    }
}
