use async_trait::async_trait;
use futures::future::try_join_all;
use solana_sdk::pubkey::Pubkey;

use super::*;
use crate::{
    instructions::token_haver::build_update_voter_weight_record_ix,
    state::{decode_anchor_account, decode_token_account, TokenHaverRegistrar},
};

/// One vote per registrar mint the member holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHaverPlugin {
    program_id: Pubkey,
}

/// Member's associated token accounts for the registrar mints.
struct Holdings {
    any_account: bool,
    held: Vec<Pubkey>,
}

impl TokenHaverPlugin {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    async fn load_registrar(&self, ctx: &PluginContext<'_>) -> Result<Option<(Pubkey, TokenHaverRegistrar)>> {
        let Some((address, account)) = ctx.registrar(&self.resolver()).await? else {
            return Ok(None);
        };
        let registrar = decode_anchor_account(&address, &account, &self.program_id, TokenHaverRegistrar::ACCOUNT_NAME)?;
        Ok(Some((address, registrar)))
    }

    async fn holdings(&self, ctx: &PluginContext<'_>, registrar: &TokenHaverRegistrar, member: &Pubkey) -> Result<Holdings> {
        let token_accounts: Vec<Pubkey> = registrar
            .mints()
            .iter()
            .map(|mint| address::associated_token_account(member, mint))
            .collect();
        let accounts = try_join_all(token_accounts.iter().map(|token_account| ctx.account(token_account))).await?;

        let mut holdings = Holdings {
            any_account: false,
            held: Vec::new(),
        };
        for (token_account, account) in token_accounts.iter().zip(accounts) {
            let Some(account) = account else { continue };
            holdings.any_account = true;
            let token = decode_token_account(token_account, &account)?;
            // Frozen balances cannot be moved and do not count
            if token.amount > 0 && !token.is_frozen() {
                holdings.held.push(*token_account);
            }
        }
        Ok(holdings)
    }
}

#[async_trait]
impl VoterWeightPlugin for TokenHaverPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::TokenHaver
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
        let holdings = self.holdings(ctx, &registrar, member).await?;
        if !holdings.any_account {
            return Ok(PluginWeight::NoRecord);
        }
        Ok(PluginWeight::resolved(holdings.held.len() as u64))
    }

    async fn calculate_max_voter_weight(&self, ctx: &PluginContext<'_>, _input: Option<u64>) -> Result<PluginWeight> {
        let Some((_, registrar)) = self.load_registrar(ctx).await? else {
            return Ok(PluginWeight::NotConfigured);
        };
        Ok(PluginWeight::resolved(registrar.mints.len() as u64))
    }

    async fn update_voter_weight_record(
        &self,
        ctx: &PluginContext<'_>,
        request: &UpdateRequest,
    ) -> Result<Option<PendingOperations>> {
        let Some((registrar_address, registrar)) = self.load_registrar(ctx).await? else {
            return Ok(None);
        };
        if matches!(request.action, GovernanceAction::RelinquishVote { .. }) {
            return Ok(Some(PendingOperations::default()));
        }

        let holdings = self.holdings(ctx, &registrar, &request.member).await?;
        let record = voter_weight_record(self, ctx, &request.member)?;
        let mut pre = record_setup(self, ctx, request).await?;
        pre.push(build_update_voter_weight_record_ix(
            &self.program_id,
            &registrar_address,
            &record,
            &holdings.held,
        )?);
        Ok(Some(PendingOperations::pre(pre)))
    }
}
