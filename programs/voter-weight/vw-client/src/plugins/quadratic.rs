// Quadratic Plugin
//
// Pure transform of the running weight through the registrar's coefficients.
// Reads no member state of its own.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use super::*;
use crate::{
    instructions::chained::build_quadratic_update_ix,
    state::{decode_anchor_account, QuadraticRegistrar},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadraticPlugin {
    program_id: Pubkey,
}

impl QuadraticPlugin {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub(crate) async fn load_registrar(&self, ctx: &PluginContext<'_>) -> Result<Option<(Pubkey, QuadraticRegistrar)>> {
        let Some((address, account)) = ctx.registrar(&self.resolver()).await? else {
            return Ok(None);
        };
        let registrar = decode_anchor_account(&address, &account, &self.program_id, QuadraticRegistrar::ACCOUNT_NAME)?;
        Ok(Some((address, registrar)))
    }
}

#[async_trait]
impl VoterWeightPlugin for QuadraticPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Quadratic
    }

    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn calculate_voter_weight(
        &self,
        ctx: &PluginContext<'_>,
        _member: &Pubkey,
        input: Option<u64>,
    ) -> Result<PluginWeight> {
        let Some((_, registrar)) = self.load_registrar(ctx).await? else {
            return Ok(PluginWeight::NotConfigured);
        };
        let input = required_input(self, input)?;
        Ok(PluginWeight::resolved(registrar.quadratic_coefficients.apply(input)))
    }

    async fn calculate_max_voter_weight(&self, ctx: &PluginContext<'_>, input: Option<u64>) -> Result<PluginWeight> {
        self.calculate_voter_weight(ctx, &Pubkey::default(), input).await
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

        let record = voter_weight_record(self, ctx, &request.member)?;
        let mut pre = record_setup(self, ctx, request).await?;
        pre.push(build_quadratic_update_ix(&self.program_id, &registrar, &request.input_record, &record)?);
        Ok(Some(PendingOperations::pre(pre)))
    }
}
