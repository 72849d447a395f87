// Gateway Plugin
//
// Gates the running weight on a Civic pass: members with a valid pass keep
// their input weight, everyone else drops to zero.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use super::*;
use crate::{
    instructions::chained::build_gateway_update_ix,
    state::{decode_anchor_account, GatewayRegistrar, GatewayToken},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayPlugin {
    program_id: Pubkey,
}

impl GatewayPlugin {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub(crate) async fn load_registrar(&self, ctx: &PluginContext<'_>) -> Result<Option<(Pubkey, GatewayRegistrar)>> {
        let Some((address, account)) = ctx.registrar(&self.resolver()).await? else {
            return Ok(None);
        };
        let registrar = decode_anchor_account(&address, &account, &self.program_id, GatewayRegistrar::ACCOUNT_NAME)?;
        Ok(Some((address, registrar)))
    }
}

#[async_trait]
impl VoterWeightPlugin for GatewayPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Gateway
    }

    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn calculate_voter_weight(
        &self,
        ctx: &PluginContext<'_>,
        member: &Pubkey,
        input: Option<u64>,
    ) -> Result<PluginWeight> {
        let Some((_, registrar)) = self.load_registrar(ctx).await? else {
            return Ok(PluginWeight::NotConfigured);
        };
        let input = required_input(self, input)?;

        let network = registrar.gatekeeper_network();
        let (pass_address, _) = address::gateway_token(member, &network)?;
        let Some(account) = ctx.account(&pass_address).await? else {
            debug!(%member, "no gateway pass");
            return Ok(PluginWeight::NoRecord);
        };
        let pass = GatewayToken::decode(&pass_address, &account)?;
        let now = ctx.clock().await?.unix_timestamp;

        let weight = if pass.is_valid_for(member, &network, now) { input } else { 0 };
        Ok(PluginWeight::resolved(weight))
    }

    // Passes do not limit the population, the max weight flows through
    async fn calculate_max_voter_weight(&self, ctx: &PluginContext<'_>, input: Option<u64>) -> Result<PluginWeight> {
        if self.load_registrar(ctx).await?.is_none() {
            return Ok(PluginWeight::NotConfigured);
        }
        Ok(PluginWeight::resolved(required_input(self, input)?))
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

        let (pass, _) = address::gateway_token(&request.member, &registrar.gatekeeper_network())?;
        let record = voter_weight_record(self, ctx, &request.member)?;
        let mut pre = record_setup(self, ctx, request).await?;
        pre.push(build_gateway_update_ix(
            &self.program_id,
            &registrar_address,
            &request.input_record,
            &pass,
            &record,
        )?);
        Ok(Some(PendingOperations::pre(pre)))
    }
}
