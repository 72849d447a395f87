// Vanilla Weight Source
//
// The raw governing token deposit recorded by SPL governance in the member's
// token owner record. Used when a population has no plugins, and as the input
// of a chain whose first plugin transforms weight.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use super::*;
use crate::state::{decode_mint, Realm, TokenOwnerRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VanillaPlugin {
    governance_program_id: Pubkey,
}

impl VanillaPlugin {
    pub fn new(governance_program_id: Pubkey) -> Self {
        Self { governance_program_id }
    }
}

#[async_trait]
impl VoterWeightPlugin for VanillaPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Vanilla
    }

    fn program_id(&self) -> Pubkey {
        self.governance_program_id
    }

    async fn calculate_voter_weight(
        &self,
        ctx: &PluginContext<'_>,
        member: &Pubkey,
        _input: Option<u64>,
    ) -> Result<PluginWeight> {
        let address = ctx.token_owner_record(member)?;
        let Some(account) = ctx.account(&address).await? else {
            debug!(%member, "no token owner record");
            return Ok(PluginWeight::NoRecord);
        };
        let record = TokenOwnerRecord::decode(&address, &account, &self.governance_program_id)?;
        Ok(PluginWeight::resolved(record.governing_token_deposit_amount))
    }

    async fn calculate_max_voter_weight(&self, ctx: &PluginContext<'_>, _input: Option<u64>) -> Result<PluginWeight> {
        let mint_account = ctx
            .required_account(&ctx.governing_token_mint, "governing token mint")
            .await?;
        let supply = decode_mint(&ctx.governing_token_mint, &mint_account)?.supply;

        let realm_account = ctx
            .account(&ctx.realm)
            .await?
            .ok_or(VoterWeightError::RealmNotFound(ctx.realm))?;
        let realm = Realm::decode(&ctx.realm, &realm_account, &self.governance_program_id)?;

        // Only the community mint carries a max voter weight source
        let max = if realm.community_mint() == ctx.governing_token_mint {
            realm.config.community_mint_max_voter_weight_source.apply(supply)?
        } else {
            supply
        };
        Ok(PluginWeight::resolved(max))
    }

    async fn update_voter_weight_record(
        &self,
        _ctx: &PluginContext<'_>,
        _request: &UpdateRequest,
    ) -> Result<Option<PendingOperations>> {
        // Governance reads the token owner record directly
        Ok(Some(PendingOperations::default()))
    }
}
