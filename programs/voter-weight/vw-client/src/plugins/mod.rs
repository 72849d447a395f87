// Voter Weight Plugins
//
// One adapter per plugin kind behind the `VoterWeightPlugin` capability.
// Adapters are dispatched through the closed `PluginClient` enum, chosen once
// by program id when the registry builds a realm's plugin chain.
//
// Outcomes of a weight query:
// - Resolved      the plugin produced a weight (possibly zero)
// - NoRecord      configured, but the member never interacted with the plugin
// - NotConfigured the realm has no registrar for this plugin

pub mod gateway;
pub mod locked_stake;
pub mod nft;
pub mod quadratic;
pub mod token_haver;
pub mod token_voter;
pub mod vanilla;

pub use gateway::GatewayPlugin;
pub use locked_stake::LockedStakePlugin;
pub use nft::NftPlugin;
pub use quadratic::QuadraticPlugin;
pub use token_haver::TokenHaverPlugin;
pub use token_voter::TokenVoterPlugin;
pub use vanilla::VanillaPlugin;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

use crate::{
    address::{self, AccountAddress, PluginAccountResolver},
    assembler::GovernanceAction,
    cache::{AccountCache, AccountData},
    constants::*,
    errors::*,
    instructions::{build_create_max_voter_weight_record_ix, build_create_voter_weight_record_ix, RecordAccounts},
    state::ChainClock,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginKind {
    /// Raw governing token deposit held by SPL governance
    Vanilla,
    LockedStake,
    NftHolding,
    TokenDeposit,
    Quadratic,
    Gateway,
    TokenHaver,
}

impl PluginKind {
    /// Kinds deployed as standalone plugin programs
    pub const PLUGINS: [PluginKind; 6] = [
        PluginKind::LockedStake,
        PluginKind::NftHolding,
        PluginKind::TokenDeposit,
        PluginKind::Quadratic,
        PluginKind::Gateway,
        PluginKind::TokenHaver,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PluginKind::Vanilla => VANILLA_PLUGIN_NAME,
            PluginKind::LockedStake => "locked-stake",
            PluginKind::NftHolding => "nft-holding",
            PluginKind::TokenDeposit => "token-deposit",
            PluginKind::Quadratic => "quadratic",
            PluginKind::Gateway => "gateway",
            PluginKind::TokenHaver => "token-haver",
        }
    }

    pub fn default_program_id(&self) -> Pubkey {
        match self {
            PluginKind::Vanilla => GOVERNANCE_PROGRAM_ID,
            PluginKind::LockedStake => LOCKED_STAKE_PROGRAM_ID,
            PluginKind::NftHolding => NFT_VOTER_PROGRAM_ID,
            PluginKind::TokenDeposit => TOKEN_VOTER_PROGRAM_ID,
            PluginKind::Quadratic => QUADRATIC_PROGRAM_ID,
            PluginKind::Gateway => GATEWAY_PLUGIN_PROGRAM_ID,
            PluginKind::TokenHaver => TOKEN_HAVER_PROGRAM_ID,
        }
    }

    /// Transforms the previous plugin's weight instead of reading its own
    pub fn requires_input_voter_weight(&self) -> bool {
        matches!(self, PluginKind::Quadratic | PluginKind::Gateway)
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginWeight {
    Resolved { weight: u64, expiry: Option<u64> },
    NoRecord,
    NotConfigured,
}

impl PluginWeight {
    pub fn resolved(weight: u64) -> Self {
        PluginWeight::Resolved { weight, expiry: None }
    }

    /// Weight this outcome contributes; `None` for NotConfigured.
    pub fn weight(&self) -> Option<u64> {
        match self {
            PluginWeight::Resolved { weight, .. } => Some(*weight),
            PluginWeight::NoRecord => Some(0),
            PluginWeight::NotConfigured => None,
        }
    }

    pub fn expiry(&self) -> Option<u64> {
        match self {
            PluginWeight::Resolved { expiry, .. } => *expiry,
            _ => None,
        }
    }
}

/// Operations one plugin emits around a governance action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingOperations {
    pub pre: Vec<Instruction>,
    pub post: Vec<Instruction>,
}

impl PendingOperations {
    pub fn pre(pre: Vec<Instruction>) -> Self {
        Self { pre, post: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRequest {
    pub member: Pubkey,
    pub payer: Pubkey,
    pub action: GovernanceAction,
    /// Weight record of the previous plugin, or the member's token owner record
    pub input_record: Pubkey,
}

/// Realm scoped view every plugin query runs against.
pub struct PluginContext<'a> {
    pub realm: Pubkey,
    pub governing_token_mint: Pubkey,
    pub governance_program_id: Pubkey,
    pub cache: &'a AccountCache,
}

impl<'a> PluginContext<'a> {
    pub fn new(realm: Pubkey, governing_token_mint: Pubkey, governance_program_id: Pubkey, cache: &'a AccountCache) -> Self {
        Self {
            realm,
            governing_token_mint,
            governance_program_id,
            cache,
        }
    }

    pub async fn account(&self, address: &Pubkey) -> Result<Option<Arc<AccountData>>> {
        self.cache.get_account(address).await
    }

    pub async fn exists(&self, address: &Pubkey) -> Result<bool> {
        self.cache.account_exists(address).await
    }

    pub async fn required_account(&self, address: &Pubkey, label: &'static str) -> Result<Arc<AccountData>> {
        self.account(address).await?.ok_or(VoterWeightError::MissingAccount {
            label,
            address: *address,
        })
    }

    pub async fn clock(&self) -> Result<ChainClock> {
        let account = self.required_account(&CLOCK_SYSVAR_ID, "clock sysvar").await?;
        ChainClock::decode(&account)
    }

    pub fn token_owner_record(&self, member: &Pubkey) -> Result<Pubkey> {
        address::token_owner_record(&self.governance_program_id, &self.realm, &self.governing_token_mint, member)
            .map(|(address, _)| address)
    }

    /// Registrar address and account, `None` when the plugin is not configured for the realm.
    pub async fn registrar(&self, resolver: &PluginAccountResolver) -> Result<Option<(Pubkey, Arc<AccountData>)>> {
        let Some(address) = resolver.registrar(&self.realm, &self.governing_token_mint)?.address() else {
            return Ok(None);
        };
        Ok(self.account(&address).await?.map(|account| (address, account)))
    }
}

#[async_trait]
pub trait VoterWeightPlugin: Send + Sync {
    fn kind(&self) -> PluginKind;

    fn program_id(&self) -> Pubkey;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn requires_input_voter_weight(&self) -> bool {
        self.kind().requires_input_voter_weight()
    }

    fn resolver(&self) -> PluginAccountResolver {
        PluginAccountResolver::new(self.kind(), self.program_id())
    }

    fn registrar_address(&self, realm: &Pubkey, mint: &Pubkey) -> Result<AccountAddress> {
        self.resolver().registrar(realm, mint)
    }

    fn max_voter_weight_record_address(&self, realm: &Pubkey, mint: &Pubkey) -> Result<AccountAddress> {
        self.resolver().max_voter_weight_record(realm, mint)
    }

    fn voter_weight_record_address(&self, realm: &Pubkey, mint: &Pubkey, member: &Pubkey) -> Result<AccountAddress> {
        self.resolver().voter_weight_record(realm, mint, member)
    }

    /// `None` when the record already exists or the kind keeps no record.
    async fn create_voter_weight_record(
        &self,
        ctx: &PluginContext<'_>,
        member: &Pubkey,
        payer: &Pubkey,
    ) -> Result<Option<Instruction>> {
        create_voter_weight_record_if_missing(ctx, &self.resolver(), member, payer).await
    }

    async fn create_max_voter_weight_record(&self, ctx: &PluginContext<'_>, payer: &Pubkey) -> Result<Option<Instruction>> {
        create_max_voter_weight_record_if_missing(ctx, &self.resolver(), payer).await
    }

    /// Read only. `input` is the running weight for plugins that require it.
    async fn calculate_voter_weight(
        &self,
        ctx: &PluginContext<'_>,
        member: &Pubkey,
        input: Option<u64>,
    ) -> Result<PluginWeight>;

    async fn calculate_max_voter_weight(&self, ctx: &PluginContext<'_>, input: Option<u64>) -> Result<PluginWeight>;

    /// `None` when the plugin is not configured for the realm.
    async fn update_voter_weight_record(
        &self,
        ctx: &PluginContext<'_>,
        request: &UpdateRequest,
    ) -> Result<Option<PendingOperations>>;
}

/// Closed set of adapters, one variant per plugin kind.
pub enum PluginClient {
    Vanilla(VanillaPlugin),
    LockedStake(LockedStakePlugin),
    Nft(NftPlugin),
    TokenVoter(TokenVoterPlugin),
    Quadratic(QuadraticPlugin),
    Gateway(GatewayPlugin),
    TokenHaver(TokenHaverPlugin),
}

impl PluginClient {
    pub fn new(kind: PluginKind, program_id: Pubkey) -> Self {
        match kind {
            PluginKind::Vanilla => PluginClient::Vanilla(VanillaPlugin::new(program_id)),
            PluginKind::LockedStake => PluginClient::LockedStake(LockedStakePlugin::new(program_id)),
            PluginKind::NftHolding => PluginClient::Nft(NftPlugin::new(program_id)),
            PluginKind::TokenDeposit => PluginClient::TokenVoter(TokenVoterPlugin::new(program_id)),
            PluginKind::Quadratic => PluginClient::Quadratic(QuadraticPlugin::new(program_id)),
            PluginKind::Gateway => PluginClient::Gateway(GatewayPlugin::new(program_id)),
            PluginKind::TokenHaver => PluginClient::TokenHaver(TokenHaverPlugin::new(program_id)),
        }
    }

    pub fn plugin(&self) -> &dyn VoterWeightPlugin {
        match self {
            PluginClient::Vanilla(plugin) => plugin,
            PluginClient::LockedStake(plugin) => plugin,
            PluginClient::Nft(plugin) => plugin,
            PluginClient::TokenVoter(plugin) => plugin,
            PluginClient::Quadratic(plugin) => plugin,
            PluginClient::Gateway(plugin) => plugin,
            PluginClient::TokenHaver(plugin) => plugin,
        }
    }
}

// SHARED ADAPTER HELPERS

pub(crate) async fn create_voter_weight_record_if_missing(
    ctx: &PluginContext<'_>,
    resolver: &PluginAccountResolver,
    member: &Pubkey,
    payer: &Pubkey,
) -> Result<Option<Instruction>> {
    let Some(record) = resolver
        .voter_weight_record(&ctx.realm, &ctx.governing_token_mint, member)?
        .address()
    else {
        return Ok(None);
    };
    if ctx.exists(&record).await? {
        return Ok(None);
    }
    let Some(accounts) = record_accounts(ctx, resolver, record, payer)? else {
        return Ok(None);
    };
    build_create_voter_weight_record_ix(&resolver.program_id(), &accounts, member).map(Some)
}

pub(crate) async fn create_max_voter_weight_record_if_missing(
    ctx: &PluginContext<'_>,
    resolver: &PluginAccountResolver,
    payer: &Pubkey,
) -> Result<Option<Instruction>> {
    let Some(record) = resolver
        .max_voter_weight_record(&ctx.realm, &ctx.governing_token_mint)?
        .address()
    else {
        return Ok(None);
    };
    if ctx.exists(&record).await? {
        return Ok(None);
    }
    let Some(accounts) = record_accounts(ctx, resolver, record, payer)? else {
        return Ok(None);
    };
    build_create_max_voter_weight_record_ix(&resolver.program_id(), &accounts).map(Some)
}

fn record_accounts(
    ctx: &PluginContext<'_>,
    resolver: &PluginAccountResolver,
    record: Pubkey,
    payer: &Pubkey,
) -> Result<Option<RecordAccounts>> {
    let Some(registrar) = resolver.registrar(&ctx.realm, &ctx.governing_token_mint)?.address() else {
        return Ok(None);
    };
    Ok(Some(RecordAccounts {
        registrar,
        record,
        realm: ctx.realm,
        governing_token_mint: ctx.governing_token_mint,
        payer: *payer,
    }))
}

/// Record creation that has to precede a weight update: the max record
/// (cast vote only) followed by the member's voter weight record.
pub(crate) async fn record_setup(
    plugin: &dyn VoterWeightPlugin,
    ctx: &PluginContext<'_>,
    request: &UpdateRequest,
) -> Result<Vec<Instruction>> {
    let mut pre = Vec::new();
    if matches!(request.action, GovernanceAction::CastVote { .. }) {
        pre.extend(plugin.create_max_voter_weight_record(ctx, &request.payer).await?);
    }
    pre.extend(
        plugin
            .create_voter_weight_record(ctx, &request.member, &request.payer)
            .await?,
    );
    Ok(pre)
}

pub(crate) fn required_input(plugin: &dyn VoterWeightPlugin, input: Option<u64>) -> Result<u64> {
    input.ok_or_else(|| VoterWeightError::MissingInputWeight(plugin.name().to_string()))
}

pub(crate) fn voter_weight_record(
    plugin: &dyn VoterWeightPlugin,
    ctx: &PluginContext<'_>,
    member: &Pubkey,
) -> Result<Pubkey> {
    plugin
        .voter_weight_record_address(&ctx.realm, &ctx.governing_token_mint, member)?
        .address()
        .ok_or(VoterWeightError::DerivationFailed("voter weight record"))
}
