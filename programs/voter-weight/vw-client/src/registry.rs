// Plugin Registry
//
// Turns a realm's stored plugin configuration into an ordered chain of plugin
// clients for one governing token population. Order is taken verbatim from
// the configuration: it drives both weight composition and the submission
// order of pre-vote operations.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info};

use crate::{
    address::{self, PluginAccountResolver},
    cache::AccountCache,
    config::PipelineConfig,
    constants::MAX_PLUGIN_CHAIN_DEPTH,
    errors::*,
    plugins::{PluginClient, PluginContext, PluginKind},
    state::{decode_anchor_account, GatewayRegistrar, QuadraticRegistrar, Realm, RealmConfigAccount},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Population {
    Community,
    Council,
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Population::Community => f.write_str("community"),
            Population::Council => f.write_str("council"),
        }
    }
}

/// How a plugin's weight combines with the running weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Composition {
    /// The plugin's weight becomes the running weight
    #[default]
    Replace,
    /// The plugin's weight is added to the running weight
    Additive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginSettings {
    pub program_id: Pubkey,
    pub composition: Composition,
    /// NotConfigured aborts aggregation instead of excluding the plugin
    pub required: bool,
}

impl PluginSettings {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            composition: Composition::Replace,
            required: false,
        }
    }

    pub fn additive(mut self) -> Self {
        self.composition = Composition::Additive;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationConfig {
    pub governing_token_mint: Pubkey,
    pub plugins: Vec<PluginSettings>,
}

impl PopulationConfig {
    pub fn new(governing_token_mint: Pubkey, plugins: Vec<PluginSettings>) -> Self {
        Self {
            governing_token_mint,
            plugins,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmPluginConfig {
    pub realm: Pubkey,
    pub governance_program_id: Pubkey,
    pub community: PopulationConfig,
    pub council: Option<PopulationConfig>,
}

impl RealmPluginConfig {
    pub fn population(&self, population: Population) -> Result<&PopulationConfig> {
        match population {
            Population::Community => Ok(&self.community),
            Population::Council => self
                .council
                .as_ref()
                .ok_or(VoterWeightError::PopulationNotConfigured {
                    realm: self.realm,
                    population,
                }),
        }
    }
}

// PROGRAM DIRECTORY

/// Program id to plugin kind lookup: the known deployments plus configured extras.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDirectory {
    kinds: HashMap<Pubkey, PluginKind>,
}

impl Default for ProgramDirectory {
    fn default() -> Self {
        let kinds = PluginKind::PLUGINS
            .iter()
            .map(|kind| (kind.default_program_id(), *kind))
            .collect();
        Self { kinds }
    }
}

impl ProgramDirectory {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let mut directory = Self::default();
        for (program_id, kind) in config.plugin_program_overrides()? {
            directory.register(program_id, kind);
        }
        Ok(directory)
    }

    pub fn register(&mut self, program_id: Pubkey, kind: PluginKind) {
        self.kinds.insert(program_id, kind);
    }

    pub fn kind_of(&self, program_id: &Pubkey) -> Result<PluginKind> {
        self.kinds
            .get(program_id)
            .copied()
            .ok_or(VoterWeightError::UnknownPluginProgram(*program_id))
    }
}

// CONFIGURATION SOURCES

#[async_trait]
pub trait RealmConfigSource: Send + Sync {
    async fn load(&self, realm: &Pubkey) -> Result<RealmPluginConfig>;
}

/// Explicitly supplied realm configurations.
#[derive(Debug, Clone, Default)]
pub struct StaticRealmConfigs {
    configs: HashMap<Pubkey, RealmPluginConfig>,
}

impl StaticRealmConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, config: RealmPluginConfig) -> Self {
        self.insert(config);
        self
    }

    pub fn insert(&mut self, config: RealmPluginConfig) {
        self.configs.insert(config.realm, config);
    }
}

#[async_trait]
impl RealmConfigSource for StaticRealmConfigs {
    async fn load(&self, realm: &Pubkey) -> Result<RealmPluginConfig> {
        self.configs
            .get(realm)
            .cloned()
            .ok_or(VoterWeightError::RealmNotFound(*realm))
    }
}

/// Reads the realm and realm config accounts, then walks chained registrars
/// backwards from the configured addin to recover the full plugin order.
pub struct OnChainRealmConfig {
    cache: Arc<AccountCache>,
    directory: ProgramDirectory,
    governance_program_id: Pubkey,
    additive: HashSet<(Pubkey, Pubkey)>,
}

impl OnChainRealmConfig {
    pub fn new(
        cache: Arc<AccountCache>,
        directory: ProgramDirectory,
        governance_program_id: Pubkey,
        additive: HashSet<(Pubkey, Pubkey)>,
    ) -> Self {
        Self {
            cache,
            directory,
            governance_program_id,
            additive,
        }
    }

    async fn plugin_chain(&self, realm: &Pubkey, mint: &Pubkey, addin: Option<Pubkey>) -> Result<Vec<PluginSettings>> {
        let ctx = PluginContext::new(*realm, *mint, self.governance_program_id, &self.cache);
        let mut chain = Vec::new();
        let mut next = addin;

        while let Some(program_id) = next {
            if chain.len() == MAX_PLUGIN_CHAIN_DEPTH {
                return Err(VoterWeightError::PluginChainTooDeep(MAX_PLUGIN_CHAIN_DEPTH));
            }
            let kind = self.directory.kind_of(&program_id)?;

            let mut settings = PluginSettings::new(program_id);
            if chain.is_empty() {
                settings = settings.required();
            }
            if !kind.requires_input_voter_weight() && self.additive.contains(&(*realm, program_id)) {
                settings = settings.additive();
            }
            chain.push(settings);

            next = previous_plugin(&ctx, kind, program_id).await?;
        }

        // Walked from the last plugin backwards
        chain.reverse();
        Ok(chain)
    }
}

async fn previous_plugin(ctx: &PluginContext<'_>, kind: PluginKind, program_id: Pubkey) -> Result<Option<Pubkey>> {
    if !kind.requires_input_voter_weight() {
        return Ok(None);
    }
    let resolver = PluginAccountResolver::new(kind, program_id);
    let Some((address, account)) = ctx.registrar(&resolver).await? else {
        // Surfaces as NotConfigured for the required addin
        return Ok(None);
    };
    match kind {
        PluginKind::Quadratic => {
            let registrar: QuadraticRegistrar =
                decode_anchor_account(&address, &account, &program_id, QuadraticRegistrar::ACCOUNT_NAME)?;
            Ok(registrar.previous_plugin())
        }
        PluginKind::Gateway => {
            let registrar: GatewayRegistrar =
                decode_anchor_account(&address, &account, &program_id, GatewayRegistrar::ACCOUNT_NAME)?;
            Ok(registrar.previous_plugin())
        }
        _ => Ok(None),
    }
}

#[async_trait]
impl RealmConfigSource for OnChainRealmConfig {
    async fn load(&self, realm: &Pubkey) -> Result<RealmPluginConfig> {
        let realm_account = self
            .cache
            .get_account(realm)
            .await?
            .ok_or(VoterWeightError::RealmNotFound(*realm))?;
        let realm_state = Realm::decode(realm, &realm_account, &self.governance_program_id)?;

        let (config_address, _) = address::realm_config(&self.governance_program_id, realm)?;
        let realm_config = match self.cache.get_account(&config_address).await? {
            Some(account) => Some(RealmConfigAccount::decode(&config_address, &account, &self.governance_program_id)?),
            None => None,
        };

        let community_mint = realm_state.community_mint();
        let community_addin = realm_config
            .as_ref()
            .and_then(|config| config.community_token_config.voter_weight_addin());
        let community = PopulationConfig::new(
            community_mint,
            self.plugin_chain(realm, &community_mint, community_addin).await?,
        );

        let council = match realm_state.council_mint() {
            Some(council_mint) => {
                let council_addin = realm_config
                    .as_ref()
                    .and_then(|config| config.council_token_config.voter_weight_addin());
                Some(PopulationConfig::new(
                    council_mint,
                    self.plugin_chain(realm, &council_mint, council_addin).await?,
                ))
            }
            None => None,
        };

        debug!(
            %realm,
            community = community.plugins.len(),
            council = council.as_ref().map(|c| c.plugins.len()),
            "loaded realm plugin configuration"
        );
        Ok(RealmPluginConfig {
            realm: *realm,
            governance_program_id: self.governance_program_id,
            community,
            council,
        })
    }
}

// REGISTRY

pub struct ConfiguredPlugin {
    pub client: PluginClient,
    pub settings: PluginSettings,
}

/// Ordered plugins of one realm population, bound to their program ids.
pub struct PluginChain {
    pub realm: Pubkey,
    pub population: Population,
    pub governing_token_mint: Pubkey,
    pub governance_program_id: Pubkey,
    pub plugins: Vec<ConfiguredPlugin>,
}

impl PluginChain {
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn context<'a>(&self, cache: &'a AccountCache) -> PluginContext<'a> {
        PluginContext::new(self.realm, self.governing_token_mint, self.governance_program_id, cache)
    }

    /// The implicit raw deposit source of the population.
    pub fn vanilla(&self) -> PluginClient {
        PluginClient::new(PluginKind::Vanilla, self.governance_program_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    directory: ProgramDirectory,
}

impl PluginRegistry {
    pub fn new(directory: ProgramDirectory) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &ProgramDirectory {
        &self.directory
    }

    pub fn build(&self, config: &RealmPluginConfig, population: Population) -> Result<PluginChain> {
        let population_config = config.population(population)?;

        let plugins = population_config
            .plugins
            .iter()
            .map(|settings| {
                let kind = self.directory.kind_of(&settings.program_id)?;
                let mut settings = *settings;
                // A transform always replaces the weight it was fed
                if kind.requires_input_voter_weight() {
                    settings.composition = Composition::Replace;
                }
                Ok(ConfiguredPlugin {
                    client: PluginClient::new(kind, settings.program_id),
                    settings,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            realm = %config.realm,
            %population,
            plugins = ?plugins.iter().map(|p| p.client.plugin().name()).collect::<Vec<_>>(),
            "built plugin chain"
        );
        Ok(PluginChain {
            realm: config.realm,
            population,
            governing_token_mint: population_config.governing_token_mint,
            governance_program_id: config.governance_program_id,
            plugins,
        })
    }
}
