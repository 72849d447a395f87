// Voter Weight Service
//
// Query surface for the UI layer. Every call resolves the realm configuration,
// builds the plugin chain for the population and runs the aggregator or the
// assembler over the shared account cache.
//
// The selection guard tags computations with the (realm, population, member)
// they were started for. A computation whose key is no longer selected when
// it finishes, or that is overtaken while still reading, is discarded and
// never published.

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info};

use crate::{
    aggregator::{CalculatedWeight, WeightAggregator},
    assembler::{GovernanceAction, InstructionAssembler, OperationBatches, PendingOperationSet},
    cache::{AccountCache, AccountFetcher},
    config::PipelineConfig,
    errors::*,
    registry::{OnChainRealmConfig, PluginChain, PluginRegistry, Population, ProgramDirectory, RealmConfigSource},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComputationKey {
    pub realm: Pubkey,
    pub population: Population,
    pub member: Pubkey,
}

impl ComputationKey {
    pub fn new(realm: Pubkey, population: Population, member: Pubkey) -> Self {
        Self {
            realm,
            population,
            member,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tracked<T> {
    /// Result for the key that is still selected
    Current(T),
    /// The selection moved on; the result was dropped
    Superseded,
}

pub struct VoterWeightService {
    cache: Arc<AccountCache>,
    configs: Arc<dyn RealmConfigSource>,
    registry: PluginRegistry,
    max_instructions_per_batch: usize,
    selection: watch::Sender<Option<ComputationKey>>,
    published: RwLock<Option<(ComputationKey, CalculatedWeight)>>,
}

impl VoterWeightService {
    pub fn new(
        cache: Arc<AccountCache>,
        configs: Arc<dyn RealmConfigSource>,
        registry: PluginRegistry,
        max_instructions_per_batch: usize,
    ) -> Self {
        let (selection, _) = watch::channel(None);
        Self {
            cache,
            configs,
            registry,
            max_instructions_per_batch,
            selection,
            published: RwLock::new(None),
        }
    }

    /// Service reading realm configuration from chain through `fetcher`.
    pub fn from_config(config: &PipelineConfig, fetcher: Arc<dyn AccountFetcher>) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(AccountCache::new(&config.rpc_endpoint, fetcher, config.retry));
        let directory = ProgramDirectory::from_config(config)?;
        let configs = OnChainRealmConfig::new(
            cache.clone(),
            directory.clone(),
            config.governance_program()?,
            config.additive_set()?,
        );

        info!(endpoint = %config.rpc_endpoint, "voter weight service ready");
        Ok(Self::new(
            cache,
            Arc::new(configs),
            PluginRegistry::new(directory),
            config.max_instructions_per_batch,
        ))
    }

    pub fn cache(&self) -> &Arc<AccountCache> {
        &self.cache
    }

    async fn chain(&self, realm: &Pubkey, population: Population) -> Result<PluginChain> {
        let config = self.configs.load(realm).await?;
        self.registry.build(&config, population)
    }

    pub async fn get_calculated_weight(
        &self,
        realm: &Pubkey,
        population: Population,
        member: &Pubkey,
    ) -> Result<CalculatedWeight> {
        let chain = self.chain(realm, population).await?;
        WeightAggregator::new(&chain, &self.cache).voter_weight(member).await
    }

    pub async fn get_calculated_max_weight(&self, realm: &Pubkey, population: Population) -> Result<CalculatedWeight> {
        let chain = self.chain(realm, population).await?;
        WeightAggregator::new(&chain, &self.cache).max_voter_weight().await
    }

    /// Operations for `member`, who also pays for any account creation.
    pub async fn get_pre_vote_operations(
        &self,
        realm: &Pubkey,
        population: Population,
        member: &Pubkey,
        action: GovernanceAction,
    ) -> Result<PendingOperationSet> {
        self.assemble(realm, population, member, member, action).await
    }

    pub async fn get_pre_vote_batches(
        &self,
        realm: &Pubkey,
        population: Population,
        member: &Pubkey,
        action: GovernanceAction,
        payer: &Pubkey,
    ) -> Result<OperationBatches> {
        let set = self.assemble(realm, population, member, payer, action).await?;
        Ok(set.into_batches(self.max_instructions_per_batch))
    }

    async fn assemble(
        &self,
        realm: &Pubkey,
        population: Population,
        member: &Pubkey,
        payer: &Pubkey,
        action: GovernanceAction,
    ) -> Result<PendingOperationSet> {
        let chain = self.chain(realm, population).await?;
        InstructionAssembler::new(&chain, &self.cache)
            .assemble(member, payer, action)
            .await
    }

    // SELECTION

    pub fn select(&self, key: ComputationKey) {
        debug!(realm = %key.realm, population = %key.population, member = %key.member, "selection changed");
        self.selection.send_replace(Some(key));
    }

    pub fn selected(&self) -> Option<ComputationKey> {
        *self.selection.borrow()
    }

    /// Computes the weight for the current selection and publishes it, unless
    /// the selection changes first. In-flight reads are dropped on change.
    pub async fn refresh_selected_weight(&self) -> Result<Tracked<CalculatedWeight>> {
        let mut changes = self.selection.subscribe();
        let Some(key) = *changes.borrow_and_update() else {
            return Ok(Tracked::Superseded);
        };

        let computation = self.get_calculated_weight(&key.realm, key.population, &key.member);
        tokio::pin!(computation);

        let result = loop {
            tokio::select! {
                result = &mut computation => break result,
                changed = changes.changed() => {
                    if changed.is_ok() && *changes.borrow_and_update() != Some(key) {
                        debug!(member = %key.member, "dropping stale weight computation");
                        return Ok(Tracked::Superseded);
                    }
                }
            }
        };

        // Checked under the write guard so a newer selection's publish cannot
        // land between the check and the assignment
        let mut published = self.published.write().await;
        if self.selected() != Some(key) {
            return Ok(Tracked::Superseded);
        }
        let weight = result?;
        *published = Some((key, weight.clone()));
        Ok(Tracked::Current(weight))
    }

    /// Last weight published for a selected key.
    pub async fn published_weight(&self) -> Option<(ComputationKey, CalculatedWeight)> {
        self.published.read().await.clone()
    }
}
