// Weight Aggregator
//
// Folds a plugin chain into one weight. Plugins that read their own state are
// queried concurrently; plugins that transform the running weight run after
// them, in chain order. Results are reassembled in configuration order, never
// in completion order.
//
// Composition (`compose`): the running weight starts at zero and each
// contribution either replaces it (default) or is added to it (Additive).

use futures::future::try_join_all;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::{
    cache::AccountCache,
    errors::*,
    plugins::{PluginClient, PluginContext, PluginWeight},
    registry::{Composition, ConfiguredPlugin, PluginChain},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightContribution {
    pub plugin_name: String,
    pub program_id: Pubkey,
    pub weight: u64,
    /// Slot after which the weight must be recomputed
    pub expiry: Option<u64>,
    pub composition: Composition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculatedWeight {
    pub total_weight: u64,
    pub details: Vec<WeightContribution>,
}

impl CalculatedWeight {
    pub fn from_details(details: Vec<WeightContribution>) -> Result<Self> {
        Ok(Self {
            total_weight: compose(&details)?,
            details,
        })
    }
}

/// Total weight of an ordered list of contributions.
pub fn compose(details: &[WeightContribution]) -> Result<u64> {
    details
        .iter()
        .try_fold(0u64, |running, contribution| fold(running, contribution.weight, contribution.composition))
}

fn fold(running: u64, weight: u64, composition: Composition) -> Result<u64> {
    match composition {
        Composition::Replace => Ok(weight),
        Composition::Additive => running.checked_add(weight).ok_or(VoterWeightError::Overflow),
    }
}

#[derive(Debug, Clone, Copy)]
enum Query {
    Voter(Pubkey),
    Max,
}

pub struct WeightAggregator<'a> {
    chain: &'a PluginChain,
    ctx: PluginContext<'a>,
}

impl<'a> WeightAggregator<'a> {
    pub fn new(chain: &'a PluginChain, cache: &'a AccountCache) -> Self {
        Self {
            chain,
            ctx: chain.context(cache),
        }
    }

    pub async fn voter_weight(&self, member: &Pubkey) -> Result<CalculatedWeight> {
        let weight = self.aggregate(Query::Voter(*member)).await?;
        info!(
            realm = %self.chain.realm,
            population = %self.chain.population,
            %member,
            total = weight.total_weight,
            contributions = weight.details.len(),
            "calculated voter weight"
        );
        Ok(weight)
    }

    pub async fn max_voter_weight(&self) -> Result<CalculatedWeight> {
        let weight = self.aggregate(Query::Max).await?;
        info!(
            realm = %self.chain.realm,
            population = %self.chain.population,
            total = weight.total_weight,
            "calculated max voter weight"
        );
        Ok(weight)
    }

    async fn query(&self, client: &PluginClient, query: Query, input: Option<u64>) -> Result<PluginWeight> {
        let plugin = client.plugin();
        match query {
            Query::Voter(member) => plugin.calculate_voter_weight(&self.ctx, &member, input).await,
            Query::Max => plugin.calculate_max_voter_weight(&self.ctx, input).await,
        }
    }

    async fn vanilla(&self, query: Query) -> Result<WeightContribution> {
        let vanilla = self.chain.vanilla();
        let outcome = self.query(&vanilla, query, None).await?;
        Ok(WeightContribution {
            plugin_name: vanilla.plugin().name().to_string(),
            program_id: vanilla.plugin().program_id(),
            weight: outcome.weight().unwrap_or(0),
            expiry: outcome.expiry(),
            composition: Composition::Replace,
        })
    }

    async fn aggregate(&self, query: Query) -> Result<CalculatedWeight> {
        let plugins = &self.chain.plugins;

        // Independent plugins fan out; try_join_all keeps input order
        let queried = try_join_all(plugins.iter().map(|configured| async move {
            if configured.client.plugin().requires_input_voter_weight() {
                Ok(None)
            } else {
                self.query(&configured.client, query, None).await.map(Some)
            }
        }))
        .await?;

        let mut details: Vec<WeightContribution> = Vec::with_capacity(plugins.len());
        let mut running: Option<u64> = None;

        for (configured, queried) in plugins.iter().zip(queried) {
            let outcome = match queried {
                Some(outcome) => outcome,
                None => {
                    let input = match running {
                        Some(weight) => weight,
                        None => {
                            // Nothing upstream produced a weight: the chain starts from the raw deposit
                            let vanilla = self.vanilla(query).await?;
                            let weight = vanilla.weight;
                            details.push(vanilla);
                            running = Some(weight);
                            weight
                        }
                    };
                    self.query(&configured.client, query, Some(input)).await?
                }
            };

            let Some(contribution) = self.contribution(configured, outcome)? else {
                continue;
            };
            running = Some(fold(running.unwrap_or(0), contribution.weight, contribution.composition)?);
            details.push(contribution);
        }

        if details.is_empty() {
            debug!(realm = %self.chain.realm, population = %self.chain.population, "falling back to vanilla weight");
            details.push(self.vanilla(query).await?);
        }
        CalculatedWeight::from_details(details)
    }

    fn contribution(&self, configured: &ConfiguredPlugin, outcome: PluginWeight) -> Result<Option<WeightContribution>> {
        let plugin = configured.client.plugin();
        debug!(plugin = plugin.name(), program = %plugin.program_id(), ?outcome, "plugin outcome");

        let Some(weight) = outcome.weight() else {
            if configured.settings.required {
                return Err(VoterWeightError::ResolutionFailure {
                    plugin: plugin.name().to_string(),
                    realm: self.chain.realm,
                    mint: self.chain.governing_token_mint,
                });
            }
            warn!(plugin = plugin.name(), realm = %self.chain.realm, "plugin not configured, excluded");
            return Ok(None);
        };

        Ok(Some(WeightContribution {
            plugin_name: plugin.name().to_string(),
            program_id: plugin.program_id(),
            weight,
            expiry: outcome.expiry(),
            composition: configured.settings.composition,
        }))
    }
}
