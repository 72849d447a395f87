// Voter Weight Client
//
// Off-chain voter weight plugin pipeline for SPL governance realms.
//
// Operations:
// - get_calculated_weight: fold a realm population's plugin chain into one weight
// - get_calculated_max_weight: the same fold over each plugin's max voter weight
// - get_pre_vote_operations: weight record updates to submit before a governance action
// - get_pre_vote_batches: those operations chunked into transactions, order preserved
// - select / refresh_selected_weight: weight for the selected member, stale results dropped

pub mod address;
pub mod aggregator;
pub mod assembler;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod helpers;
pub mod instructions;
pub mod plugins;
pub mod registry;
pub mod service;
pub mod state;

pub use aggregator::{compose, CalculatedWeight, WeightAggregator, WeightContribution};
pub use assembler::{GovernanceAction, InstructionAssembler, OperationBatches, PendingOperationSet};
pub use cache::{AccountCache, AccountData, AccountFetcher, MemoryLedger, OwnedAsset};
pub use config::{PipelineConfig, RetryPolicy};
pub use errors::{Result, VoterWeightError};
pub use plugins::{PluginClient, PluginKind, PluginWeight, VoterWeightPlugin};
pub use registry::{
    Composition, OnChainRealmConfig, PluginRegistry, PluginSettings, Population, PopulationConfig, ProgramDirectory,
    RealmConfigSource, RealmPluginConfig, StaticRealmConfigs,
};
pub use service::{ComputationKey, Tracked, VoterWeightService};
