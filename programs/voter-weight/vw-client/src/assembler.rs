// Instruction Assembler
//
// Collects every plugin's weight record updates for a governance action and
// linearises them: all `pre` operations in plugin order, then all `post`
// operations in plugin order. Any plugin failure fails the whole assembly so
// a partial set is never handed to the submission layer.

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::{debug, info, warn};

use crate::{
    cache::AccountCache,
    errors::*,
    plugins::{PluginContext, UpdateRequest},
    registry::PluginChain,
    state::VoterWeightAction,
};

/// Governance instruction the pending operations prepare for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernanceAction {
    CastVote { proposal: Pubkey },
    CommentProposal { proposal: Pubkey },
    CreateGovernance,
    CreateProposal { governance: Pubkey },
    SignOffProposal { proposal: Pubkey },
    RelinquishVote { governance: Pubkey, proposal: Pubkey },
}

impl GovernanceAction {
    /// Action recorded on the voter weight record; relinquishing needs none.
    pub fn weight_action(&self) -> Option<VoterWeightAction> {
        match self {
            GovernanceAction::CastVote { .. } => Some(VoterWeightAction::CastVote),
            GovernanceAction::CommentProposal { .. } => Some(VoterWeightAction::CommentProposal),
            GovernanceAction::CreateGovernance => Some(VoterWeightAction::CreateGovernance),
            GovernanceAction::CreateProposal { .. } => Some(VoterWeightAction::CreateProposal),
            GovernanceAction::SignOffProposal { .. } => Some(VoterWeightAction::SignOffProposal),
            GovernanceAction::RelinquishVote { .. } => None,
        }
    }

    pub fn target(&self) -> Option<Pubkey> {
        match self {
            GovernanceAction::CastVote { proposal }
            | GovernanceAction::CommentProposal { proposal }
            | GovernanceAction::SignOffProposal { proposal }
            | GovernanceAction::RelinquishVote { proposal, .. } => Some(*proposal),
            GovernanceAction::CreateProposal { governance } => Some(*governance),
            GovernanceAction::CreateGovernance => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingOperationSet {
    /// Submitted before the governance instruction
    pub pre: Vec<Instruction>,
    /// Submitted after it
    pub post: Vec<Instruction>,
}

/// Operations split into transactions of at most `max_per_batch` instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationBatches {
    pub pre: Vec<Vec<Instruction>>,
    pub post: Vec<Vec<Instruction>>,
}

impl PendingOperationSet {
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pre.len() + self.post.len()
    }

    /// Chunks preserve order: batch i only holds operations that come before those of batch i + 1.
    pub fn into_batches(self, max_per_batch: usize) -> OperationBatches {
        let size = max_per_batch.max(1);
        OperationBatches {
            pre: self.pre.chunks(size).map(<[Instruction]>::to_vec).collect(),
            post: self.post.chunks(size).map(<[Instruction]>::to_vec).collect(),
        }
    }
}

pub struct InstructionAssembler<'a> {
    chain: &'a PluginChain,
    ctx: PluginContext<'a>,
}

impl<'a> InstructionAssembler<'a> {
    pub fn new(chain: &'a PluginChain, cache: &'a AccountCache) -> Self {
        Self {
            chain,
            ctx: chain.context(cache),
        }
    }

    pub async fn assemble(&self, member: &Pubkey, payer: &Pubkey, action: GovernanceAction) -> Result<PendingOperationSet> {
        let mut set = PendingOperationSet::default();
        let mut posts = Vec::new();
        // The first plugin reads the member's token owner record
        let mut input_record = self.ctx.token_owner_record(member)?;

        for configured in &self.chain.plugins {
            let plugin = configured.client.plugin();
            let request = UpdateRequest {
                member: *member,
                payer: *payer,
                action,
                input_record,
            };

            let Some(ops) = plugin.update_voter_weight_record(&self.ctx, &request).await? else {
                if configured.settings.required {
                    return Err(VoterWeightError::ResolutionFailure {
                        plugin: plugin.name().to_string(),
                        realm: self.chain.realm,
                        mint: self.chain.governing_token_mint,
                    });
                }
                warn!(plugin = plugin.name(), realm = %self.chain.realm, "plugin not configured, no operations");
                continue;
            };
            debug!(plugin = plugin.name(), pre = ops.pre.len(), post = ops.post.len(), "plugin operations");

            set.pre.extend(ops.pre);
            posts.push(ops.post);

            if let Some(record) = plugin
                .voter_weight_record_address(&self.chain.realm, &self.chain.governing_token_mint, member)?
                .address()
            {
                input_record = record;
            }
        }
        set.post = posts.into_iter().flatten().collect();

        info!(
            realm = %self.chain.realm,
            population = %self.chain.population,
            %member,
            ?action,
            pre = set.pre.len(),
            post = set.post.len(),
            "assembled pre-vote operations"
        );
        Ok(set)
    }
}
