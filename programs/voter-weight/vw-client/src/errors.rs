use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::config::ConfigError;
use crate::registry::Population;

#[derive(Debug, Error)]
pub enum VoterWeightError {
    // Realm / plugin configuration errors
    #[error("Plugin {plugin} is required by realm {realm} but is not configured for mint {mint}")]
    ResolutionFailure {
        plugin: String,
        realm: Pubkey,
        mint: Pubkey,
    },

    #[error("Realm {0} was not found")]
    RealmNotFound(Pubkey),

    #[error("Realm {realm} has no {population} population")]
    PopulationNotConfigured { realm: Pubkey, population: Population },

    #[error("Program {0} is not a known voter weight plugin")]
    UnknownPluginProgram(Pubkey),

    #[error("Plugin chain is deeper than the maximum of {0} plugins")]
    PluginChainTooDeep(usize),

    #[error("Plugin {0} needs an input voter weight but none was supplied")]
    MissingInputWeight(String),

    // Transport errors
    #[error("Failed to read account {address} after {attempts} attempt(s): {reason}")]
    TransportFailure {
        address: Pubkey,
        attempts: u32,
        reason: String,
    },

    #[error("Required account {label} ({address}) does not exist")]
    MissingAccount { label: &'static str, address: Pubkey },

    // Account decoding errors
    #[error("Account {address} is owned by {actual}, expected {expected}")]
    InvalidAccountOwner {
        address: Pubkey,
        expected: Pubkey,
        actual: Pubkey,
    },

    #[error("Account {0} has an unexpected discriminator")]
    InvalidDiscriminator(Pubkey),

    #[error("Failed to decode account {address}: {reason}")]
    AccountDecode { address: Pubkey, reason: String },

    #[error("Could not find a program address for {0}")]
    DerivationFailed(&'static str),

    #[error("Failed to encode {method} instruction: {reason}")]
    InstructionEncode { method: &'static str, reason: String },

    // Arithmetic errors
    #[error("Arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, VoterWeightError>;
