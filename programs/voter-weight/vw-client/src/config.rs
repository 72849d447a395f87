// Pipeline Configuration
//
// Loaded from TOML. Everything has a default so an empty document is a valid
// mainnet configuration; the file only needs to list extra plugin deployments
// and realm specific additive plugins.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::constants::*;
use crate::plugins::PluginKind;

pub const CONFIG_PATH_ENV: &str = "VOTER_WEIGHT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid pubkey for {field}: {value}")]
    InvalidPubkey { field: &'static str, value: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff_ms: 0,
        }
    }

    /// Linear backoff before retrying after `attempt` failures.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(attempt as u64))
    }
}

/// Extra deployment of a known plugin kind under a different program id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginProgramEntry {
    pub program_id: String,
    pub kind: PluginKind,
}

/// Plugin whose weight is summed with its predecessor for one realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditivePluginEntry {
    pub realm: String,
    pub program_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub rpc_endpoint: String,
    #[serde(default = "default_governance_program_id")]
    pub governance_program_id: String,
    #[serde(default = "default_max_instructions_per_batch")]
    pub max_instructions_per_batch: usize,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub plugin_programs: Vec<PluginProgramEntry>,
    #[serde(default)]
    pub additive_plugins: Vec<AdditivePluginEntry>,
}

fn default_rpc_endpoint() -> String {
    DEFAULT_RPC_ENDPOINT.to_string()
}

fn default_governance_program_id() -> String {
    GOVERNANCE_PROGRAM_ID.to_string()
}

fn default_max_instructions_per_batch() -> usize {
    DEFAULT_MAX_INSTRUCTIONS_PER_BATCH
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: default_rpc_endpoint(),
            governance_program_id: default_governance_program_id(),
            max_instructions_per_batch: default_max_instructions_per_batch(),
            retry: RetryPolicy::default(),
            plugin_programs: Vec::new(),
            additive_plugins: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reads the file named by `VOTER_WEIGHT_CONFIG`, or falls back to defaults
    /// when the variable is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_instructions_per_batch == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_instructions_per_batch",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        self.governance_program()?;
        self.plugin_program_overrides()?;
        self.additive_set()?;
        Ok(())
    }

    pub fn governance_program(&self) -> Result<Pubkey, ConfigError> {
        parse_pubkey("governance_program_id", &self.governance_program_id)
    }

    pub fn plugin_program_overrides(&self) -> Result<Vec<(Pubkey, PluginKind)>, ConfigError> {
        self.plugin_programs
            .iter()
            .map(|entry| Ok((parse_pubkey("plugin_programs.program_id", &entry.program_id)?, entry.kind)))
            .collect()
    }

    /// (realm, plugin program) pairs composed additively.
    pub fn additive_set(&self) -> Result<HashSet<(Pubkey, Pubkey)>, ConfigError> {
        self.additive_plugins
            .iter()
            .map(|entry| {
                Ok((
                    parse_pubkey("additive_plugins.realm", &entry.realm)?,
                    parse_pubkey("additive_plugins.program_id", &entry.program_id)?,
                ))
            })
            .collect()
    }
}

fn parse_pubkey(field: &'static str, value: &str) -> Result<Pubkey, ConfigError> {
    Pubkey::from_str(value).map_err(|_| ConfigError::InvalidPubkey {
        field,
        value: value.to_string(),
    })
}
