// SPL Governance Account Layouts
//
// Only the leading fields the pipeline reads are declared; borsh decoding
// stops there and ignores the rest of the account.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use super::{check_owner, decode_anchor_account, decode_borsh};
use crate::{cache::AccountData, constants::*, errors::*};

/// The governance action a voter weight is evaluated for
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum VoterWeightAction {
    CastVote,
    CommentProposal,
    CreateGovernance,
    CreateProposal,
    SignOffProposal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum MintMaxVoterWeightSource {
    /// Fraction of the mint supply, scaled by SUPPLY_FRACTION_BASE
    SupplyFraction(u64),
    Absolute(u64),
}

impl MintMaxVoterWeightSource {
    pub fn apply(&self, supply: u64) -> Result<u64> {
        match self {
            MintMaxVoterWeightSource::SupplyFraction(fraction) => {
                crate::helpers::mul_div(supply, *fraction, SUPPLY_FRACTION_BASE)
            }
            MintMaxVoterWeightSource::Absolute(value) => Ok(*value),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct RealmConfig {
    pub legacy1: u8,
    pub legacy2: u8,
    pub reserved: [u8; 6],
    pub min_community_weight_to_create_governance: u64,
    pub community_mint_max_voter_weight_source: MintMaxVoterWeightSource,
    pub council_mint: Option<[u8; 32]>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct Realm {
    pub account_type: u8,
    pub community_mint: [u8; 32],
    pub config: RealmConfig,
}

impl Realm {
    pub fn new(community_mint: &Pubkey, council_mint: Option<&Pubkey>) -> Self {
        Self {
            account_type: REALM_V2_ACCOUNT_TYPE,
            community_mint: community_mint.to_bytes(),
            config: RealmConfig {
                legacy1: 0,
                legacy2: 0,
                reserved: [0; 6],
                min_community_weight_to_create_governance: 1,
                community_mint_max_voter_weight_source: MintMaxVoterWeightSource::SupplyFraction(
                    SUPPLY_FRACTION_BASE,
                ),
                council_mint: council_mint.map(|m| m.to_bytes()),
            },
        }
    }

    pub fn decode(address: &Pubkey, account: &AccountData, governance_program_id: &Pubkey) -> Result<Self> {
        check_owner(address, account, governance_program_id)?;
        let realm: Realm = decode_borsh(address, &account.data)?;
        // V1 realms share the V2 prefix
        if !matches!(realm.account_type, REALM_V1_ACCOUNT_TYPE | REALM_V2_ACCOUNT_TYPE) {
            return Err(VoterWeightError::InvalidDiscriminator(*address));
        }
        Ok(realm)
    }

    pub fn community_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.community_mint)
    }

    pub fn council_mint(&self) -> Option<Pubkey> {
        self.config.council_mint.map(Pubkey::new_from_array)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum GoverningTokenType {
    Liquid,
    Membership,
    Dormant,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct GoverningTokenConfig {
    pub voter_weight_addin: Option<[u8; 32]>,
    pub max_voter_weight_addin: Option<[u8; 32]>,
    pub token_type: GoverningTokenType,
    pub reserved: [u8; 8],
}

impl GoverningTokenConfig {
    pub fn with_addin(addin: Option<&Pubkey>) -> Self {
        Self {
            voter_weight_addin: addin.map(|a| a.to_bytes()),
            max_voter_weight_addin: None,
            token_type: GoverningTokenType::Liquid,
            reserved: [0; 8],
        }
    }

    pub fn voter_weight_addin(&self) -> Option<Pubkey> {
        self.voter_weight_addin.map(Pubkey::new_from_array)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct RealmConfigAccount {
    pub account_type: u8,
    pub realm: [u8; 32],
    pub community_token_config: GoverningTokenConfig,
    pub council_token_config: GoverningTokenConfig,
    pub reserved: [u8; 110],
}

impl RealmConfigAccount {
    pub fn new(realm: &Pubkey, community_addin: Option<&Pubkey>, council_addin: Option<&Pubkey>) -> Self {
        Self {
            account_type: REALM_CONFIG_ACCOUNT_TYPE,
            realm: realm.to_bytes(),
            community_token_config: GoverningTokenConfig::with_addin(community_addin),
            council_token_config: GoverningTokenConfig::with_addin(council_addin),
            reserved: [0; 110],
        }
    }

    pub fn decode(address: &Pubkey, account: &AccountData, governance_program_id: &Pubkey) -> Result<Self> {
        check_owner(address, account, governance_program_id)?;
        let config: RealmConfigAccount = decode_borsh(address, &account.data)?;
        if config.account_type != REALM_CONFIG_ACCOUNT_TYPE {
            return Err(VoterWeightError::InvalidDiscriminator(*address));
        }
        Ok(config)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct TokenOwnerRecord {
    pub account_type: u8,
    pub realm: [u8; 32],
    pub governing_token_mint: [u8; 32],
    pub governing_token_owner: [u8; 32],
    pub governing_token_deposit_amount: u64,
    pub unrelinquished_votes_count: u64,
    pub outstanding_proposal_count: u8,
    pub version: u8,
    pub reserved: [u8; 6],
    pub governance_delegate: Option<[u8; 32]>,
}

impl TokenOwnerRecord {
    pub fn new(realm: &Pubkey, mint: &Pubkey, owner: &Pubkey, deposit: u64) -> Self {
        Self {
            account_type: TOKEN_OWNER_RECORD_V2_ACCOUNT_TYPE,
            realm: realm.to_bytes(),
            governing_token_mint: mint.to_bytes(),
            governing_token_owner: owner.to_bytes(),
            governing_token_deposit_amount: deposit,
            unrelinquished_votes_count: 0,
            outstanding_proposal_count: 0,
            version: 1,
            reserved: [0; 6],
            governance_delegate: None,
        }
    }

    pub fn decode(address: &Pubkey, account: &AccountData, governance_program_id: &Pubkey) -> Result<Self> {
        check_owner(address, account, governance_program_id)?;
        let record: TokenOwnerRecord = decode_borsh(address, &account.data)?;
        if !matches!(
            record.account_type,
            TOKEN_OWNER_RECORD_V1_ACCOUNT_TYPE | TOKEN_OWNER_RECORD_V2_ACCOUNT_TYPE
        ) {
            return Err(VoterWeightError::InvalidDiscriminator(*address));
        }
        Ok(record)
    }
}

/// Voter weight record owned by a plugin and read by the governance program.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct VoterWeightRecord {
    pub realm: [u8; 32],
    pub governing_token_mint: [u8; 32],
    pub governing_token_owner: [u8; 32],
    pub voter_weight: u64,
    pub voter_weight_expiry: Option<u64>,
    pub weight_action: Option<VoterWeightAction>,
    pub weight_action_target: Option<[u8; 32]>,
    pub reserved: [u8; 8],
}

impl VoterWeightRecord {
    pub const ACCOUNT_NAME: &'static str = "VoterWeightRecord";

    pub fn new(realm: &Pubkey, mint: &Pubkey, owner: &Pubkey, voter_weight: u64) -> Self {
        Self {
            realm: realm.to_bytes(),
            governing_token_mint: mint.to_bytes(),
            governing_token_owner: owner.to_bytes(),
            voter_weight,
            voter_weight_expiry: None,
            weight_action: None,
            weight_action_target: None,
            reserved: [0; 8],
        }
    }

    pub fn decode(address: &Pubkey, account: &AccountData, plugin_program_id: &Pubkey) -> Result<Self> {
        decode_anchor_account(address, account, plugin_program_id, Self::ACCOUNT_NAME)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct MaxVoterWeightRecord {
    pub realm: [u8; 32],
    pub governing_token_mint: [u8; 32],
    pub max_voter_weight: u64,
    pub max_voter_weight_expiry: Option<u64>,
    pub reserved: [u8; 8],
}

impl MaxVoterWeightRecord {
    pub const ACCOUNT_NAME: &'static str = "MaxVoterWeightRecord";

    pub fn new(realm: &Pubkey, mint: &Pubkey, max_voter_weight: u64) -> Self {
        Self {
            realm: realm.to_bytes(),
            governing_token_mint: mint.to_bytes(),
            max_voter_weight,
            max_voter_weight_expiry: None,
            reserved: [0; 8],
        }
    }
}
