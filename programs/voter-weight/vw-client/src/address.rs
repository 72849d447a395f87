// Plugin Account Resolver
//
// Pure, synchronous derivation of every program address the pipeline reads
// or writes. Each plugin kind has its own seed scheme; the resolver hides the
// differences behind one API keyed by (realm, governing mint, member).
//
// Three outcomes are kept apart:
// - Ok(AccountAddress::Derived)       the account exists for this kind (it may not be created yet)
// - Ok(AccountAddress::NotApplicable) this kind has no such account
// - Err(DerivationFailed)             no off-curve address exists for the seeds

use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

use crate::{constants::*, errors::*, plugins::PluginKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountAddress {
    Derived { address: Pubkey, bump: u8 },
    NotApplicable,
}

impl AccountAddress {
    pub fn address(&self) -> Option<Pubkey> {
        match self {
            AccountAddress::Derived { address, .. } => Some(*address),
            AccountAddress::NotApplicable => None,
        }
    }

    pub fn bump(&self) -> Option<u8> {
        match self {
            AccountAddress::Derived { bump, .. } => Some(*bump),
            AccountAddress::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, AccountAddress::Derived { .. })
    }
}

impl From<(Pubkey, u8)> for AccountAddress {
    fn from((address, bump): (Pubkey, u8)) -> Self {
        AccountAddress::Derived { address, bump }
    }
}

pub fn find_pda(seeds: &[&[u8]], program_id: &Pubkey, label: &'static str) -> Result<(Pubkey, u8)> {
    Pubkey::try_find_program_address(seeds, program_id).ok_or(VoterWeightError::DerivationFailed(label))
}

// GOVERNANCE ADDRESSES

// Seeds: ["governance", realm, governing_token_mint, governing_token_owner]
pub fn token_owner_record(
    governance_program_id: &Pubkey,
    realm: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
) -> Result<(Pubkey, u8)> {
    find_pda(
        &[GOVERNANCE, realm.as_ref(), mint.as_ref(), owner.as_ref()],
        governance_program_id,
        "token owner record",
    )
}

// Seeds: ["realm-config", realm]
pub fn realm_config(governance_program_id: &Pubkey, realm: &Pubkey) -> Result<(Pubkey, u8)> {
    find_pda(&[REALM_CONFIG, realm.as_ref()], governance_program_id, "realm config")
}

// Seeds: ["governance", proposal, token_owner_record]
pub fn governance_vote_record(
    governance_program_id: &Pubkey,
    proposal: &Pubkey,
    token_owner_record: &Pubkey,
) -> Result<(Pubkey, u8)> {
    find_pda(
        &[GOVERNANCE, proposal.as_ref(), token_owner_record.as_ref()],
        governance_program_id,
        "vote record",
    )
}

// SHARED ADDRESSES

pub fn associated_token_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

// Seeds: ["metadata", token_metadata_program, mint]
pub fn token_metadata(mint: &Pubkey) -> Result<(Pubkey, u8)> {
    find_pda(
        &[METADATA, TOKEN_METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &TOKEN_METADATA_PROGRAM_ID,
        "token metadata",
    )
}

// Seeds: [owner, "gateway", index, gatekeeper_network]
pub fn gateway_token(owner: &Pubkey, gatekeeper_network: &Pubkey) -> Result<(Pubkey, u8)> {
    find_pda(
        &[owner.as_ref(), GATEWAY, &GATEWAY_TOKEN_INDEX, gatekeeper_network.as_ref()],
        &CIVIC_GATEWAY_PROGRAM_ID,
        "gateway token",
    )
}

// Seeds: ["nft-vote-record", proposal, nft_mint]
pub fn nft_vote_record(program_id: &Pubkey, proposal: &Pubkey, nft_mint: &Pubkey) -> Result<(Pubkey, u8)> {
    find_pda(
        &[NFT_VOTE_RECORD, proposal.as_ref(), nft_mint.as_ref()],
        program_id,
        "nft vote record",
    )
}

// PLUGIN ADDRESSES

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginAccountResolver {
    kind: PluginKind,
    program_id: Pubkey,
}

impl PluginAccountResolver {
    pub fn new(kind: PluginKind, program_id: Pubkey) -> Self {
        Self { kind, program_id }
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Per-realm configuration account of the plugin.
    pub fn registrar(&self, realm: &Pubkey, mint: &Pubkey) -> Result<AccountAddress> {
        let seeds: [&[u8]; 3] = match self.kind {
            PluginKind::Vanilla => return Ok(AccountAddress::NotApplicable),
            // Voter stake registry puts the realm first
            PluginKind::LockedStake => [realm.as_ref(), REGISTRAR, mint.as_ref()],
            _ => [REGISTRAR, realm.as_ref(), mint.as_ref()],
        };
        find_pda(&seeds, &self.program_id, "registrar").map(Into::into)
    }

    /// Plugin owned account holding the member's deposits, if the kind keeps one.
    pub fn member_state(&self, realm: &Pubkey, mint: &Pubkey, member: &Pubkey) -> Result<AccountAddress> {
        match self.kind {
            PluginKind::Vanilla => token_owner_record(&self.program_id, realm, mint, member).map(Into::into),
            PluginKind::LockedStake => {
                let registrar = self.required_registrar(realm, mint)?;
                find_pda(&[registrar.as_ref(), VOTER, member.as_ref()], &self.program_id, "voter").map(Into::into)
            }
            PluginKind::TokenDeposit => {
                let registrar = self.required_registrar(realm, mint)?;
                find_pda(&[VOTER, registrar.as_ref(), member.as_ref()], &self.program_id, "voter").map(Into::into)
            }
            PluginKind::NftHolding | PluginKind::Quadratic | PluginKind::Gateway | PluginKind::TokenHaver => {
                Ok(AccountAddress::NotApplicable)
            }
        }
    }

    /// Record the governance program reads the member's weight from.
    pub fn voter_weight_record(&self, realm: &Pubkey, mint: &Pubkey, member: &Pubkey) -> Result<AccountAddress> {
        match self.kind {
            PluginKind::Vanilla => Ok(AccountAddress::NotApplicable),
            PluginKind::LockedStake => {
                let registrar = self.required_registrar(realm, mint)?;
                find_pda(
                    &[registrar.as_ref(), VOTER_WEIGHT_RECORD, member.as_ref()],
                    &self.program_id,
                    "voter weight record",
                )
                .map(Into::into)
            }
            _ => find_pda(
                &[VOTER_WEIGHT_RECORD, realm.as_ref(), mint.as_ref(), member.as_ref()],
                &self.program_id,
                "voter weight record",
            )
            .map(Into::into),
        }
    }

    pub fn max_voter_weight_record(&self, realm: &Pubkey, mint: &Pubkey) -> Result<AccountAddress> {
        match self.kind {
            PluginKind::NftHolding | PluginKind::TokenDeposit | PluginKind::Quadratic => find_pda(
                &[MAX_VOTER_WEIGHT_RECORD, realm.as_ref(), mint.as_ref()],
                &self.program_id,
                "max voter weight record",
            )
            .map(Into::into),
            PluginKind::Vanilla | PluginKind::LockedStake | PluginKind::Gateway | PluginKind::TokenHaver => {
                Ok(AccountAddress::NotApplicable)
            }
        }
    }

    fn required_registrar(&self, realm: &Pubkey, mint: &Pubkey) -> Result<Pubkey> {
        self.registrar(realm, mint)?
            .address()
            .ok_or(VoterWeightError::DerivationFailed("registrar"))
    }
}
