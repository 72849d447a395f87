// Gateway Plugin State
//
// The gateway plugin passes its input weight through unchanged when the member
// holds a valid Civic pass for the registrar's gatekeeper network, and yields
// zero otherwise.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use super::{check_owner, decode_borsh};
use crate::{
    cache::AccountData,
    constants::{CIVIC_GATEWAY_PROGRAM_ID, GOVERNANCE_PROGRAM_ID},
    errors::*,
};

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct GatewayRegistrar {
    pub governance_program_id: [u8; 32],
    pub realm: [u8; 32],
    pub governing_token_mint: [u8; 32],
    pub gatekeeper_network: [u8; 32],
    pub previous_voter_weight_plugin_program_id: Option<[u8; 32]>,
    pub reserved: [u8; 128],
}

impl GatewayRegistrar {
    pub const ACCOUNT_NAME: &'static str = "Registrar";

    pub fn new(realm: &Pubkey, mint: &Pubkey, gatekeeper_network: &Pubkey, previous_plugin: Option<&Pubkey>) -> Self {
        Self {
            governance_program_id: GOVERNANCE_PROGRAM_ID.to_bytes(),
            realm: realm.to_bytes(),
            governing_token_mint: mint.to_bytes(),
            gatekeeper_network: gatekeeper_network.to_bytes(),
            previous_voter_weight_plugin_program_id: previous_plugin.map(|p| p.to_bytes()),
            reserved: [0; 128],
        }
    }

    pub fn gatekeeper_network(&self) -> Pubkey {
        Pubkey::new_from_array(self.gatekeeper_network)
    }

    pub fn previous_plugin(&self) -> Option<Pubkey> {
        self.previous_voter_weight_plugin_program_id.map(Pubkey::new_from_array)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub enum GatewayTokenState {
    Active,
    Frozen,
    Revoked,
}

/// Civic pass. Plain borsh, no Anchor discriminator.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct GatewayToken {
    pub features: u8,
    pub parent_gateway_token: Option<[u8; 32]>,
    pub owner_wallet: [u8; 32],
    pub owner_identity: Option<[u8; 32]>,
    pub gatekeeper_network: [u8; 32],
    pub issuing_gatekeeper: [u8; 32],
    pub state: GatewayTokenState,
    pub expire_time: Option<i64>,
}

impl GatewayToken {
    pub fn new(owner: &Pubkey, gatekeeper_network: &Pubkey, expire_time: Option<i64>) -> Self {
        Self {
            features: 0,
            parent_gateway_token: None,
            owner_wallet: owner.to_bytes(),
            owner_identity: None,
            gatekeeper_network: gatekeeper_network.to_bytes(),
            issuing_gatekeeper: [0; 32],
            state: GatewayTokenState::Active,
            expire_time,
        }
    }

    pub fn decode(address: &Pubkey, account: &AccountData) -> Result<Self> {
        check_owner(address, account, &CIVIC_GATEWAY_PROGRAM_ID)?;
        decode_borsh(address, &account.data)
    }

    pub fn is_valid_for(&self, owner: &Pubkey, gatekeeper_network: &Pubkey, now: i64) -> bool {
        self.state == GatewayTokenState::Active
            && self.owner_wallet == owner.to_bytes()
            && self.gatekeeper_network == gatekeeper_network.to_bytes()
            && self.expire_time.map_or(true, |expiry| expiry > now)
    }
}
