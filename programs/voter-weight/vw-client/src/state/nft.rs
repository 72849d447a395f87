use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::constants::GOVERNANCE_PROGRAM_ID;

/// Voting weight granted to every verified NFT of one collection
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct CollectionConfig {
    pub collection: [u8; 32],
    pub size: u32,
    pub weight: u64,
    pub reserved: [u8; 8],
}

impl CollectionConfig {
    pub fn new(collection: &Pubkey, size: u32, weight: u64) -> Self {
        Self {
            collection: collection.to_bytes(),
            size,
            weight,
            reserved: [0; 8],
        }
    }

    pub fn collection(&self) -> Pubkey {
        Pubkey::new_from_array(self.collection)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct NftRegistrar {
    pub governance_program_id: [u8; 32],
    pub realm: [u8; 32],
    pub governing_token_mint: [u8; 32],
    pub collection_configs: Vec<CollectionConfig>,
    pub reserved: [u8; 128],
}

impl NftRegistrar {
    pub const ACCOUNT_NAME: &'static str = "Registrar";

    pub fn new(realm: &Pubkey, mint: &Pubkey, collection_configs: Vec<CollectionConfig>) -> Self {
        Self {
            governance_program_id: GOVERNANCE_PROGRAM_ID.to_bytes(),
            realm: realm.to_bytes(),
            governing_token_mint: mint.to_bytes(),
            collection_configs,
            reserved: [0; 128],
        }
    }

    pub fn collection_config(&self, collection: &Pubkey) -> Option<&CollectionConfig> {
        self.collection_configs
            .iter()
            .find(|config| config.collection == collection.to_bytes())
    }
}

/// Marks an NFT as already used to vote on one proposal
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct NftVoteRecord {
    pub proposal: [u8; 32],
    pub nft_mint: [u8; 32],
    pub governing_token_owner: [u8; 32],
    pub reserved: [u8; 8],
}

impl NftVoteRecord {
    pub const ACCOUNT_NAME: &'static str = "NftVoteRecord";

    pub fn new(proposal: &Pubkey, nft_mint: &Pubkey, owner: &Pubkey) -> Self {
        Self {
            proposal: proposal.to_bytes(),
            nft_mint: nft_mint.to_bytes(),
            governing_token_owner: owner.to_bytes(),
            reserved: [0; 8],
        }
    }
}
