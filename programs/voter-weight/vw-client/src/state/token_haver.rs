use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::constants::GOVERNANCE_PROGRAM_ID;

/// One vote for each registrar mint the member holds a non-zero balance of
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct TokenHaverRegistrar {
    pub governance_program_id: [u8; 32],
    pub realm: [u8; 32],
    pub governing_token_mint: [u8; 32],
    pub mints: Vec<[u8; 32]>,
    pub reserved: [u8; 128],
}

impl TokenHaverRegistrar {
    pub const ACCOUNT_NAME: &'static str = "Registrar";

    pub fn new(realm: &Pubkey, mint: &Pubkey, mints: &[Pubkey]) -> Self {
        Self {
            governance_program_id: GOVERNANCE_PROGRAM_ID.to_bytes(),
            realm: realm.to_bytes(),
            governing_token_mint: mint.to_bytes(),
            mints: mints.iter().map(|m| m.to_bytes()).collect(),
            reserved: [0; 128],
        }
    }

    pub fn mints(&self) -> Vec<Pubkey> {
        self.mints.iter().copied().map(Pubkey::new_from_array).collect()
    }
}
