use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::pubkey::Pubkey;

use crate::constants::GOVERNANCE_PROGRAM_ID;

/// weight = a * sqrt(input) + b * input + c
#[derive(Clone, Copy, Debug, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct QuadraticCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl QuadraticCoefficients {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    // Floored and clamped into u64 the same way the on-chain plugin rounds
    pub fn apply(&self, input: u64) -> u64 {
        let x = input as f64;
        let value = self.a * x.sqrt() + self.b * x + self.c;
        if !value.is_finite() || value <= 0.0 {
            return 0;
        }
        if value >= u64::MAX as f64 {
            return u64::MAX;
        }
        value.floor() as u64
    }
}

#[derive(Clone, Debug, PartialEq, BorshDeserialize, BorshSerialize)]
pub struct QuadraticRegistrar {
    pub governance_program_id: [u8; 32],
    pub realm: [u8; 32],
    pub governing_token_mint: [u8; 32],
    pub quadratic_coefficients: QuadraticCoefficients,
    pub previous_voter_weight_plugin_program_id: Option<[u8; 32]>,
    pub reserved: [u8; 128],
}

impl QuadraticRegistrar {
    pub const ACCOUNT_NAME: &'static str = "Registrar";

    pub fn new(
        realm: &Pubkey,
        mint: &Pubkey,
        coefficients: QuadraticCoefficients,
        previous_plugin: Option<&Pubkey>,
    ) -> Self {
        Self {
            governance_program_id: GOVERNANCE_PROGRAM_ID.to_bytes(),
            realm: realm.to_bytes(),
            governing_token_mint: mint.to_bytes(),
            quadratic_coefficients: coefficients,
            previous_voter_weight_plugin_program_id: previous_plugin.map(|p| p.to_bytes()),
            reserved: [0; 128],
        }
    }

    pub fn previous_plugin(&self) -> Option<Pubkey> {
        self.previous_voter_weight_plugin_program_id.map(Pubkey::new_from_array)
    }
}
