// Locked Stake (Voter Stake Registry) State
//
// Zero-copy layouts of the stake registry accounts and the vote weight math:
// each deposit earns a baseline weight plus a bonus that grows with the time
// left on its lockup, up to the registrar's saturation period.

use bytemuck::{Pod, Zeroable};
use solana_sdk::pubkey::Pubkey;

use crate::{constants::*, errors::*, helpers::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LockupKind {
    None = 0,
    Daily = 1,
    Monthly = 2,
    Cliff = 3,
    Constant = 4,
}

impl LockupKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LockupKind::None),
            1 => Some(LockupKind::Daily),
            2 => Some(LockupKind::Monthly),
            3 => Some(LockupKind::Cliff),
            4 => Some(LockupKind::Constant),
            _ => None,
        }
    }

    pub fn period_secs(&self) -> u64 {
        match self {
            LockupKind::None => 0,
            LockupKind::Daily => SECS_PER_DAY,
            LockupKind::Monthly => SECS_PER_MONTH,
            LockupKind::Cliff | LockupKind::Constant => SECS_PER_DAY,
        }
    }
}

// 32 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Lockup {
    pub start_ts: i64,
    pub end_ts: i64,
    pub kind: u8,
    pub reserved: [u8; 15],
}

impl Lockup {
    pub fn new(kind: LockupKind, start_ts: i64, end_ts: i64) -> Self {
        Self {
            start_ts,
            end_ts,
            kind: kind as u8,
            reserved: [0; 15],
        }
    }

    pub fn kind(&self) -> LockupKind {
        // Unknown kinds carry no bonus
        LockupKind::from_u8(self.kind).unwrap_or(LockupKind::None)
    }

    pub fn expired(&self, now: i64) -> bool {
        self.kind() != LockupKind::Constant && now >= self.end_ts
    }

    pub fn seconds_left(&self, now: i64) -> u64 {
        match self.kind() {
            LockupKind::None => 0,
            // Constant lockups never start counting down
            LockupKind::Constant => self.end_ts.saturating_sub(self.start_ts).max(0) as u64,
            _ => self.end_ts.saturating_sub(now).max(0) as u64,
        }
    }

    pub fn periods_total(&self) -> u64 {
        let period = self.kind().period_secs();
        if period == 0 {
            return 0;
        }
        (self.end_ts.saturating_sub(self.start_ts).max(0) as u64) / period
    }

    pub fn periods_left(&self, now: i64) -> u64 {
        let period = self.kind().period_secs();
        if period == 0 {
            return 0;
        }
        self.seconds_left(now).div_ceil(period)
    }
}

// 80 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DepositEntry {
    pub lockup: Lockup,
    pub amount_deposited_native: u64,
    pub amount_initially_locked_native: u64,
    pub is_used: u8,
    pub allow_clawback: u8,
    pub voting_mint_config_idx: u8,
    pub reserved: [u8; 29],
}

impl DepositEntry {
    pub fn new(voting_mint_config_idx: u8, amount: u64, lockup: Lockup) -> Self {
        Self {
            lockup,
            amount_deposited_native: amount,
            amount_initially_locked_native: amount,
            is_used: 1,
            allow_clawback: 0,
            voting_mint_config_idx,
            reserved: [0; 29],
        }
    }

    pub fn is_used(&self) -> bool {
        self.is_used != 0
    }

    pub fn voting_power(&self, config: &VotingMintConfig, now: i64) -> Result<u64> {
        let baseline = config.baseline_vote_weight(self.amount_deposited_native)?;
        let max_locked = config.max_extra_lockup_vote_weight(self.amount_initially_locked_native)?;
        let locked = self.voting_power_locked(now, max_locked, config.lockup_saturation_secs)?;
        baseline.checked_add(locked).ok_or(VoterWeightError::Overflow)
    }

    fn voting_power_locked(&self, now: i64, max_locked: u64, saturation: u64) -> Result<u64> {
        if self.lockup.expired(now) || max_locked == 0 {
            return Ok(0);
        }
        match self.lockup.kind() {
            LockupKind::None => Ok(0),
            LockupKind::Daily | LockupKind::Monthly => self.voting_power_vesting(now, max_locked, saturation),
            LockupKind::Cliff | LockupKind::Constant => {
                if saturation == 0 {
                    return Ok(max_locked);
                }
                let secs = self.lockup.seconds_left(now).min(saturation);
                mul_div(max_locked, secs, saturation)
            }
        }
    }

    // Vesting lockups unlock one slice per period. Slice i stays locked for
    // secs_to_closest_cliff + i * period seconds; each slice earns the bonus
    // for its own remaining time, capped at saturation.
    fn voting_power_vesting(&self, now: i64, max_locked: u64, saturation: u64) -> Result<u64> {
        let periods_left = self.lockup.periods_left(now);
        let periods_total = self.lockup.periods_total();
        let period = self.lockup.kind().period_secs();
        if periods_left == 0 || periods_total == 0 {
            return Ok(0);
        }
        if saturation == 0 {
            return mul_div(max_locked, periods_left, periods_total);
        }

        let secs_left = self.lockup.seconds_left(now);
        let secs_to_closest_cliff = period
            .checked_mul(periods_left - 1)
            .and_then(|full| secs_left.checked_sub(full))
            .ok_or(VoterWeightError::Overflow)?;

        if secs_to_closest_cliff >= saturation {
            return mul_div(max_locked, periods_left, periods_total);
        }

        // Number of slices still below saturation
        let unsaturated = ((saturation - secs_to_closest_cliff) / period + 1).min(periods_left) as u128;
        let full_periods_sum = unsaturated
            .checked_mul(unsaturated.saturating_sub(1))
            .ok_or(VoterWeightError::Overflow)?
            / 2;

        let lockup_secs = unsaturated
            .checked_mul(secs_to_closest_cliff as u128)
            .zip((period as u128).checked_mul(full_periods_sum))
            .zip(((periods_left as u128) - unsaturated).checked_mul(saturation as u128))
            .and_then(|((cliff, full), saturated)| cliff.checked_add(full)?.checked_add(saturated))
            .ok_or(VoterWeightError::Overflow)?;
        let denominator = periods_total as u128 * saturation as u128;

        let value = (max_locked as u128)
            .checked_mul(lockup_secs)
            .ok_or(VoterWeightError::Overflow)?
            / denominator;
        u64::try_from(value).map_err(|_| VoterWeightError::Overflow)
    }
}

// 152 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct VotingMintConfig {
    pub mint: [u8; 32],
    pub grant_authority: [u8; 32],
    pub baseline_vote_weight_scaled_factor: u64,
    pub max_extra_lockup_vote_weight_scaled_factor: u64,
    pub lockup_saturation_secs: u64,
    pub digit_shift: i8,
    pub reserved1: [u8; 7],
    pub reserved2: [u64; 7],
}

impl VotingMintConfig {
    pub fn new(mint: &Pubkey, baseline_factor: u64, max_extra_factor: u64, saturation_secs: u64) -> Self {
        let mut config = Self::zeroed();
        config.mint = mint.to_bytes();
        config.baseline_vote_weight_scaled_factor = baseline_factor;
        config.max_extra_lockup_vote_weight_scaled_factor = max_extra_factor;
        config.lockup_saturation_secs = saturation_secs;
        config
    }

    pub fn mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.mint)
    }

    pub fn in_use(&self) -> bool {
        self.mint != [0u8; 32]
    }

    pub fn baseline_vote_weight(&self, amount_native: u64) -> Result<u64> {
        mul_div(
            apply_digit_shift(amount_native, self.digit_shift)?,
            self.baseline_vote_weight_scaled_factor,
            SCALED_FACTOR_BASE,
        )
    }

    pub fn max_extra_lockup_vote_weight(&self, amount_native: u64) -> Result<u64> {
        mul_div(
            apply_digit_shift(amount_native, self.digit_shift)?,
            self.max_extra_lockup_vote_weight_scaled_factor,
            SCALED_FACTOR_BASE,
        )
    }

    /// Weight of the full mint supply, fully locked at saturation.
    pub fn max_vote_weight(&self, supply: u64) -> Result<u64> {
        self.baseline_vote_weight(supply)?
            .checked_add(self.max_extra_lockup_vote_weight(supply)?)
            .ok_or(VoterWeightError::Overflow)
    }
}

// 872 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LockedStakeRegistrar {
    pub governance_program_id: [u8; 32],
    pub realm: [u8; 32],
    pub realm_governing_token_mint: [u8; 32],
    pub realm_authority: [u8; 32],
    pub reserved1: [u8; 32],
    pub voting_mints: [VotingMintConfig; MAX_VOTING_MINTS],
    pub time_offset: i64,
    pub bump: u8,
    pub reserved2: [u8; 7],
    pub reserved3: [u64; 11],
}

impl LockedStakeRegistrar {
    pub const ACCOUNT_NAME: &'static str = "Registrar";

    pub fn new(realm: &Pubkey, mint: &Pubkey, voting_mints: &[VotingMintConfig]) -> Self {
        let mut registrar = Self::zeroed();
        registrar.governance_program_id = GOVERNANCE_PROGRAM_ID.to_bytes();
        registrar.realm = realm.to_bytes();
        registrar.realm_governing_token_mint = mint.to_bytes();
        for (slot, config) in registrar.voting_mints.iter_mut().zip(voting_mints) {
            *slot = *config;
        }
        registrar
    }

    pub fn realm(&self) -> Pubkey {
        Pubkey::new_from_array(self.realm)
    }

    pub fn governing_token_mint(&self) -> Pubkey {
        Pubkey::new_from_array(self.realm_governing_token_mint)
    }

    /// Registrar clock: chain time shifted by the registrar's test offset.
    pub fn clock_unix_timestamp(&self, chain_unix_timestamp: i64) -> i64 {
        chain_unix_timestamp.saturating_add(self.time_offset)
    }

    pub fn active_voting_mints(&self) -> impl Iterator<Item = &VotingMintConfig> {
        self.voting_mints.iter().filter(|config| config.in_use())
    }
}

// 2720 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LockedStakeVoter {
    pub voter_authority: [u8; 32],
    pub registrar: [u8; 32],
    pub deposits: [DepositEntry; MAX_DEPOSIT_ENTRIES],
    pub voter_bump: u8,
    pub voter_weight_record_bump: u8,
    pub reserved: [u8; 94],
}

impl LockedStakeVoter {
    pub const ACCOUNT_NAME: &'static str = "Voter";

    pub fn new(authority: &Pubkey, registrar: &Pubkey, deposits: &[DepositEntry]) -> Self {
        let mut voter = Self::zeroed();
        voter.voter_authority = authority.to_bytes();
        voter.registrar = registrar.to_bytes();
        for (slot, deposit) in voter.deposits.iter_mut().zip(deposits) {
            *slot = *deposit;
        }
        voter
    }

    pub fn voter_authority(&self) -> Pubkey {
        Pubkey::new_from_array(self.voter_authority)
    }

    /// Sum of every used deposit's voting power at registrar time `now`.
    pub fn weight(&self, registrar: &LockedStakeRegistrar, now: i64) -> Result<u64> {
        let mut total = 0u64;
        for deposit in self.deposits.iter().filter(|d| d.is_used()) {
            // Deposits for a removed voting mint carry no weight
            let Some(config) = registrar
                .voting_mints
                .get(deposit.voting_mint_config_idx as usize)
                .filter(|config| config.in_use())
            else {
                continue;
            };
            total = total
                .checked_add(deposit.voting_power(config, now)?)
                .ok_or(VoterWeightError::Overflow)?;
        }
        Ok(total)
    }
}
