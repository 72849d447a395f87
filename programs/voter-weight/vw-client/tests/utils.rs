// Test utilities for the voter weight pipeline
//
// Realms are staged in a MemoryLedger: governance accounts, plugin registrars
// and member state are written with the same layouts the pipeline decodes.

#![allow(dead_code)]

use std::sync::Arc;

use solana_sdk::{pubkey, pubkey::Pubkey};
use voter_weight_client::{
    address::{self, PluginAccountResolver},
    constants::*,
    state::*,
    AccountCache, AccountData, MemoryLedger, OwnedAsset, PluginKind, PluginRegistry, PluginSettings, PopulationConfig,
    RealmPluginConfig, RetryPolicy, StaticRealmConfigs, VoterWeightService,
};

pub const DECIMALS: u8 = 6;
pub const COMMUNITY_SUPPLY: u64 = 10_000;
pub const COUNCIL_SUPPLY: u64 = 7;
pub const CURRENT_SLOT: u64 = 250_000_000;
pub const NOW: i64 = 1_700_000_000;
pub const ENDPOINT: &str = "memory";
pub const SYSVAR_OWNER: Pubkey = pubkey!("Sysvar1111111111111111111111111111111111111");

pub struct RealmFixture {
    pub ledger: MemoryLedger,
    pub cache: Arc<AccountCache>,
    pub realm: Pubkey,
    pub community_mint: Pubkey,
    pub council_mint: Pubkey,
}

// ===== SETUP =====

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// Realm with a community and a council mint, clock and mints staged
pub async fn setup_realm() -> RealmFixture {
    init_tracing();
    let ledger = MemoryLedger::new();
    let realm = Pubkey::new_unique();
    let community_mint = Pubkey::new_unique();
    let council_mint = Pubkey::new_unique();

    write_realm(&ledger, &realm, &community_mint, Some(&council_mint)).await;
    write_mint(&ledger, &community_mint, COMMUNITY_SUPPLY).await;
    write_mint(&ledger, &council_mint, COUNCIL_SUPPLY).await;
    write_clock(&ledger, CURRENT_SLOT, NOW).await;

    let cache = Arc::new(AccountCache::new(ENDPOINT, Arc::new(ledger.clone()), RetryPolicy::none()));
    RealmFixture {
        ledger,
        cache,
        realm,
        community_mint,
        council_mint,
    }
}

impl RealmFixture {
    /// Community plugins in order, no council plugins.
    pub fn config(&self, community: Vec<PluginSettings>) -> RealmPluginConfig {
        RealmPluginConfig {
            realm: self.realm,
            governance_program_id: GOVERNANCE_PROGRAM_ID,
            community: PopulationConfig::new(self.community_mint, community),
            council: Some(PopulationConfig::new(self.council_mint, Vec::new())),
        }
    }

    pub fn service(&self, community: Vec<PluginSettings>) -> VoterWeightService {
        self.service_with_batch(community, DEFAULT_MAX_INSTRUCTIONS_PER_BATCH)
    }

    pub fn service_with_batch(&self, community: Vec<PluginSettings>, max_per_batch: usize) -> VoterWeightService {
        let configs = StaticRealmConfigs::new().with(self.config(community));
        VoterWeightService::new(self.cache.clone(), Arc::new(configs), PluginRegistry::default(), max_per_batch)
    }

    /// Cache over the same ledger with nothing read yet.
    pub fn fresh_cache(&self) -> Arc<AccountCache> {
        Arc::new(AccountCache::new(ENDPOINT, Arc::new(self.ledger.clone()), RetryPolicy::none()))
    }
}

// ===== GOVERNANCE ACCOUNTS =====

pub async fn write_realm(ledger: &MemoryLedger, realm: &Pubkey, community_mint: &Pubkey, council_mint: Option<&Pubkey>) {
    let data = borsh::to_vec(&Realm::new(community_mint, council_mint)).unwrap();
    ledger.set_account(*realm, AccountData::new(GOVERNANCE_PROGRAM_ID, data)).await;
}

pub async fn write_realm_config(
    ledger: &MemoryLedger,
    realm: &Pubkey,
    community_addin: Option<&Pubkey>,
    council_addin: Option<&Pubkey>,
) {
    let (config_address, _) = address::realm_config(&GOVERNANCE_PROGRAM_ID, realm).unwrap();
    let data = borsh::to_vec(&RealmConfigAccount::new(realm, community_addin, council_addin)).unwrap();
    ledger.set_account(config_address, AccountData::new(GOVERNANCE_PROGRAM_ID, data)).await;
}

// Realm config written byte by byte in the governance program's layout, with
// both max voter weight addins set so the offsets are fixed: community config
// at 33, council config at 108, reserved from 183
pub async fn write_realm_config_bytes(
    ledger: &MemoryLedger,
    realm: &Pubkey,
    community_addin: &Pubkey,
    council_addin: &Pubkey,
) {
    let (config_address, _) = address::realm_config(&GOVERNANCE_PROGRAM_ID, realm).unwrap();
    let mut data = vec![0u8; 293];
    data[0] = REALM_CONFIG_ACCOUNT_TYPE;
    data[1..33].copy_from_slice(realm.as_ref());
    for (start, addin) in [(33, community_addin), (108, council_addin)] {
        data[start] = 1;
        data[start + 1..start + 33].copy_from_slice(addin.as_ref());
        data[start + 33] = 1;
        data[start + 34..start + 66].copy_from_slice(addin.as_ref());
    }
    ledger.set_account(config_address, AccountData::new(GOVERNANCE_PROGRAM_ID, data)).await;
}

pub async fn write_token_owner_record(
    ledger: &MemoryLedger,
    realm: &Pubkey,
    mint: &Pubkey,
    member: &Pubkey,
    deposit: u64,
) -> Pubkey {
    let (record, _) = address::token_owner_record(&GOVERNANCE_PROGRAM_ID, realm, mint, member).unwrap();
    let data = borsh::to_vec(&TokenOwnerRecord::new(realm, mint, member, deposit)).unwrap();
    ledger.set_account(record, AccountData::new(GOVERNANCE_PROGRAM_ID, data)).await;
    record
}

pub async fn write_mint(ledger: &MemoryLedger, mint: &Pubkey, supply: u64) {
    ledger
        .set_account(*mint, AccountData::new(spl_token::ID, encode_mint(supply, DECIMALS)))
        .await;
}

pub async fn write_clock(ledger: &MemoryLedger, slot: u64, unix_timestamp: i64) {
    let clock = ChainClock { slot, unix_timestamp };
    ledger
        .set_account(CLOCK_SYSVAR_ID, AccountData::new(SYSVAR_OWNER, clock.encode().unwrap()))
        .await;
}

// ===== HELPERS =====

// Derive a plugin's registrar address at its default deployment
pub fn registrar_address(kind: PluginKind, realm: &Pubkey, mint: &Pubkey) -> Pubkey {
    PluginAccountResolver::new(kind, kind.default_program_id())
        .registrar(realm, mint)
        .unwrap()
        .address()
        .unwrap()
}

// Derive a plugin's voter weight record address
pub fn voter_weight_record_address(kind: PluginKind, realm: &Pubkey, mint: &Pubkey, member: &Pubkey) -> Pubkey {
    PluginAccountResolver::new(kind, kind.default_program_id())
        .voter_weight_record(realm, mint, member)
        .unwrap()
        .address()
        .unwrap()
}

// Derive a plugin's max voter weight record address
pub fn max_voter_weight_record_address(kind: PluginKind, realm: &Pubkey, mint: &Pubkey) -> Pubkey {
    PluginAccountResolver::new(kind, kind.default_program_id())
        .max_voter_weight_record(realm, mint)
        .unwrap()
        .address()
        .unwrap()
}

pub fn plugin(kind: PluginKind) -> PluginSettings {
    PluginSettings::new(kind.default_program_id())
}

// ===== LOCKED STAKE =====

// Registrar whose only voting mint counts deposits one to one, no lockup bonus
pub async fn write_locked_stake_registrar(ledger: &MemoryLedger, realm: &Pubkey, mint: &Pubkey) -> Pubkey {
    let config = VotingMintConfig::new(mint, SCALED_FACTOR_BASE, 0, SECS_PER_DAY);
    let registrar = LockedStakeRegistrar::new(realm, mint, &[config]);
    let address = registrar_address(PluginKind::LockedStake, realm, mint);
    let data = encode_zero_copy_account(LockedStakeRegistrar::ACCOUNT_NAME, &registrar);
    ledger
        .set_account(address, AccountData::new(LOCKED_STAKE_PROGRAM_ID, data))
        .await;
    address
}

pub async fn write_locked_stake_voter(
    ledger: &MemoryLedger,
    realm: &Pubkey,
    mint: &Pubkey,
    member: &Pubkey,
    amount: u64,
) -> Pubkey {
    let registrar = registrar_address(PluginKind::LockedStake, realm, mint);
    let voter_address = PluginAccountResolver::new(PluginKind::LockedStake, LOCKED_STAKE_PROGRAM_ID)
        .member_state(realm, mint, member)
        .unwrap()
        .address()
        .unwrap();
    let deposit = DepositEntry::new(0, amount, Lockup::new(LockupKind::None, 0, 0));
    let voter = LockedStakeVoter::new(member, &registrar, &[deposit]);
    let data = encode_zero_copy_account(LockedStakeVoter::ACCOUNT_NAME, &voter);
    ledger
        .set_account(voter_address, AccountData::new(LOCKED_STAKE_PROGRAM_ID, data))
        .await;
    voter_address
}

// ===== CHAINED PLUGINS =====

pub async fn write_quadratic_registrar(
    ledger: &MemoryLedger,
    realm: &Pubkey,
    mint: &Pubkey,
    coefficients: QuadraticCoefficients,
    previous: Option<&Pubkey>,
) -> Pubkey {
    let registrar = QuadraticRegistrar::new(realm, mint, coefficients, previous);
    let address = registrar_address(PluginKind::Quadratic, realm, mint);
    let data = encode_anchor_account(QuadraticRegistrar::ACCOUNT_NAME, &registrar).unwrap();
    ledger.set_account(address, AccountData::new(QUADRATIC_PROGRAM_ID, data)).await;
    address
}

pub async fn write_gateway_registrar(
    ledger: &MemoryLedger,
    realm: &Pubkey,
    mint: &Pubkey,
    network: &Pubkey,
    previous: Option<&Pubkey>,
) -> Pubkey {
    let registrar = GatewayRegistrar::new(realm, mint, network, previous);
    let address = registrar_address(PluginKind::Gateway, realm, mint);
    let data = encode_anchor_account(GatewayRegistrar::ACCOUNT_NAME, &registrar).unwrap();
    ledger
        .set_account(address, AccountData::new(GATEWAY_PLUGIN_PROGRAM_ID, data))
        .await;
    address
}

pub async fn write_gateway_token(ledger: &MemoryLedger, member: &Pubkey, network: &Pubkey, expire_time: Option<i64>) {
    let (pass, _) = address::gateway_token(member, network).unwrap();
    let data = borsh::to_vec(&GatewayToken::new(member, network, expire_time)).unwrap();
    ledger
        .set_account(pass, AccountData::new(CIVIC_GATEWAY_PROGRAM_ID, data))
        .await;
}

// ===== NFT =====

pub async fn write_nft_registrar(
    ledger: &MemoryLedger,
    realm: &Pubkey,
    mint: &Pubkey,
    configs: Vec<CollectionConfig>,
) -> Pubkey {
    let registrar = NftRegistrar::new(realm, mint, configs);
    let address = registrar_address(PluginKind::NftHolding, realm, mint);
    let data = encode_anchor_account(NftRegistrar::ACCOUNT_NAME, &registrar).unwrap();
    ledger.set_account(address, AccountData::new(NFT_VOTER_PROGRAM_ID, data)).await;
    address
}

// Verified NFTs of one collection held by `member`
pub async fn give_nfts(ledger: &MemoryLedger, member: &Pubkey, collection: &Pubkey, count: usize) -> Vec<OwnedAsset> {
    let assets: Vec<OwnedAsset> = (0..count)
        .map(|_| OwnedAsset {
            mint: Pubkey::new_unique(),
            token_account: Pubkey::new_unique(),
            collection: Some(*collection),
            collection_verified: true,
        })
        .collect();
    ledger.set_owned_assets(*member, assets.clone()).await;
    assets
}

pub async fn write_nft_vote_record(ledger: &MemoryLedger, proposal: &Pubkey, nft_mint: &Pubkey, member: &Pubkey) {
    let (record, _) = address::nft_vote_record(&NFT_VOTER_PROGRAM_ID, proposal, nft_mint).unwrap();
    let data = encode_anchor_account(NftVoteRecord::ACCOUNT_NAME, &NftVoteRecord::new(proposal, nft_mint, member)).unwrap();
    ledger.set_account(record, AccountData::new(NFT_VOTER_PROGRAM_ID, data)).await;
}

// ===== WEIGHT RECORDS =====

// Stage the records a landed pre-vote transaction would have created
pub async fn write_voter_weight_record(
    ledger: &MemoryLedger,
    kind: PluginKind,
    realm: &Pubkey,
    mint: &Pubkey,
    member: &Pubkey,
    weight: u64,
) -> Pubkey {
    let address = voter_weight_record_address(kind, realm, mint, member);
    let record = VoterWeightRecord::new(realm, mint, member, weight);
    let data = encode_anchor_account(VoterWeightRecord::ACCOUNT_NAME, &record).unwrap();
    ledger
        .set_account(address, AccountData::new(kind.default_program_id(), data))
        .await;
    address
}

pub async fn write_max_voter_weight_record(
    ledger: &MemoryLedger,
    kind: PluginKind,
    realm: &Pubkey,
    mint: &Pubkey,
    weight: u64,
) -> Pubkey {
    let address = max_voter_weight_record_address(kind, realm, mint);
    let record = MaxVoterWeightRecord::new(realm, mint, weight);
    let data = encode_anchor_account(MaxVoterWeightRecord::ACCOUNT_NAME, &record).unwrap();
    ledger
        .set_account(address, AccountData::new(kind.default_program_id(), data))
        .await;
    address
}

// ===== TOKEN PLUGINS =====

pub async fn write_token_voter_registrar(
    ledger: &MemoryLedger,
    realm: &Pubkey,
    mint: &Pubkey,
    voting_mints: &[(Pubkey, i8)],
) -> Pubkey {
    let configs = voting_mints
        .iter()
        .map(|(voting_mint, shift)| TokenVotingMintConfig::new(voting_mint, *shift))
        .collect();
    let registrar = TokenVoterRegistrar::new(realm, mint, configs);
    let address = registrar_address(PluginKind::TokenDeposit, realm, mint);
    let data = encode_anchor_account(TokenVoterRegistrar::ACCOUNT_NAME, &registrar).unwrap();
    ledger
        .set_account(address, AccountData::new(TOKEN_VOTER_PROGRAM_ID, data))
        .await;
    address
}

// Deposits as (voting mint index, native amount)
pub async fn write_token_voter(
    ledger: &MemoryLedger,
    realm: &Pubkey,
    mint: &Pubkey,
    member: &Pubkey,
    deposits: &[(u8, u64)],
) -> Pubkey {
    let registrar = registrar_address(PluginKind::TokenDeposit, realm, mint);
    let voter_address = PluginAccountResolver::new(PluginKind::TokenDeposit, TOKEN_VOTER_PROGRAM_ID)
        .member_state(realm, mint, member)
        .unwrap()
        .address()
        .unwrap();
    let entries = deposits
        .iter()
        .map(|(idx, amount)| TokenDepositEntry::new(*idx, *amount))
        .collect();
    let voter = TokenVoter::new(member, &registrar, entries);
    let data = encode_anchor_account(TokenVoter::ACCOUNT_NAME, &voter).unwrap();
    ledger
        .set_account(voter_address, AccountData::new(TOKEN_VOTER_PROGRAM_ID, data))
        .await;
    voter_address
}

pub async fn write_token_haver_registrar(ledger: &MemoryLedger, realm: &Pubkey, mint: &Pubkey, mints: &[Pubkey]) -> Pubkey {
    let registrar = TokenHaverRegistrar::new(realm, mint, mints);
    let address = registrar_address(PluginKind::TokenHaver, realm, mint);
    let data = encode_anchor_account(TokenHaverRegistrar::ACCOUNT_NAME, &registrar).unwrap();
    ledger
        .set_account(address, AccountData::new(TOKEN_HAVER_PROGRAM_ID, data))
        .await;
    address
}

// Associated token account of `owner` for `mint`
pub async fn write_token_account(ledger: &MemoryLedger, owner: &Pubkey, mint: &Pubkey, amount: u64, frozen: bool) -> Pubkey {
    let address = address::associated_token_account(owner, mint);
    let state = if frozen {
        TokenAccountState::Frozen
    } else {
        TokenAccountState::Initialized
    };
    ledger
        .set_account(address, AccountData::new(spl_token::ID, encode_token_account(mint, owner, amount, state)))
        .await;
    address
}
