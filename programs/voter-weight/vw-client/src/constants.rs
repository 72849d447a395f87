// Voter Weight Pipeline Constants

use solana_sdk::{pubkey, pubkey::Pubkey};

// PROGRAM IDS

pub const GOVERNANCE_PROGRAM_ID: Pubkey = pubkey!("GovER5Lthms3bLBqWub97yVrMmEogzX7xNjdXpPPCVZw");
pub const LOCKED_STAKE_PROGRAM_ID: Pubkey = pubkey!("vsr2nfGVNHmSY8uxoBGqq8AQbwz3JwaEaHqGbsTPXqQ");
pub const NFT_VOTER_PROGRAM_ID: Pubkey = pubkey!("GnftV5kLjd67tvHpNGyodwWveEKivz3ZWvvE3Z4xi2iw");
pub const TOKEN_VOTER_PROGRAM_ID: Pubkey = pubkey!("HA99cuBQCCzZu1zuHN2qBxo2FBo1cxNLwKkdt6Prhy8v");
pub const QUADRATIC_PROGRAM_ID: Pubkey = pubkey!("quadCSapU8nTdLg73KHDnmdxKnJQsh7GUbu5tZfnRRr");
pub const GATEWAY_PLUGIN_PROGRAM_ID: Pubkey = pubkey!("GgathUhdrCWRHowoRKACjgWhYHfxCEdBi5ViqYN6HVxk");
pub const TOKEN_HAVER_PROGRAM_ID: Pubkey = pubkey!("7gobfUihgoxA14RUnVaseoah89ggCgYAzgz1JoaPAXam");

pub const CIVIC_GATEWAY_PROGRAM_ID: Pubkey = pubkey!("gatem74V238djXdzWnJf94Wo1DcnuGkfijbf3AuBhfs");
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");
pub const CLOCK_SYSVAR_ID: Pubkey = pubkey!("SysvarC1ock11111111111111111111111111111111");
pub const RENT_SYSVAR_ID: Pubkey = pubkey!("SysvarRent111111111111111111111111111111111");
pub const INSTRUCTIONS_SYSVAR_ID: Pubkey = pubkey!("Sysvar1nstructions1111111111111111111111111");

// PDA SEEDS

pub const GOVERNANCE: &[u8] = b"governance";
pub const REALM_CONFIG: &[u8] = b"realm-config";
pub const REGISTRAR: &[u8] = b"registrar";
pub const VOTER: &[u8] = b"voter";
pub const VOTER_WEIGHT_RECORD: &[u8] = b"voter-weight-record";
pub const MAX_VOTER_WEIGHT_RECORD: &[u8] = b"max-voter-weight-record";
pub const NFT_VOTE_RECORD: &[u8] = b"nft-vote-record";
pub const GATEWAY: &[u8] = b"gateway";
pub const METADATA: &[u8] = b"metadata";

// Civic gateway tokens are derived with an 8 byte index, always zero for the primary pass
pub const GATEWAY_TOKEN_INDEX: [u8; 8] = [0; 8];

// LAYOUT SIZES

pub const ANCHOR_DISCRIMINATOR: usize = 8;
pub const MAX_DEPOSIT_ENTRIES: usize = 32;
pub const MAX_VOTING_MINTS: usize = 4;

// SPL governance account type tags (first byte of governance owned accounts)
pub const REALM_V1_ACCOUNT_TYPE: u8 = 1;
pub const TOKEN_OWNER_RECORD_V1_ACCOUNT_TYPE: u8 = 2;
pub const REALM_CONFIG_ACCOUNT_TYPE: u8 = 11;
pub const REALM_V2_ACCOUNT_TYPE: u8 = 16;
pub const TOKEN_OWNER_RECORD_V2_ACCOUNT_TYPE: u8 = 17;

// FIXED POINT

pub const SCALED_FACTOR_BASE: u64 = 1_000_000_000; // 1e9
pub const SUPPLY_FRACTION_BASE: u64 = 10_000_000_000; // 1e10, 100% of mint supply
pub const SECS_PER_DAY: u64 = 86_400;
pub const SECS_PER_MONTH: u64 = 365 * SECS_PER_DAY / 12;

// PIPELINE LIMITS

pub const MAX_NFTS_PER_CAST_VOTE: usize = 5;
pub const MAX_PLUGIN_CHAIN_DEPTH: usize = 8;
pub const DEFAULT_MAX_INSTRUCTIONS_PER_BATCH: usize = 10;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;
pub const DEFAULT_RPC_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";

pub const VANILLA_PLUGIN_NAME: &str = "vanilla";
