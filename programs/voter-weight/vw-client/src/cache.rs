// Account Cache
//
// Read-through cache over an `AccountFetcher` transport. Entries are keyed by
// (endpoint, address) so two clusters never share an entry. The pipeline only
// reads through the cache; entries are dropped by `invalidate` once the
// submission layer lands transactions that touch them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{config::RetryPolicy, errors::*};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
}

impl AccountData {
    pub fn new(owner: Pubkey, data: Vec<u8>) -> Self {
        Self {
            owner,
            lamports: 1_000_000,
            data,
        }
    }
}

/// NFT held by a wallet, as reported by an asset index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedAsset {
    pub mint: Pubkey,
    pub token_account: Pubkey,
    pub collection: Option<Pubkey>,
    pub collection_verified: bool,
}

/// Transport seam: an RPC client in production, `MemoryLedger` in tests.
#[async_trait]
pub trait AccountFetcher: Send + Sync {
    async fn fetch_account(&self, address: &Pubkey) -> std::result::Result<Option<AccountData>, String>;

    async fn fetch_owned_assets(&self, owner: &Pubkey) -> std::result::Result<Vec<OwnedAsset>, String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: Arc<str>,
    pub address: Pubkey,
}

pub struct AccountCache {
    endpoint: Arc<str>,
    fetcher: Arc<dyn AccountFetcher>,
    retry: RetryPolicy,
    accounts: RwLock<HashMap<CacheKey, Option<Arc<AccountData>>>>,
    assets: RwLock<HashMap<CacheKey, Arc<Vec<OwnedAsset>>>>,
}

impl AccountCache {
    pub fn new(endpoint: &str, fetcher: Arc<dyn AccountFetcher>, retry: RetryPolicy) -> Self {
        Self {
            endpoint: Arc::from(endpoint),
            fetcher,
            retry,
            accounts: RwLock::new(HashMap::new()),
            assets: RwLock::new(HashMap::new()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn key(&self, address: &Pubkey) -> CacheKey {
        CacheKey {
            endpoint: self.endpoint.clone(),
            address: *address,
        }
    }

    /// `Ok(None)` means the account does not exist on chain.
    pub async fn get_account(&self, address: &Pubkey) -> Result<Option<Arc<AccountData>>> {
        let key = self.key(address);
        if let Some(entry) = self.accounts.read().await.get(&key) {
            return Ok(entry.clone());
        }

        let fetched = self
            .with_retry(address, || self.fetcher.fetch_account(address))
            .await?
            .map(Arc::new);

        self.accounts.write().await.insert(key, fetched.clone());
        Ok(fetched)
    }

    pub async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(self.get_account(address).await?.is_some())
    }

    pub async fn owned_assets(&self, owner: &Pubkey) -> Result<Arc<Vec<OwnedAsset>>> {
        let key = self.key(owner);
        if let Some(entry) = self.assets.read().await.get(&key) {
            return Ok(entry.clone());
        }

        let fetched = Arc::new(self.with_retry(owner, || self.fetcher.fetch_owned_assets(owner)).await?);
        self.assets.write().await.insert(key, fetched.clone());
        Ok(fetched)
    }

    pub async fn invalidate(&self, address: &Pubkey) {
        let key = self.key(address);
        self.accounts.write().await.remove(&key);
        self.assets.write().await.remove(&key);
    }

    pub async fn clear(&self) {
        self.accounts.write().await.clear();
        self.assets.write().await.clear();
    }

    async fn with_retry<T, F, Fut>(&self, address: &Pubkey, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, String>>,
    {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(reason) => {
                    warn!(%address, attempt, attempts, %reason, "account read failed");
                    last_error = reason;
                    if attempt < attempts && self.retry.backoff_ms > 0 {
                        tokio::time::sleep(self.retry.backoff(attempt)).await;
                    }
                }
            }
        }

        Err(VoterWeightError::TransportFailure {
            address: *address,
            attempts,
            reason: last_error,
        })
    }
}

// IN-MEMORY LEDGER

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, AccountData>,
    assets: HashMap<Pubkey, Vec<OwnedAsset>>,
    latency: HashMap<Pubkey, Duration>,
    failures: HashMap<Pubkey, usize>,
    unreachable: HashSet<Pubkey>,
    reads: HashMap<Pubkey, usize>,
}

/// In-memory `AccountFetcher` with latency and failure injection.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_account(&self, address: Pubkey, account: AccountData) {
        self.state.write().await.accounts.insert(address, account);
    }

    pub async fn remove_account(&self, address: &Pubkey) {
        self.state.write().await.accounts.remove(address);
    }

    pub async fn set_owned_assets(&self, owner: Pubkey, assets: Vec<OwnedAsset>) {
        self.state.write().await.assets.insert(owner, assets);
    }

    pub async fn set_latency(&self, address: Pubkey, latency: Duration) {
        self.state.write().await.latency.insert(address, latency);
    }

    /// The next `times` reads of `address` fail.
    pub async fn fail_next_reads(&self, address: Pubkey, times: usize) {
        self.state.write().await.failures.insert(address, times);
    }

    /// Every read of `address` fails.
    pub async fn make_unreachable(&self, address: Pubkey) {
        self.state.write().await.unreachable.insert(address);
    }

    pub async fn read_count(&self, address: &Pubkey) -> usize {
        self.state.read().await.reads.get(address).copied().unwrap_or(0)
    }

    async fn before_read(&self, address: &Pubkey) -> std::result::Result<(), String> {
        let latency = {
            let mut state = self.state.write().await;
            *state.reads.entry(*address).or_default() += 1;

            if state.unreachable.contains(address) {
                return Err(format!("{} is unreachable", address));
            }
            if let Some(remaining) = state.failures.get_mut(address) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(format!("injected failure reading {}", address));
                }
            }
            state.latency.get(address).copied()
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[async_trait]
impl AccountFetcher for MemoryLedger {
    async fn fetch_account(&self, address: &Pubkey) -> std::result::Result<Option<AccountData>, String> {
        self.before_read(address).await?;
        let account = self.state.read().await.accounts.get(address).cloned();
        debug!(%address, found = account.is_some(), "ledger read");
        Ok(account)
    }

    async fn fetch_owned_assets(&self, owner: &Pubkey) -> std::result::Result<Vec<OwnedAsset>, String> {
        self.before_read(owner).await?;
        Ok(self.state.read().await.assets.get(owner).cloned().unwrap_or_default())
    }
}
