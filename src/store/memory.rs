//! In-Memory Store Module
//!
//! A memcached-like [`PersistentStore`] living inside the process.
//!
//! Keys are distributed over the registered servers by hash. Each server is
//! an independent shard with its own items, LRU order and counters.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    CasToken, LruIndex, PersistentStore, ServerAddr, ServerInfo, ServerStats, StoreError,
    StoreResult, StoredItem, StoredValue,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

// == Shard ==
/// State of one registered server.
#[derive(Debug)]
struct Shard {
    addr: ServerAddr,
    items: HashMap<String, StoredItem>,
    lru: LruIndex,
    started_at: DateTime<Utc>,
    total_items: u64,
    cmd_get: u64,
    cmd_set: u64,
    get_hits: u64,
    get_misses: u64,
    evictions: u64,
}

impl Shard {
    fn new(addr: ServerAddr) -> Self {
        Self {
            addr,
            items: HashMap::new(),
            lru: LruIndex::new(),
            started_at: Utc::now(),
            total_items: 0,
            cmd_get: 0,
            cmd_set: 0,
            get_hits: 0,
            get_misses: 0,
            evictions: 0,
        }
    }

    /// Returns the live item for `key`, dropping it first if expired.
    fn live_item(&mut self, key: &str) -> Option<&mut StoredItem> {
        if self.items.get(key).is_some_and(StoredItem::is_expired) {
            self.items.remove(key);
            self.lru.remove(key);
        }
        self.items.get_mut(key)
    }

    fn store(&mut self, key: &str, item: StoredItem, max_entries: usize) {
        if !self.items.contains_key(key) && self.items.len() >= max_entries {
            if let Some(evicted) = self.lru.pop_oldest() {
                self.items.remove(&evicted);
                self.evictions += 1;
            }
        }
        self.items.insert(key.to_string(), item);
        self.lru.touch(key);
        self.total_items += 1;
    }

    fn remove(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.items.remove(key).is_some()
    }

    fn purge_expired(&mut self, now_ms: i64) -> usize {
        let expired: Vec<String> = self
            .items
            .iter()
            .filter(|(_, item)| item.is_expired_at(now_ms))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    fn stats(&self, max_entries: usize) -> ServerStats {
        ServerStats {
            uptime: (Utc::now() - self.started_at).num_seconds(),
            curr_items: self.items.len() as u64,
            total_items: self.total_items,
            bytes: self.items.values().map(|i| i.value.len() as u64).sum(),
            limit_items: max_entries as u64,
            cmd_get: self.cmd_get,
            cmd_set: self.cmd_set,
            get_hits: self.get_hits,
            get_misses: self.get_misses,
            evictions: self.evictions,
            version: VERSION.to_string(),
        }
    }
}

// == Memory Store ==
/// In-process persistent tier shared by every request.
#[derive(Debug)]
pub struct MemoryStore {
    shards: RwLock<Vec<Shard>>,
    /// Item capacity of each server
    max_entries: usize,
    next_cas: AtomicU64,
    reachable: AtomicBool,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a store with no servers. Every operation fails with
    /// [`StoreError::NoServers`] until one is added.
    pub fn new(max_entries: usize) -> Self {
        Self {
            shards: RwLock::new(Vec::new()),
            max_entries: max_entries.max(1),
            next_cas: AtomicU64::new(1),
            reachable: AtomicBool::new(true),
        }
    }

    /// Creates a store with the given servers already registered.
    pub fn with_servers(max_entries: usize, servers: &[ServerAddr]) -> Self {
        let mut shards: Vec<Shard> = Vec::with_capacity(servers.len());
        for addr in servers {
            if !shards.iter().any(|s| &s.addr == addr) {
                shards.push(Shard::new(addr.clone()));
            }
        }
        Self {
            shards: RwLock::new(shards),
            ..Self::new(max_entries)
        }
    }

    // == Fault Injection ==
    /// Simulates losing (or regaining) the network path to every server.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    // == Cleanup Expired ==
    /// Removes expired items from every server. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = super::entry::current_timestamp_ms();
        let mut shards = self.shards.write().await;
        shards.iter_mut().map(|s| s.purge_expired(now)).sum()
    }

    /// Total live and expired-but-unswept items across servers.
    pub async fn len(&self) -> usize {
        self.shards.read().await.iter().map(|s| s.items.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_reachable(&self) -> StoreResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unreachable("all servers down".to_string()))
        }
    }

    fn next_token(&self) -> u64 {
        self.next_cas.fetch_add(1, Ordering::Relaxed)
    }

    /// Runs `op` against the shard owning `key`.
    async fn with_shard<T>(&self, key: &str, op: impl FnOnce(&mut Shard) -> T) -> StoreResult<T> {
        self.check_reachable()?;
        let mut shards = self.shards.write().await;
        if shards.is_empty() {
            return Err(StoreError::NoServers);
        }
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() % shards.len() as u64) as usize;
        Ok(op(&mut shards[idx]))
    }

    async fn adjust(
        &self,
        key: &str,
        apply: impl FnOnce(u64) -> u64,
    ) -> StoreResult<Option<u64>> {
        let token = self.next_token();
        self.with_shard(key, |shard| -> StoreResult<Option<u64>> {
            let Some(item) = shard.live_item(key) else {
                return Ok(None);
            };
            let text = String::from_utf8_lossy(&item.value);
            let current: u64 = text
                .trim()
                .parse()
                .map_err(|_| StoreError::NotNumeric(key.to_string()))?;
            let next = apply(current);
            item.replace_value(next.to_string().into_bytes(), token);
            shard.lru.touch(key);
            Ok(Some(next))
        })
        .await?
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn add_server(&self, host: &str, port: u16) -> StoreResult<()> {
        let addr = ServerAddr::new(host, port);
        let mut shards = self.shards.write().await;
        if !shards.iter().any(|s| s.addr == addr) {
            debug!("Registering store server {}", addr);
            shards.push(Shard::new(addr));
        }
        Ok(())
    }

    async fn get_with_token(&self, key: &str) -> StoreResult<Option<StoredValue>> {
        self.with_shard(key, |shard| {
            shard.cmd_get += 1;
            let found = shard.live_item(key).map(|item| StoredValue {
                value: item.value.clone(),
                token: CasToken(item.cas),
            });
            if found.is_some() {
                shard.get_hits += 1;
                shard.lru.touch(key);
            } else {
                shard.get_misses += 1;
            }
            found
        })
        .await
    }

    async fn add(&self, key: &str, value: &[u8], ttl: u64) -> StoreResult<bool> {
        let token = self.next_token();
        let max_entries = self.max_entries;
        self.with_shard(key, |shard| {
            shard.cmd_set += 1;
            if shard.live_item(key).is_some() {
                return false;
            }
            shard.store(key, StoredItem::new(value.to_vec(), token, ttl), max_entries);
            true
        })
        .await
    }

    async fn cas(&self, token: CasToken, key: &str, value: &[u8], ttl: u64) -> StoreResult<bool> {
        let next = self.next_token();
        let max_entries = self.max_entries;
        self.with_shard(key, |shard| {
            shard.cmd_set += 1;
            let current = shard.live_item(key).is_some_and(|item| item.cas == token.0);
            if current {
                shard.store(key, StoredItem::new(value.to_vec(), next, ttl), max_entries);
            }
            current
        })
        .await
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.with_shard(key, |shard| {
            let live = shard.live_item(key).is_some();
            live && shard.remove(key)
        })
        .await
    }

    async fn increment(&self, key: &str, n: u64) -> StoreResult<Option<u64>> {
        self.adjust(key, |current| current.wrapping_add(n)).await
    }

    async fn decrement(&self, key: &str, n: u64) -> StoreResult<Option<u64>> {
        self.adjust(key, |current| current.saturating_sub(n)).await
    }

    async fn stats(&self) -> StoreResult<BTreeMap<String, ServerStats>> {
        self.check_reachable()?;
        let shards = self.shards.read().await;
        Ok(shards
            .iter()
            .map(|s| (s.addr.to_string(), s.stats(self.max_entries)))
            .collect())
    }

    async fn server_list(&self) -> StoreResult<Vec<ServerInfo>> {
        let shards = self.shards.read().await;
        Ok(shards
            .iter()
            .map(|s| ServerInfo {
                host: s.addr.host.clone(),
                port: s.addr.port,
                weight: 0,
            })
            .collect())
    }
}
