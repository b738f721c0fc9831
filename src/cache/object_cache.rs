//! Object Cache Module
//!
//! Request-scoped orchestrator layering the local cache over the shared
//! persistent store.
//!
//! # Consistency protocol
//!
//! Writes to the shared tier never read-modify-write across two calls.
//! An absent key is created with `add`; a present key is replaced with `cas`
//! using the token from the preceding read. Losing either race deletes the
//! key from the shared tier and reports failure. There is no retry loop;
//! retry policy belongs to the caller.
//!
//! # Isolation
//!
//! The shared tier is skipped entirely for non-persistent groups, for
//! tenant-scoped groups until the tenant is resolved, and for the whole
//! request when the startup canary failed.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::cache::key::{hash_key_string, key_string};
use crate::cache::stats::{Counter, StatsRecorder, StatsSnapshot};
use crate::cache::{
    CacheKey, CacheValue, GroupClass, GroupClassifier, LocalCache, ScopePrefix, TenantContext,
};
use crate::error::{CacheError, Result};
use crate::store::{PersistentStore, ServerAddr};

/// Base TTL in seconds when none is configured.
pub const DEFAULT_BASE_TTL: u64 = 3600;

/// Prefix of the throwaway key written at startup.
const CANARY_PREFIX: &str = "object-cache-canary-";

// == Cache Settings ==
/// Per-request construction parameters.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// False runs the cache in local-only mode without touching the store
    pub enabled: bool,
    /// Lower bound of the jittered default TTL, in seconds
    pub base_ttl: u64,
    /// Servers registered with the store before the canary write
    pub servers: Vec<ServerAddr>,
    /// Extra groups shared by every tenant
    pub global_groups: Vec<String>,
    /// Extra groups kept out of the persistent tier
    pub non_persistent_groups: Vec<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_ttl: DEFAULT_BASE_TTL,
            servers: vec![ServerAddr::new("127.0.0.1", crate::store::DEFAULT_PORT)],
            global_groups: Vec::new(),
            non_persistent_groups: Vec::new(),
        }
    }
}

// == Bypass ==
/// Why an operation stayed in the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bypass {
    /// Persistent tier unavailable for this request
    Degraded,
    NonPersistentGroup,
    TenantUnresolved,
}

impl fmt::Display for Bypass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bypass::Degraded => f.write_str("persistent cache not active"),
            Bypass::NonPersistentGroup => f.write_str("group is non-persistent"),
            Bypass::TenantUnresolved => f.write_str("tenant not resolved"),
        }
    }
}

/// Where an operation is allowed to go.
enum Route {
    Local(Bypass),
    Shared(Arc<dyn PersistentStore>),
}

// == Object Cache ==
/// Two-tier cache for one request. Not shared between requests.
pub struct ObjectCache {
    /// Present only when the canary write succeeded
    persistent: Option<Arc<dyn PersistentStore>>,
    tenant: Arc<dyn TenantContext>,
    groups: GroupClassifier,
    local: LocalCache,
    stats: StatsRecorder,
    active: bool,
    base_ttl: u64,
    default_ttl: u64,
    rng: StdRng,
}

impl ObjectCache {
    // == Constructor ==
    /// Builds the cache for a request, probing the store with a canary write.
    ///
    /// Never fails: an absent, disabled or unreachable store leaves the cache
    /// in local-only mode for the rest of the request.
    pub async fn connect(
        store: Option<Arc<dyn PersistentStore>>,
        tenant: Arc<dyn TenantContext>,
        settings: &CacheSettings,
    ) -> Self {
        Self::connect_with_rng(store, tenant, settings, StdRng::from_entropy()).await
    }

    /// Like [`ObjectCache::connect`] with a caller-supplied random source,
    /// which drives the TTL jitter.
    pub async fn connect_with_rng(
        store: Option<Arc<dyn PersistentStore>>,
        tenant: Arc<dyn TenantContext>,
        settings: &CacheSettings,
        mut rng: StdRng,
    ) -> Self {
        let mut stats = StatsRecorder::new();
        stats.record(format!("Object cache constructor {}", rng.gen_range(1000..=9999)));

        let persistent = match store {
            _ if !settings.enabled => {
                stats.record("Using session cache only - object cache has been deactivated.");
                None
            }
            None => {
                stats.record("Using session cache only - object cache is not available.");
                None
            }
            Some(store) => {
                let canary = format!("{}{}", CANARY_PREFIX, rng.gen::<u64>());
                if probe(store.as_ref(), &settings.servers, &canary).await {
                    Some(store)
                } else {
                    info!("Persistent cache unreachable, using session cache only");
                    stats.record("Using session cache only - error connecting to persistent cache.");
                    None
                }
            }
        };

        let mut cache = Self {
            persistent,
            tenant,
            groups: GroupClassifier::new(),
            local: LocalCache::new(),
            stats,
            active: false,
            base_ttl: settings.base_ttl,
            default_ttl: settings.base_ttl,
            rng,
        };
        if !settings.global_groups.is_empty() {
            cache.add_global_groups(settings.global_groups.iter().cloned());
        }
        if !settings.non_persistent_groups.is_empty() {
            cache.add_non_persistent_groups(settings.non_persistent_groups.iter().cloned());
        }
        cache.activate();
        cache
    }

    // == Activate ==
    /// Switches to tenant-scoped keys once the tenant is resolved.
    ///
    /// The first successful call fixes the default TTL to a value drawn from
    /// `[base_ttl, 1.5 * base_ttl]`. Later calls are no-ops. Returns whether
    /// the cache is active.
    pub fn activate(&mut self) -> bool {
        if self.active {
            return true;
        }
        if !self.tenant.is_resolved() {
            self.stats
                .record("Activate: unable to determine tenant - only global keys will persist.");
            return false;
        }
        self.active = true;
        self.default_ttl = self
            .rng
            .gen_range(self.base_ttl..=self.base_ttl.saturating_add(self.base_ttl / 2));
        self.stats.record(format!(
            "Activate: tenant is {} & default expiration is {} seconds. Setting active.",
            self.tenant.id(),
            self.default_ttl
        ));
        true
    }

    // == Get ==
    /// Looks up an item, local cache first.
    pub async fn get(&mut self, id: impl fmt::Display, group: &str) -> Option<CacheValue> {
        let id = id.to_string();
        let (key, class) = self.key(&id, group);

        if let Some(value) = self.local.get(&key).cloned() {
            let n = self.stats.increment(Counter::SessionHit);
            self.stats.record(format!(
                "Retrieved {}, {} from session cache. Session hits: {}",
                group, id, n
            ));
            return Some(value);
        }

        let store = match self.route(class) {
            Route::Local(Bypass::Degraded) => {
                let n = self.stats.increment(Counter::Miss);
                self.stats.record(format!(
                    "Unable to retrieve {}, {}; {}. Misses: {}",
                    group,
                    id,
                    Bypass::Degraded,
                    n
                ));
                return None;
            }
            Route::Local(reason) => {
                let n = self.stats.increment(Counter::Excluded);
                self.stats.record(format!(
                    "Unable to retrieve {}, {}; {}. Excluded: {}",
                    group, id, reason, n
                ));
                return None;
            }
            Route::Shared(store) => store,
        };

        let found = match store.get_with_token(key.as_str()).await {
            Ok(Some(stored)) => CacheValue::from_bytes(&stored.value).map_err(|e| e.to_string()),
            Ok(None) => Err("persistent cache miss".to_string()),
            Err(e) => {
                warn!(group, id = %id, error = %e, "Persistent cache read failed");
                Err(e.to_string())
            }
        };

        match found {
            Ok(value) => {
                self.local.put(key, value.clone());
                let n = self.stats.increment(Counter::PersistentHit);
                self.stats.note_access(group, &id);
                self.stats.record(format!(
                    "Retrieved {}, {} from persistent cache. Persistent hits: {}",
                    group, id, n
                ));
                Some(value)
            }
            Err(reason) => {
                let n = self.stats.increment(Counter::Miss);
                self.stats.record(format!(
                    "Unable to retrieve {}, {}; {}. Misses: {}",
                    group, id, reason, n
                ));
                None
            }
        }
    }

    // == Set ==
    /// Stores an item. A `ttl` of zero uses the default TTL.
    ///
    /// Fails with [`CacheError::Conflict`] when a concurrent writer won the
    /// race; the key has then been deleted from the persistent tier.
    pub async fn set(
        &mut self,
        id: impl fmt::Display,
        data: impl Into<CacheValue>,
        group: &str,
        ttl: u64,
    ) -> Result<()> {
        let id = id.to_string();
        let value = data.into();
        let (key, class) = self.key(&id, group);
        let ttl = if ttl == 0 { self.default_ttl } else { ttl };

        if self.local.holds(&key, &value) {
            self.stats.record(format!(
                "Not adding {}, {} to cache - value already in session cache.",
                group, id
            ));
            return Ok(());
        }

        let store = match self.route(class) {
            Route::Local(reason) => {
                if reason != Bypass::Degraded {
                    self.stats.increment(Counter::Excluded);
                }
                self.local.put(key, value);
                self.stats.note_access(group, &id);
                self.stats.record(format!(
                    "Adding {}, {} to session cache only - {}.",
                    group, id, reason
                ));
                return Ok(());
            }
            Route::Shared(store) => store,
        };

        let current = match store.get_with_token(key.as_str()).await {
            Ok(current) => current,
            Err(e) => {
                self.invalidate(store.as_ref(), &key, group, &id, &e.to_string())
                    .await;
                return Err(e.into());
            }
        };

        let bytes = value.to_bytes();
        let (verb, written) = match current {
            None => ("Adding", store.add(key.as_str(), &bytes, ttl).await),
            Some(stored) => {
                let unchanged = CacheValue::from_bytes(&stored.value)
                    .map(|cached| cached == value)
                    .unwrap_or(false);
                if unchanged {
                    self.local.put(key, value);
                    self.stats.record(format!(
                        "Not adding {}, {} to cache - value already in persistent cache.",
                        group, id
                    ));
                    return Ok(());
                }
                (
                    "Updating",
                    store.cas(stored.token, key.as_str(), &bytes, ttl).await,
                )
            }
        };

        match written {
            Ok(true) => {
                self.local.put(key, value);
                let n = self.stats.increment(Counter::Update);
                self.stats.note_access(group, &id);
                self.stats.record(format!(
                    "{} {}, {} in cache with expiration {}. Updates: {}",
                    verb, group, id, ttl, n
                ));
                Ok(())
            }
            Ok(false) => {
                self.invalidate(store.as_ref(), &key, group, &id, "lost race to a concurrent writer")
                    .await;
                Err(CacheError::Conflict(format!("{}/{}", group, id)))
            }
            Err(e) => {
                self.invalidate(store.as_ref(), &key, group, &id, &e.to_string())
                    .await;
                Err(e.into())
            }
        }
    }

    /// Alias of [`ObjectCache::set`]; callers asking for add-if-absent still
    /// get a write so stale values cannot stick in the shared tier.
    pub async fn add(
        &mut self,
        id: impl fmt::Display,
        data: impl Into<CacheValue>,
        group: &str,
        ttl: u64,
    ) -> Result<()> {
        self.set(id, data, group, ttl).await
    }

    /// Alias of [`ObjectCache::set`].
    pub async fn replace(
        &mut self,
        id: impl fmt::Display,
        data: impl Into<CacheValue>,
        group: &str,
        ttl: u64,
    ) -> Result<()> {
        self.set(id, data, group, ttl).await
    }

    // == Delete ==
    /// Removes an item from both tiers.
    ///
    /// Returns `Ok(false)` only when the persistent tier did not hold the key.
    /// Bypassed groups always report `Ok(true)`.
    pub async fn delete(&mut self, id: impl fmt::Display, group: &str) -> Result<bool> {
        let id = id.to_string();
        let (key, class) = self.key(&id, group);
        self.local.delete(&key);

        match self.route(class) {
            Route::Local(reason) => {
                self.stats.record(format!(
                    "Deleted {}, {} from session cache only - {}.",
                    group, id, reason
                ));
                Ok(true)
            }
            Route::Shared(store) => {
                self.stats
                    .record(format!("Deleting {}, {} from cache.", group, id));
                match store.delete(key.as_str()).await {
                    Ok(found) => Ok(found),
                    Err(e) => {
                        warn!(group, id = %id, error = %e, "Persistent cache delete failed");
                        self.stats.record(format!(
                            "Unable to delete {}, {} from persistent cache - {}.",
                            group, id, e
                        ));
                        Err(e.into())
                    }
                }
            }
        }
    }

    // == Increment / Decrement ==
    /// Atomically adds `n` to a counter in the persistent tier.
    pub async fn incr(&mut self, id: impl fmt::Display, n: u64, group: &str) -> Result<u64> {
        self.adjust(id.to_string(), n, group, true).await
    }

    /// Atomically subtracts `n` from a counter in the persistent tier,
    /// flooring at zero.
    pub async fn decr(&mut self, id: impl fmt::Display, n: u64, group: &str) -> Result<u64> {
        self.adjust(id.to_string(), n, group, false).await
    }

    // == Flush ==
    /// Clears the local cache. The persistent tier is untouched.
    pub fn flush(&mut self) {
        self.stats.record("Flushing session cache.");
        self.local.clear();
    }

    // == Stats ==
    /// Snapshot of this request's statistics plus live server introspection.
    pub async fn stats(&self) -> StatsSnapshot {
        let Some(store) = &self.persistent else {
            return self.stats.snapshot(None, None);
        };
        let server_stats = store
            .stats()
            .await
            .map_err(|e| warn!(error = %e, "Failed to read server stats"))
            .ok();
        let server_list = store
            .server_list()
            .await
            .map_err(|e| warn!(error = %e, "Failed to read server list"))
            .ok();
        self.stats.snapshot(server_stats, server_list)
    }

    // == Group Lists ==
    /// Adds groups shared across tenants. Returns the updated list.
    pub fn add_global_groups<I, S>(&mut self, groups: I) -> &BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let groups: Vec<String> = groups.into_iter().map(Into::into).collect();
        self.stats
            .record(format!("Adding {:?} to global groups.", groups));
        self.groups.add_global_groups(groups)
    }

    /// Adds groups kept out of the persistent tier. Returns the updated list.
    pub fn add_non_persistent_groups<I, S>(&mut self, groups: I) -> &BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let groups: Vec<String> = groups.into_iter().map(Into::into).collect();
        self.stats
            .record(format!("Adding {:?} to non-persistent groups.", groups));
        self.groups.add_non_persistent_groups(groups)
    }

    // == Accessors ==
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_persistent_active(&self) -> bool {
        self.persistent.is_some()
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    pub fn groups(&self) -> &GroupClassifier {
        &self.groups
    }

    pub fn recorder(&self) -> &StatsRecorder {
        &self.stats
    }

    // == Internals ==
    /// Derives the key for an item and logs the derivation.
    fn key(&mut self, id: &str, group: &str) -> (CacheKey, GroupClass) {
        let class = self.groups.classify(group);
        let scope = if class == GroupClass::Global {
            ScopePrefix::Global
        } else if self.active {
            ScopePrefix::Tenant(self.tenant.id())
        } else {
            ScopePrefix::Session
        };
        let keystring = key_string(&scope, group, id, &self.tenant.namespace());
        let key = hash_key_string(&keystring);
        self.stats
            .record(format!("Generated key {} from {}.", key, keystring));
        (key, class)
    }

    fn route(&self, class: GroupClass) -> Route {
        match &self.persistent {
            None => Route::Local(Bypass::Degraded),
            Some(_) if class == GroupClass::NonPersistent => {
                Route::Local(Bypass::NonPersistentGroup)
            }
            Some(_) if class == GroupClass::TenantScoped && !self.active => {
                Route::Local(Bypass::TenantUnresolved)
            }
            Some(store) => Route::Shared(Arc::clone(store)),
        }
    }

    /// Drops a key whose shared state is now ambiguous and counts the failure.
    async fn invalidate(
        &mut self,
        store: &dyn PersistentStore,
        key: &CacheKey,
        group: &str,
        id: &str,
        reason: &str,
    ) {
        if let Err(e) = store.delete(key.as_str()).await {
            warn!(group, id, error = %e, "Failed to invalidate key after write failure");
        }
        self.local.delete(key);
        let n = self.stats.increment(Counter::Failure);
        warn!(group, id, reason, "Persistent cache write failed");
        self.stats.record(format!(
            "Not adding {}, {} to cache - persistent write failure ({}). Write failures: {}",
            group, id, reason, n
        ));
    }

    async fn adjust(&mut self, id: String, n: u64, group: &str, up: bool) -> Result<u64> {
        let (key, _) = self.key(&id, group);
        let (verb, op) = if up {
            ("Incrementing", "increment")
        } else {
            ("Decrementing", "decrement")
        };
        self.stats
            .record(format!("{} {}, {} in persistent cache.", verb, group, id));

        let Some(store) = self.persistent.clone() else {
            self.local.delete(&key);
            self.stats.record(format!(
                "Unable to {} {}, {} - {}.",
                op,
                group,
                id,
                Bypass::Degraded
            ));
            return Err(CacheError::PersistentUnavailable(format!("{}/{}", group, id)));
        };

        let result = if up {
            store.increment(key.as_str(), n).await
        } else {
            store.decrement(key.as_str(), n).await
        };

        match result {
            Ok(Some(value)) => {
                debug!(group, id = %id, value, "Counter adjusted");
                self.local.put(key, CacheValue::from(value));
                Ok(value)
            }
            Ok(None) => {
                self.local.delete(&key);
                self.stats.record(format!(
                    "Unable to {} {}, {} - key not in persistent cache.",
                    op, group, id
                ));
                Err(CacheError::NotFound(format!("{}/{}", group, id)))
            }
            Err(e) => {
                self.local.delete(&key);
                warn!(group, id = %id, error = %e, "Persistent counter update failed");
                self.stats
                    .record(format!("Unable to {} {}, {} - {}.", op, group, id, e));
                Err(e.into())
            }
        }
    }
}

/// Registers servers and performs the add-then-delete canary write.
async fn probe(store: &dyn PersistentStore, servers: &[ServerAddr], canary: &str) -> bool {
    for server in servers {
        if let Err(e) = store.add_server(&server.host, server.port).await {
            warn!(server = %server, error = %e, "Failed to register cache server");
        }
    }
    match store.add(canary, b"1", 1).await {
        Ok(true) => {
            if let Err(e) = store.delete(canary).await {
                debug!(error = %e, "Canary delete failed");
            }
            true
        }
        Ok(false) => false,
        Err(e) => {
            warn!(error = %e, "Canary write failed");
            false
        }
    }
}

impl fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache")
            .field("persistent_active", &self.is_persistent_active())
            .field("active", &self.active)
            .field("default_ttl", &self.default_ttl)
            .field("local_entries", &self.local.len())
            .finish()
    }
}
