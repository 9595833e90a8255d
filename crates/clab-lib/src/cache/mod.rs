//! TTL caches for discovery results
//!
//! Three independent stores back the discovery engine:
//! - local labs (topology files found in the workspace)
//! - inspect labs (normalized output of the whole-lab inspection)
//! - per-container interfaces, keyed by lab path, container name and id
//!
//! Every entry carries the instant it was written. An entry is served only
//! while its age is below the TTL and its [`ValidityPolicy`] accepts it.

mod janitor;

pub use janitor::{CacheJanitor, DEFAULT_SWEEP_INTERVAL};

use crate::models::{CanonicalContainer, InterfaceRecord, LabPath};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default lifetime of every cache entry (30 seconds)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// A cached value and the instant it was fetched
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub timestamp: Instant,
}

impl<V> CacheEntry<V> {
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.timestamp)
    }

    /// `age >= ttl`; reads and sweeps share this boundary
    pub fn is_expired_at(&self, now: Instant, ttl: Duration) -> bool {
        self.age_at(now) >= ttl
    }
}

/// Extra validity rule applied on top of the TTL
pub trait ValidityPolicy<V>: Send + Sync {
    /// Caller-supplied information the rule compares against
    type Context: ?Sized;

    fn is_valid(&self, entry: &CacheEntry<V>, context: &Self::Context) -> bool;
}

/// No rule beyond the TTL
#[derive(Debug, Default, Clone, Copy)]
pub struct TtlOnly;

impl<V> ValidityPolicy<V> for TtlOnly {
    type Context = ();

    fn is_valid(&self, _entry: &CacheEntry<V>, _context: &()) -> bool {
        true
    }
}

/// Interfaces of a container together with the state they were read in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSnapshot {
    pub state: String,
    pub interfaces: Vec<InterfaceRecord>,
}

/// Entry is valid only while the container is still in the recorded state
///
/// A restart can rewire interfaces, so a state transition busts the entry
/// even inside the TTL window.
#[derive(Debug, Default, Clone, Copy)]
pub struct StateMatch;

impl ValidityPolicy<InterfaceSnapshot> for StateMatch {
    type Context = str;

    fn is_valid(&self, entry: &CacheEntry<InterfaceSnapshot>, current_state: &str) -> bool {
        entry.data.state == current_state
    }
}

/// Concurrent map of timestamped entries with a TTL and a validity policy
pub struct TtlCache<K, V, P = TtlOnly> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
    policy: P,
}

impl<K, V> TtlCache<K, V, TtlOnly>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_policy(ttl, TtlOnly)
    }
}

impl<K, V, P> TtlCache<K, V, P>
where
    K: Eq + Hash + Clone,
    V: Clone,
    P: ValidityPolicy<V>,
{
    pub fn with_policy(ttl: Duration, policy: P) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            policy,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Valid cached value for `key`, if any
    pub fn get(&self, key: &K, context: &P::Context) -> Option<V> {
        self.get_at(key, context, Instant::now())
    }

    pub fn get_at(&self, key: &K, context: &P::Context, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.is_expired_at(now, self.ttl) || !self.policy.is_valid(&entry, context) {
            return None;
        }
        Some(entry.data.clone())
    }

    pub fn insert(&self, key: K, data: V) {
        self.insert_at(key, data, Instant::now());
    }

    pub fn insert_at(&self, key: K, data: V, timestamp: Instant) {
        self.entries.insert(key, CacheEntry { data, timestamp });
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.data)
    }

    /// Whether an entry exists, regardless of validity
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry has outlived the TTL; does not mutate
    pub fn has_expired_at(&self, now: Instant) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.value().is_expired_at(now, self.ttl))
    }

    /// Drop entries that have outlived the TTL and return their keys
    ///
    /// Runs under the map's shard locks, so an entry rewritten concurrently
    /// by a discovery pass is judged by its new timestamp.
    pub fn evict_expired_at(&self, now: Instant) -> Vec<K> {
        let ttl = self.ttl;
        let mut expired = Vec::new();
        self.entries.retain(|key, entry| {
            if entry.is_expired_at(now, ttl) {
                expired.push(key.clone());
                false
            } else {
                true
            }
        });
        expired
    }
}

/// Key of the interfaces cache: `<absLabPath>::<containerName>::<containerId>`
pub fn interface_cache_key(abs_lab_path: &str, container_name: &str, container_id: &str) -> String {
    format!("{}::{}::{}", abs_lab_path, container_name, container_id)
}

/// Number of entries removed from each store by one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub local: usize,
    pub inspect: usize,
    pub interfaces: usize,
}

impl SweepReport {
    pub fn any_expired(&self) -> bool {
        self.total() > 0
    }

    pub fn total(&self) -> usize {
        self.local + self.inspect + self.interfaces
    }
}

/// The three caches used by lab discovery
pub struct LabCaches {
    /// Topology files found in the workspace; one global slot
    pub local: TtlCache<(), Arc<Vec<LabPath>>>,
    /// Normalized whole-lab inspection; one global slot
    pub inspect: TtlCache<(), Arc<Vec<CanonicalContainer>>>,
    /// Interfaces per container
    pub interfaces: TtlCache<String, InterfaceSnapshot, StateMatch>,
}

impl LabCaches {
    pub fn new(ttl: Duration) -> Self {
        Self {
            local: TtlCache::new(ttl),
            inspect: TtlCache::new(ttl),
            interfaces: TtlCache::with_policy(ttl, StateMatch),
        }
    }

    pub fn sweep_expired_at(&self, now: Instant) -> SweepReport {
        SweepReport {
            local: self.local.evict_expired_at(now).len(),
            inspect: self.inspect.evict_expired_at(now).len(),
            interfaces: self.interfaces.evict_expired_at(now).len(),
        }
    }

    pub fn has_expired_at(&self, now: Instant) -> bool {
        self.local.has_expired_at(now)
            || self.inspect.has_expired_at(now)
            || self.interfaces.has_expired_at(now)
    }

    pub fn clear_all(&self) {
        self.local.clear();
        self.inspect.clear();
        self.interfaces.clear();
    }
}

impl Default for LabCaches {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
