// Copyright 2026 foyer Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    collections::HashMap,
    fmt::Debug,
    ops::RangeBounds,
    sync::Arc,
    time::{Instant, SystemTime},
};

use dictcache_common::{
    clock::{Clock, SystemClock},
    error::Result,
    metrics::{model::Metrics, registry::noop::NoopMetricsRegistry, BoxedRegistry},
    strict_assert,
};
use dictcache_storage::BlobStore;
use itertools::Itertools;
use parking_lot::Mutex;
use url::Url;

use crate::{
    backend::{DiskBackend, MemoryBackend, Payload, PayloadHandle, StorageBackend},
    dictionary::SharedDictionary,
    eviction::{self, EvictionCandidate, EvictionLimits, EvictionScope},
    index::StoredDictionary,
    isolation::{IsolationKey, Origin},
    manifest::{Manifest, ManifestEntry},
    record::DictionaryRecord,
    request::DictionaryRequest,
    storage::{DictionaryStorage, StorageInner},
};

/// Default count cap of a dictionary manager.
pub const DEFAULT_CACHE_MAX_COUNT: usize = 1000;

/// Matcher of the URLs identifying data to clear.
pub type UrlMatcher = dyn Fn(&Url) -> bool + Send + Sync;

/// Total usage of a dictionary manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    /// Total payload size in bytes.
    pub size: u64,
    /// Count of dictionaries.
    pub count: usize,
}

/// Usage of a single partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageInfo {
    /// Isolation key of the partition.
    pub isolation_key: IsolationKey,
    /// Total payload size in bytes.
    pub size: u64,
    /// Count of dictionaries.
    pub count: usize,
}

#[derive(Debug)]
struct ManagerState {
    storages: HashMap<IsolationKey, Arc<StorageInner>>,
    limits: EvictionLimits,
}

#[derive(Debug)]
pub(crate) struct ManagerInner {
    name: &'static str,
    state: Mutex<ManagerState>,
    /// Serializes manifest writes so the latest snapshot is written last.
    persist_lock: tokio::sync::Mutex<()>,
    pub(crate) backend: Arc<dyn StorageBackend>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Arc<Metrics>,
}

impl ManagerInner {
    fn storage(self: &Arc<Self>, isolation_key: &IsolationKey) -> DictionaryStorage {
        let mut state = self.state.lock();
        let inner = state
            .storages
            .entry(isolation_key.clone())
            .or_insert_with(|| Arc::new(StorageInner::new(isolation_key.clone(), Arc::downgrade(self))))
            .clone();
        DictionaryStorage { inner }
    }

    /// Called when a partition handle is dropped.
    pub(crate) fn release_storage(&self, storage: &Arc<StorageInner>) {
        let mut state = self.state.lock();
        // The handle being dropped and the registry.
        if Arc::strong_count(storage) > 2 || !storage.index.lock().is_empty() {
            return;
        }
        if state
            .storages
            .get(&storage.isolation_key)
            .is_some_and(|registered| Arc::ptr_eq(registered, storage))
        {
            state.storages.remove(&storage.isolation_key);
            tracing::trace!(key = %storage.isolation_key, "[dictionary manager]: drop empty partition");
        }
    }

    pub(crate) fn match_dictionary(
        &self,
        storage: &StorageInner,
        url: &Url,
        filter: impl Fn(&DictionaryRecord) -> bool,
    ) -> Option<SharedDictionary> {
        let now = self.clock.now();
        let mut index = storage.index.lock();
        match index.find(url, now, filter) {
            Some(found) => {
                found.record.touch(now);
                self.metrics.dictionary_hit.increase(1);
                tracing::trace!(
                    key = %storage.isolation_key,
                    %url,
                    pattern = found.record.match_pattern(),
                    "[dictionary manager]: match hit"
                );
                Some(SharedDictionary::new(&found.record, found.payload.clone()))
            }
            None => {
                self.metrics.dictionary_miss.increase(1);
                tracing::trace!(key = %storage.isolation_key, %url, "[dictionary manager]: match miss");
                None
            }
        }
    }

    /// Insert a committed dictionary into the registered partition of `storage` and run eviction for its site.
    pub(crate) fn commit(&self, storage: &Arc<StorageInner>, dictionary: StoredDictionary) {
        let mut state = self.state.lock();

        // The partition may have been cleared and replaced while the writer was in flight.
        let target = state
            .storages
            .entry(storage.isolation_key.clone())
            .or_insert_with(|| storage.clone())
            .clone();
        let site = target.isolation_key.top_frame_site().clone();

        let mut released = vec![];
        match target.index.lock().insert(dictionary) {
            Some(old) => {
                self.metrics.dictionary_replace.increase(1);
                released.push(old);
            }
            None => self.metrics.dictionary_insert.increase(1),
        }
        released.extend(self.evict(&mut state, EvictionScope::Site(&site)));
        self.update_usage(&state);

        drop(state);
        Self::release_dictionaries(released);
    }

    /// Run eviction and remove the picked dictionaries from their partitions.
    fn evict(&self, state: &mut ManagerState, scope: EvictionScope<'_>) -> Vec<StoredDictionary> {
        let mut candidates = vec![];
        for storage in state.storages.values() {
            for d in storage.index.lock().iter() {
                candidates.push(EvictionCandidate {
                    isolation_key: storage.isolation_key.clone(),
                    origin: d.record.registered_origin().clone(),
                    pattern: d.record.match_pattern().to_string(),
                    size: d.record.size(),
                    last_used_time: d.record.last_used_time(),
                    response_time: d.record.response_time(),
                });
            }
        }

        let mut evicted = vec![];
        for i in eviction::pick(&candidates, state.limits, scope) {
            let candidate = &candidates[i];
            let removed = state
                .storages
                .get(&candidate.isolation_key)
                .and_then(|storage| storage.index.lock().remove(&candidate.origin, &candidate.pattern));
            strict_assert!(removed.is_some());
            if let Some(removed) = removed {
                tracing::debug!(
                    key = %candidate.isolation_key,
                    url = %removed.record.source_url(),
                    pattern = candidate.pattern,
                    size = candidate.size,
                    "[dictionary manager]: evict dictionary"
                );
                evicted.push(removed);
            }
        }
        self.metrics.dictionary_evict.increase(evicted.len() as _);

        Self::prune(state);
        evicted
    }

    /// Remove every dictionary `f` selects.
    fn remove_where(&self, mut f: impl FnMut(&IsolationKey, &DictionaryRecord) -> bool) -> Vec<StoredDictionary> {
        let mut state = self.state.lock();
        let mut removed = vec![];
        for storage in state.storages.values() {
            removed.extend(storage.index.lock().retain(|record| !f(&storage.isolation_key, record)));
        }
        self.metrics.dictionary_remove.increase(removed.len() as _);
        Self::prune(&mut state);
        self.update_usage(&state);
        removed
    }

    /// Forget partitions that are empty and not referenced by any handle.
    fn prune(state: &mut ManagerState) {
        state
            .storages
            .retain(|_, storage| Arc::strong_count(storage) > 1 || !storage.index.lock().is_empty());
    }

    fn update_usage(&self, state: &ManagerState) {
        let usage = Self::usage_locked(state);
        self.metrics.dictionary_usage_bytes.absolute(usage.size);
        self.metrics.dictionary_usage_count.absolute(usage.count as _);
    }

    fn usage_locked(state: &ManagerState) -> Usage {
        state.storages.values().fold(Usage::default(), |usage, storage| {
            let index = storage.index.lock();
            Usage {
                size: usage.size + index.size(),
                count: usage.count + index.len(),
            }
        })
    }

    /// Doom released payloads. Each one is deleted once the last read handle drops it.
    fn release_dictionaries(released: Vec<StoredDictionary>) {
        for d in released {
            d.payload.doom();
        }
    }

    fn manifest(&self) -> Manifest {
        let state = self.state.lock();
        let mut entries = vec![];
        for storage in state.storages.values() {
            for d in storage.index.lock().iter() {
                if let Some(token) = d.payload.token() {
                    entries.push(ManifestEntry {
                        isolation_key: storage.isolation_key.clone(),
                        record: d.record.clone(),
                        token,
                    });
                }
            }
        }
        Manifest::new(entries)
    }

    async fn flush(&self) -> Result<()> {
        if !self.backend.is_persistent() {
            return Ok(());
        }
        let _guard = self.persist_lock.lock().await;
        let manifest = self.manifest();
        self.backend.persist(&manifest).await
    }

    /// Persist the manifest. Best-effort.
    pub(crate) async fn persist(&self) {
        if let Err(e) = self.flush().await {
            tracing::warn!("[dictionary manager]: persist manifest failed: {e}");
        }
    }

    async fn recover(self: &Arc<Self>) -> Result<()> {
        let Some(manifest) = self.backend.recover().await? else {
            return Ok(());
        };

        let now = self.clock.now();
        let mut state = self.state.lock();

        let total = manifest.entries.len();
        let mut released = vec![];
        for entry in manifest.entries {
            let payload = Arc::new(Payload::new(PayloadHandle::Blob(entry.token), self.backend.clone()));
            let dictionary = StoredDictionary {
                record: entry.record,
                payload,
            };
            if !dictionary.record.is_live(now) {
                released.push(dictionary);
                continue;
            }
            let storage = state
                .storages
                .entry(entry.isolation_key.clone())
                .or_insert_with(|| Arc::new(StorageInner::new(entry.isolation_key, Arc::downgrade(self))));
            released.extend(storage.index.lock().insert(dictionary));
        }
        released.extend(self.evict(&mut state, EvictionScope::All));
        self.update_usage(&state);

        let usage = Self::usage_locked(&state);
        drop(state);

        tracing::info!(
            name = self.name,
            recovered = usage.count,
            size = usage.size,
            dropped = total - usage.count,
            "[dictionary manager]: recovered"
        );

        let changed = !released.is_empty();
        Self::release_dictionaries(released);
        if changed {
            self.persist().await;
        }
        Ok(())
    }
}

/// Process-wide registry of dictionary partitions with the global byte and count caps.
///
/// The manager is cheap to clone. All clones share the same state.
#[derive(Debug, Clone)]
pub struct DictionaryManager {
    inner: Arc<ManagerInner>,
}

impl DictionaryManager {
    /// Name of the manager.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Whether dictionaries are kept on disk and survive the manager.
    pub fn is_persistent(&self) -> bool {
        self.inner.backend.is_persistent()
    }

    /// Get the partition of `isolation_key`, creating it if needed.
    pub fn storage(&self, isolation_key: &IsolationKey) -> DictionaryStorage {
        self.inner.storage(isolation_key)
    }

    /// Find a dictionary for an outgoing request.
    ///
    /// Returns `None` without touching any partition if the request did not opt in to shared dictionaries.
    /// Dictionaries whose `match-dest` does not include the request destination are skipped.
    pub fn lookup(&self, request: &DictionaryRequest) -> Option<SharedDictionary> {
        if !request.shared_dictionary() {
            tracing::trace!(url = %request.url(), "[dictionary manager]: request did not opt in, skip lookup");
            return None;
        }
        let storage = self.inner.state.lock().storages.get(request.isolation_key()).cloned();
        let Some(storage) = storage else {
            self.inner.metrics.dictionary_miss.increase(1);
            return None;
        };
        let destination = request.destination();
        self.inner.match_dictionary(&storage, request.url(), |record| {
            record.match_dest().is_empty() || record.match_dest().contains(&destination)
        })
    }

    /// Current byte cap. `0` means unbounded.
    pub fn cache_max_size(&self) -> u64 {
        self.inner.state.lock().limits.max_size
    }

    /// Current count cap.
    pub fn cache_max_count(&self) -> usize {
        self.inner.state.lock().limits.max_count
    }

    /// Change the byte cap and run eviction for every site. `0` means unbounded.
    pub async fn set_cache_max_size(&self, cache_max_size: u64) {
        let mut state = self.inner.state.lock();
        state.limits.max_size = cache_max_size;
        let evicted = self.inner.evict(&mut state, EvictionScope::All);
        self.inner.update_usage(&state);
        drop(state);

        tracing::debug!(
            cache_max_size,
            evicted = evicted.len(),
            "[dictionary manager]: set cache max size"
        );

        let changed = !evicted.is_empty();
        ManagerInner::release_dictionaries(evicted);
        if changed {
            self.inner.persist().await;
        }
    }

    /// Remove every dictionary received within `range` that `matcher` selects.
    ///
    /// A dictionary is selected if the matcher accepts any of: the frame origin or the top-level site of its
    /// partition, its source URL, or its registered origin. Without a matcher every dictionary in range is removed.
    pub async fn clear_data<R>(&self, range: R, matcher: Option<&UrlMatcher>)
    where
        R: RangeBounds<SystemTime> + Send,
    {
        let removed = self.inner.remove_where(|key, record| {
            if !range.contains(&record.response_time()) {
                return false;
            }
            let Some(matcher) = matcher else {
                return true;
            };
            key.frame_origin().url().is_some_and(|url| matcher(&url))
                || key.top_frame_site().url().is_some_and(|url| matcher(&url))
                || matcher(record.source_url())
                || record.registered_origin().url().is_some_and(|url| matcher(&url))
        });
        self.after_clear("clear data", removed).await;
    }

    /// Remove every dictionary of a partition.
    pub async fn clear_data_for_isolation_key(&self, isolation_key: &IsolationKey) {
        let removed = self.inner.remove_where(|key, _| key == isolation_key);
        self.after_clear("clear data for isolation key", removed).await;
    }

    /// Remove every dictionary whose live window has ended.
    pub async fn clear_expired(&self) {
        let now = self.inner.clock.now();
        let removed = self.inner.remove_where(|_, record| !record.is_live(now));
        self.after_clear("clear expired", removed).await;
    }

    async fn after_clear(&self, op: &'static str, removed: Vec<StoredDictionary>) {
        tracing::debug!(op, removed = removed.len(), "[dictionary manager]: clear");
        let changed = !removed.is_empty();
        ManagerInner::release_dictionaries(removed);
        if changed {
            self.inner.persist().await;
        }
    }

    /// Total usage.
    pub fn usage(&self) -> Usage {
        ManagerInner::usage_locked(&self.inner.state.lock())
    }

    /// Usage of every non-empty partition, ordered by isolation key.
    pub fn usage_info(&self) -> Vec<UsageInfo> {
        let state = self.inner.state.lock();
        state
            .storages
            .values()
            .filter_map(|storage| {
                let index = storage.index.lock();
                (!index.is_empty()).then(|| UsageInfo {
                    isolation_key: storage.isolation_key.clone(),
                    size: index.size(),
                    count: index.len(),
                })
            })
            .sorted_by(|a, b| a.isolation_key.cmp(&b.isolation_key))
            .collect()
    }

    /// Records of all dictionaries of a partition.
    pub fn dictionary_info(&self, isolation_key: &IsolationKey) -> Vec<DictionaryRecord> {
        let storage = self.inner.state.lock().storages.get(isolation_key).cloned();
        storage
            .map(|storage| storage.index.lock().iter().map(|d| d.record.clone()).collect())
            .unwrap_or_default()
    }

    /// Frame origins of partitions holding a dictionary received within `range`.
    pub fn origins_between<R>(&self, range: R) -> Vec<Origin>
    where
        R: RangeBounds<SystemTime>,
    {
        let state = self.inner.state.lock();
        state
            .storages
            .values()
            .filter(|storage| {
                storage
                    .index
                    .lock()
                    .iter()
                    .any(|d| range.contains(&d.record.response_time()))
            })
            .map(|storage| storage.isolation_key.frame_origin().clone())
            .sorted()
            .dedup()
            .collect()
    }

    /// Write the metadata of all dictionaries, last-use times included, to disk.
    ///
    /// Mutations persist on their own. `flush` is only needed to keep last-use times across restarts.
    pub async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }
}

/// Builder of a [`DictionaryManager`].
pub struct DictionaryManagerBuilder {
    name: &'static str,
    cache_max_size: u64,
    cache_max_count: usize,
    clock: Arc<dyn Clock>,
    registry: BoxedRegistry,
    blob_store: Option<Arc<dyn BlobStore>>,
}

impl Debug for DictionaryManagerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryManagerBuilder")
            .field("name", &self.name)
            .field("cache_max_size", &self.cache_max_size)
            .field("cache_max_count", &self.cache_max_count)
            .field("clock", &self.clock)
            .field("blob_store", &self.blob_store)
            .finish()
    }
}

impl Default for DictionaryManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryManagerBuilder {
    /// Create a dictionary manager builder with default configurations.
    pub fn new() -> Self {
        Self {
            name: "dictcache",
            cache_max_size: 0,
            cache_max_count: DEFAULT_CACHE_MAX_COUNT,
            clock: Arc::new(SystemClock),
            registry: Box::new(NoopMetricsRegistry),
            blob_store: None,
        }
    }

    /// Set the name of the manager. The name is used as the metrics label.
    ///
    /// Default: `dictcache`.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Set the global byte cap. `0` means unbounded.
    ///
    /// Each top-level site is capped at half of it.
    ///
    /// Default: `0`.
    pub fn with_cache_max_size(mut self, cache_max_size: u64) -> Self {
        self.cache_max_size = cache_max_size;
        self
    }

    /// Set the global count cap.
    ///
    /// Each top-level site is capped at half of it.
    ///
    /// Default: `1000`.
    pub fn with_cache_max_count(mut self, cache_max_count: usize) -> Self {
        self.cache_max_count = cache_max_count;
        self
    }

    /// Set the clock for expiration and last-use times.
    ///
    /// Default: the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set metrics registry.
    ///
    /// Default: [`NoopMetricsRegistry`].
    pub fn with_metrics_registry(mut self, registry: BoxedRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Keep dictionaries on disk in the given blob store, and recover the dictionaries it already holds.
    ///
    /// Default: dictionaries are kept in memory.
    pub fn with_blob_store(mut self, blob_store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(blob_store);
        self
    }

    /// Build the dictionary manager.
    pub async fn build(self) -> Result<DictionaryManager> {
        let now = Instant::now();

        let metrics = Arc::new(Metrics::new(self.name, self.registry.as_ref()));
        let backend: Arc<dyn StorageBackend> = match self.blob_store {
            Some(store) => Arc::new(DiskBackend::new(store, metrics.clone())),
            None => Arc::new(MemoryBackend),
        };

        let inner = Arc::new(ManagerInner {
            name: self.name,
            state: Mutex::new(ManagerState {
                storages: HashMap::new(),
                limits: EvictionLimits {
                    max_size: self.cache_max_size,
                    max_count: self.cache_max_count,
                },
            }),
            persist_lock: tokio::sync::Mutex::new(()),
            backend,
            clock: self.clock,
            metrics,
        });
        inner.recover().await?;

        tracing::info!(
            name = self.name,
            persistent = inner.backend.is_persistent(),
            cache_max_size = self.cache_max_size,
            cache_max_count = self.cache_max_count,
            elapsed = ?now.elapsed(),
            "[dictionary manager]: open"
        );

        Ok(DictionaryManager { inner })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dictcache_common::clock::MockClock;

    use super::*;
    use crate::{isolation::Site, record::DictionaryRegistration, request::Destination};

    fn key(frame: &str, top: &str) -> IsolationKey {
        IsolationKey::new(Origin::new("https", frame, 443), Site::new("https", top))
    }

    async fn write(
        manager: &DictionaryManager,
        key: &IsolationKey,
        url: &str,
        pattern: &str,
        data: &[u8],
        clock: &MockClock,
    ) -> DictionaryRecord {
        let registration = DictionaryRegistration::new(Url::parse(url).unwrap(), pattern, clock.now(), Duration::from_secs(3600));
        let mut writer = manager.storage(key).create_writer(registration);
        writer.append(data).await.unwrap();
        writer.finish().await.unwrap().unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_empty_partition_is_pruned() {
        let manager = DictionaryManagerBuilder::new().build().await.unwrap();
        let k = key("a.test", "a.test");

        let storage = manager.storage(&k);
        let again = manager.storage(&k);
        assert!(Arc::ptr_eq(&storage.inner, &again.inner));
        drop(again);
        assert_eq!(manager.inner.state.lock().storages.len(), 1);
        drop(storage);
        assert!(manager.inner.state.lock().storages.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_partition_with_dictionaries_is_kept() {
        let clock = Arc::new(MockClock::default());
        let manager = DictionaryManagerBuilder::new().with_clock(clock.clone()).build().await.unwrap();
        let k = key("a.test", "a.test");

        write(&manager, &k, "https://a.test/d", "/*", b"dict", &clock).await;
        assert_eq!(manager.inner.state.lock().storages.len(), 1);

        manager.clear_data_for_isolation_key(&k).await;
        assert!(manager.inner.state.lock().storages.is_empty());
        assert_eq!(manager.usage(), Usage::default());
    }

    #[test_log::test(tokio::test)]
    async fn test_lookup_requires_opt_in() {
        let clock = Arc::new(MockClock::default());
        let manager = DictionaryManagerBuilder::new().with_clock(clock.clone()).build().await.unwrap();
        let k = key("a.test", "a.test");
        write(&manager, &k, "https://a.test/d", "/app/*", b"dict", &clock).await;

        let url = Url::parse("https://a.test/app/main.js").unwrap();
        let request = DictionaryRequest::new(url.clone(), k.clone());
        assert!(manager.lookup(&request).is_none());

        let request = request.with_shared_dictionary(true);
        let dictionary = manager.lookup(&request).unwrap();
        assert_eq!(dictionary.data().unwrap().as_ref(), b"dict");

        // Unknown partitions are not created by lookups.
        let other = DictionaryRequest::new(url, key("b.test", "b.test")).with_shared_dictionary(true);
        assert!(manager.lookup(&other).is_none());
        assert_eq!(manager.inner.state.lock().storages.len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_lookup_filters_destination() {
        let clock = Arc::new(MockClock::default());
        let manager = DictionaryManagerBuilder::new().with_clock(clock.clone()).build().await.unwrap();
        let k = key("a.test", "a.test");

        let url = Url::parse("https://a.test/d").unwrap();
        let registration = DictionaryRegistration::new(url, "/app/*", clock.now(), Duration::from_secs(3600))
            .with_match_dest(vec![Destination::Script]);
        let mut writer = manager.storage(&k).create_writer(registration);
        writer.append(b"script dict").await.unwrap();
        writer.finish().await.unwrap().unwrap();
        write(&manager, &k, "https://a.test/d2", "/app*", b"any dict", &clock).await;

        let request =
            DictionaryRequest::new(Url::parse("https://a.test/app/x").unwrap(), k.clone()).with_shared_dictionary(true);

        let hit = manager.lookup(&request.clone().with_destination(Destination::Script)).unwrap();
        assert_eq!(hit.data().unwrap().as_ref(), b"script dict");

        let hit = manager.lookup(&request.with_destination(Destination::Style)).unwrap();
        assert_eq!(hit.data().unwrap().as_ref(), b"any dict");
    }

    #[test_log::test(tokio::test)]
    async fn test_introspection() {
        let clock = Arc::new(MockClock::default());
        let manager = DictionaryManagerBuilder::new().with_clock(clock.clone()).build().await.unwrap();
        let t0 = clock.now();

        let ka = key("a.test", "top.test");
        let kb = key("b.test", "top.test");
        write(&manager, &ka, "https://a.test/d1", "/1*", b"1234", &clock).await;
        clock.inc(Duration::from_secs(10));
        write(&manager, &ka, "https://a.test/d2", "/2*", b"12", &clock).await;
        write(&manager, &kb, "https://b.test/d1", "/1*", b"123", &clock).await;

        assert_eq!(manager.usage(), Usage { size: 9, count: 3 });
        assert_eq!(
            manager.usage_info(),
            vec![
                UsageInfo {
                    isolation_key: ka.clone(),
                    size: 6,
                    count: 2,
                },
                UsageInfo {
                    isolation_key: kb.clone(),
                    size: 3,
                    count: 1,
                },
            ]
        );

        let patterns = manager
            .dictionary_info(&ka)
            .iter()
            .map(|r| r.match_pattern().to_string())
            .collect_vec();
        assert_eq!(patterns, vec!["/1*", "/2*"]);
        assert!(manager.dictionary_info(&key("c.test", "c.test")).is_empty());

        assert_eq!(manager.origins_between(t0..t0 + Duration::from_secs(1)), vec![ka.frame_origin().clone()]);
        assert_eq!(
            manager.origins_between(..),
            vec![ka.frame_origin().clone(), kb.frame_origin().clone()]
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_clear_expired() {
        let clock = Arc::new(MockClock::default());
        let manager = DictionaryManagerBuilder::new().with_clock(clock.clone()).build().await.unwrap();
        let k = key("a.test", "a.test");

        let url = Url::parse("https://a.test/short").unwrap();
        let mut writer = manager
            .storage(&k)
            .create_writer(DictionaryRegistration::new(url, "/s*", clock.now(), Duration::from_secs(1)));
        writer.append(b"short").await.unwrap();
        writer.finish().await.unwrap().unwrap();
        write(&manager, &k, "https://a.test/long", "/l*", b"long", &clock).await;

        clock.inc(Duration::from_secs(2));
        manager.clear_expired().await;

        let patterns = manager
            .dictionary_info(&k)
            .iter()
            .map(|r| r.match_pattern().to_string())
            .collect_vec();
        assert_eq!(patterns, vec!["/l*"]);
    }
}
