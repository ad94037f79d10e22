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
    ops::Range,
    sync::Arc,
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use dictcache::{
    BlobStore, BlobToken, Clock, DictionaryManager, DictionaryManagerBuilder, DictionaryRecord, DictionaryRegistration, DictionaryRequest,
    FsBlobStoreBuilder, IsolationKey, MockClock, Origin, Site, UrlMatcher,
};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use url::Url;

const HOUR: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    Disk,
}

struct Fixture {
    clock: Arc<MockClock>,
    manager: DictionaryManager,
    dir: Option<TempDir>,
}

impl Fixture {
    async fn open(backend: Backend, cache_max_size: u64) -> Self {
        let dir = match backend {
            Backend::Memory => None,
            Backend::Disk => Some(tempfile::tempdir().unwrap()),
        };
        let clock = Arc::new(MockClock::default());
        let manager = Self::build(dir.as_ref(), clock.clone(), cache_max_size).await;
        Self { clock, manager, dir }
    }

    async fn build(dir: Option<&TempDir>, clock: Arc<MockClock>, cache_max_size: u64) -> DictionaryManager {
        let mut builder = DictionaryManagerBuilder::new()
            .with_clock(clock)
            .with_cache_max_size(cache_max_size);
        if let Some(dir) = dir {
            let store = FsBlobStoreBuilder::new(dir.path()).build().unwrap();
            builder = builder.with_blob_store(Arc::new(store));
        }
        builder.build().await.unwrap()
    }

    /// Drop the manager and open a new one over the same directory.
    async fn reopen(&mut self) {
        let manager = Self::build(self.dir.as_ref(), self.clock.clone(), self.manager.cache_max_size()).await;
        self.manager = manager;
    }

    async fn write_chunks(
        &self,
        key: &IsolationKey,
        url: &str,
        pattern: &str,
        expiration: Duration,
        chunks: &[&[u8]],
    ) -> Option<DictionaryRecord> {
        let registration =
            DictionaryRegistration::new(Url::parse(url).unwrap(), pattern, self.clock.now(), expiration);
        let mut writer = self.manager.storage(key).create_writer(registration);
        for chunk in chunks {
            writer.append(chunk).await.unwrap();
        }
        writer.finish().await.unwrap()
    }

    async fn write(&self, key: &IsolationKey, url: &str, pattern: &str, data: &[u8]) -> DictionaryRecord {
        self.write_chunks(key, url, pattern, HOUR, &[data]).await.unwrap()
    }

    async fn read(&self, key: &IsolationKey, url: &str) -> Option<Vec<u8>> {
        let dictionary = self.manager.storage(key).match_dictionary(&Url::parse(url).unwrap())?;
        Some(dictionary.read_all().await.unwrap().to_vec())
    }

    /// Wait until the cache directory holds exactly the manifest and `count` payloads.
    async fn wait_for_payloads(&self, count: usize) {
        let store = FsBlobStoreBuilder::new(self.dir.as_ref().unwrap().path()).build().unwrap();
        for _ in 0..100 {
            let tokens = store.tokens().await.unwrap();
            if tokens.len() == count + 1 && tokens.contains(&BlobToken::MANIFEST) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("cache directory does not settle to {count} payloads");
    }

    fn patterns(&self, key: &IsolationKey) -> Vec<String> {
        self.manager
            .dictionary_info(key)
            .iter()
            .map(|r| r.match_pattern().to_string())
            .collect()
    }
}

fn key(frame: &str, top: &str) -> IsolationKey {
    IsolationKey::new(Origin::new("https", frame, 443), Site::new("https", top))
}

fn everything() -> Range<SystemTime> {
    SystemTime::UNIX_EPOCH..SystemTime::UNIX_EPOCH + Duration::from_secs(u32::MAX as _)
}

const BACKENDS: [Backend; 2] = [Backend::Memory, Backend::Disk];

#[test_log::test(tokio::test)]
async fn test_zero_size_dictionary_is_discarded() {
    for backend in BACKENDS {
        let f = Fixture::open(backend, 0).await;
        let k = key("a.test", "a.test");

        let record = f.write_chunks(&k, "https://a.test/d", "/*", HOUR, &[]).await;
        assert!(record.is_none());
        assert!(f.read(&k, "https://a.test/x").await.is_none());
        assert_eq!(f.manager.usage().count, 0);
        assert!(f.manager.usage_info().is_empty());
    }
}

#[test_log::test(tokio::test)]
async fn test_longest_match_wins() {
    for backend in BACKENDS {
        let f = Fixture::open(backend, 0).await;
        let k = key("a.test", "a.test");

        f.write(&k, "https://a.test/d1", "/a*", b"short").await;
        f.write(&k, "https://a.test/d2", "/ab*", b"long").await;

        assert_eq!(f.read(&k, "https://a.test/abc").await.unwrap(), b"long");
        assert_eq!(f.read(&k, "https://a.test/axe").await.unwrap(), b"short");
        assert!(f.read(&k, "https://a.test/b").await.is_none());
        // Partitions are isolated.
        assert!(f.read(&key("b.test", "a.test"), "https://a.test/abc").await.is_none());
    }
}

#[test_log::test(tokio::test)]
async fn test_expiration() {
    for backend in BACKENDS {
        let f = Fixture::open(backend, 0).await;
        let k = key("a.test", "a.test");

        f.write_chunks(&k, "https://a.test/d", "/p*", Duration::from_secs(1), &[b"dict"])
            .await
            .unwrap();

        f.clock.inc(Duration::from_millis(900));
        assert_eq!(f.read(&k, "https://a.test/path").await.unwrap(), b"dict");

        f.clock.inc(Duration::from_millis(200));
        assert!(f.read(&k, "https://a.test/path").await.is_none());
    }
}

#[test_log::test(tokio::test)]
async fn test_per_site_cap() {
    for backend in BACKENDS {
        // Each site may hold 250 bytes, drained down to 225.
        let f = Fixture::open(backend, 500).await;
        let ka = key("a.test", "a.test");
        let kb = key("b.test", "b.test");
        let data = [0u8; 100];

        f.write(&kb, "https://b.test/d", "/b*", &data).await;
        f.clock.inc(Duration::from_secs(1));
        f.write(&ka, "https://a.test/d1", "/1*", &data).await;
        f.clock.inc(Duration::from_secs(1));
        f.write(&ka, "https://a.test/d2", "/2*", &data).await;
        assert_eq!(f.patterns(&ka), vec!["/1*", "/2*"]);

        f.clock.inc(Duration::from_secs(1));
        f.write(&ka, "https://a.test/d3", "/3*", &data).await;

        assert_eq!(f.patterns(&ka), vec!["/2*", "/3*"]);
        assert_eq!(f.patterns(&kb), vec!["/b*"]);
        assert_eq!(f.manager.usage().size, 300);
    }
}

#[test_log::test(tokio::test)]
async fn test_set_cache_max_size_is_idempotent() {
    for backend in BACKENDS {
        let f = Fixture::open(backend, 0).await;
        let keys = (0..5).map(|i| key(&format!("s{i}.test"), &format!("s{i}.test"))).collect::<Vec<_>>();
        for (i, k) in keys.iter().enumerate() {
            f.write(k, &format!("https://s{i}.test/d"), "/*", &[0u8; 100]).await;
            f.clock.inc(Duration::from_secs(1));
        }

        // 500 bytes over a 300 bytes cap drains to 270 bytes, the least recently used go first.
        f.manager.set_cache_max_size(300).await;
        let once = f.manager.usage_info();
        assert_eq!(
            once.iter().map(|info| info.isolation_key.clone()).collect::<Vec<_>>(),
            keys[3..].to_vec()
        );

        f.manager.set_cache_max_size(300).await;
        assert_eq!(f.manager.usage_info(), once);
        assert_eq!(f.manager.cache_max_size(), 300);
    }
}

#[test_log::test(tokio::test)]
async fn test_read_after_evict() {
    for backend in BACKENDS {
        let f = Fixture::open(backend, 500).await;
        let k = key("a.test", "a.test");

        f.write(&k, "https://a.test/d1", "/1*", &[1u8; 100]).await;
        let dictionary = f
            .manager
            .storage(&k)
            .match_dictionary(&Url::parse("https://a.test/1").unwrap())
            .unwrap();

        f.clock.inc(Duration::from_secs(1));
        f.write(&k, "https://a.test/d2", "/2*", &[2u8; 100]).await;
        f.clock.inc(Duration::from_secs(1));
        f.write(&k, "https://a.test/d3", "/3*", &[3u8; 100]).await;
        assert!(f.read(&k, "https://a.test/1").await.is_none());

        let data = dictionary.read_all().await.unwrap();
        assert_eq!(data.as_ref(), &[1u8; 100]);
        let hash: [u8; 32] = Sha256::digest(&data).into();
        assert_eq!(dictionary.hash(), &hash);
        assert_eq!(dictionary.size(), 100);
    }
}

#[test_log::test(tokio::test)]
async fn test_clear_data_matches_any_role() {
    for backend in BACKENDS {
        let f = Fixture::open(backend, 0).await;
        let k = key("frame.test", "top.test");
        let other = key("other.test", "other.test");

        f.write(&k, "https://target.test/d", "/*", b"target").await;
        f.write(&other, "https://other.test/d", "/*", b"other").await;

        let target: &UrlMatcher = &|url: &Url| url.host_str() == Some("target.test");

        // Out of the time range.
        let t = f.clock.now();
        f.manager.clear_data(t + HOUR..t + HOUR * 2, Some(target)).await;
        assert_eq!(f.patterns(&k), vec!["/*"]);

        f.manager.clear_data(everything(), Some(target)).await;
        assert!(f.patterns(&k).is_empty());
        assert_eq!(f.patterns(&other), vec!["/*"]);

        // Frame origin and top-level site identify the data as well.
        f.write(&k, "https://target.test/d", "/*", b"target").await;
        let frame: &UrlMatcher = &|url: &Url| url.host_str() == Some("frame.test");
        f.manager.clear_data(everything(), Some(frame)).await;
        assert!(f.patterns(&k).is_empty());

        f.write(&k, "https://target.test/d", "/*", b"target").await;
        let top: &UrlMatcher = &|url: &Url| url.host_str() == Some("top.test");
        f.manager.clear_data(everything(), Some(top)).await;
        assert!(f.patterns(&k).is_empty());

        f.manager.clear_data(.., None).await;
        assert_eq!(f.manager.usage().count, 0);
    }
}

#[test_log::test(tokio::test)]
async fn test_hash_of_chunked_dictionary() {
    for backend in BACKENDS {
        let f = Fixture::open(backend, 0).await;
        let k = key("a.test", "a.test");

        let record = f
            .write_chunks(&k, "https://a.test/d", "/*", HOUR, &[b"Hello ", b"World"])
            .await
            .unwrap();
        let expected: [u8; 32] = Sha256::digest(b"Hello World").into();
        assert_eq!(record.size(), 11);
        assert_eq!(record.hash(), &expected);

        let dictionary = f
            .manager
            .storage(&k)
            .match_dictionary(&Url::parse("https://a.test/x").unwrap())
            .unwrap();
        assert_eq!(dictionary.read_all().await.unwrap().as_ref(), b"Hello World");
        assert_eq!(dictionary.available_dictionary_header(), hex::encode(expected));
    }
}

#[test_log::test(tokio::test)]
async fn test_lookup_requires_opt_in() {
    for backend in BACKENDS {
        let f = Fixture::open(backend, 0).await;
        let k = key("a.test", "a.test");
        f.write(&k, "https://a.test/d", "/app/*", b"dict").await;

        let request = DictionaryRequest::new(Url::parse("https://a.test/app/main.js").unwrap(), k);
        assert!(f.manager.lookup(&request).is_none());

        let dictionary = f.manager.lookup(&request.with_shared_dictionary(true)).unwrap();
        assert_eq!(dictionary.read_all().await.unwrap().as_ref(), b"dict");
    }
}

#[test_log::test(tokio::test)]
async fn test_disk_recovery() {
    let mut f = Fixture::open(Backend::Disk, 0).await;
    assert!(f.manager.is_persistent());
    let ka = key("a.test", "a.test");
    let kb = key("b.test", "top.test");

    f.write(&ka, "https://a.test/d1", "/1*", b"one").await;
    f.write(&ka, "https://a.test/d2", "/2*", b"two").await;
    f.write(&kb, "https://b.test/d", "/*", b"three").await;
    f.write_chunks(&kb, "https://b.test/short", "/short*", Duration::from_secs(10), &[b"short"])
        .await
        .unwrap();

    let before = f.manager.usage_info();
    f.clock.inc(Duration::from_secs(60));
    f.reopen().await;

    // The expired dictionary is dropped on recovery.
    assert_eq!(f.patterns(&ka), vec!["/1*", "/2*"]);
    assert_eq!(f.patterns(&kb), vec!["/*"]);
    assert_eq!(f.manager.usage_info()[0], before[0]);
    assert_eq!(f.read(&ka, "https://a.test/2").await.unwrap(), b"two");
    assert_eq!(f.read(&kb, "https://b.test/x").await.unwrap(), b"three");

    // Removals are persisted as well.
    f.manager.clear_data_for_isolation_key(&ka).await;
    f.reopen().await;
    assert!(f.patterns(&ka).is_empty());
    assert_eq!(f.manager.usage().count, 1);
}

#[test_log::test(tokio::test)]
async fn test_memory_backend_is_not_persistent() {
    let mut f = Fixture::open(Backend::Memory, 0).await;
    assert!(!f.manager.is_persistent());
    let k = key("a.test", "a.test");
    f.write(&k, "https://a.test/d", "/*", b"dict").await;
    f.manager.flush().await.unwrap();

    f.reopen().await;
    assert_eq!(f.manager.usage().count, 0);
}

#[test_log::test(tokio::test)]
async fn test_concurrent_writers_for_the_same_pattern() {
    for backend in BACKENDS {
        let f = Fixture::open(backend, 0).await;
        let k = key("a.test", "a.test");
        let storage = f.manager.storage(&k);
        let registration = |url: &str| {
            DictionaryRegistration::new(Url::parse(url).unwrap(), "/app/*", f.clock.now(), HOUR)
        };

        let mut first = storage.create_writer(registration("https://a.test/d1"));
        let mut second = storage.create_writer(registration("https://a.test/d2"));
        let mut abandoned = storage.create_writer(registration("https://a.test/d3"));
        abandoned.append(b"abandoned").await.unwrap();
        first.append(b"one").await.unwrap();
        second.append(b"two, ").await.unwrap();
        second.append(b"longer").await.unwrap();

        drop(abandoned);
        first.finish().await.unwrap().unwrap();
        f.clock.inc(Duration::from_secs(1));
        let record = second.finish().await.unwrap().unwrap();

        assert_eq!(f.manager.dictionary_info(&k), vec![record]);
        assert_eq!(f.manager.usage().count, 1);
        assert_eq!(f.manager.usage().size, 11);
        assert_eq!(f.read(&k, "https://a.test/app/x").await.unwrap(), b"two, longer");

        if let Backend::Disk = backend {
            f.wait_for_payloads(1).await;
        }
    }
}

#[test_log::test(tokio::test)]
async fn test_reopen_with_corrupt_manifest() {
    let mut f = Fixture::open(Backend::Disk, 0).await;
    let k = key("a.test", "a.test");
    f.write(&k, "https://a.test/d1", "/1*", b"one").await;
    f.write(&k, "https://a.test/d2", "/2*", b"two").await;
    f.manager.flush().await.unwrap();

    let store = FsBlobStoreBuilder::new(f.dir.as_ref().unwrap().path()).build().unwrap();
    store
        .write(BlobToken::MANIFEST, Bytes::from_static(b"not a manifest"))
        .await
        .unwrap();

    f.reopen().await;
    assert_eq!(f.manager.usage().count, 0);
    f.wait_for_payloads(0).await;

    f.write(&k, "https://a.test/d3", "/3*", b"three").await;
    f.reopen().await;
    assert_eq!(f.patterns(&k), vec!["/3*"]);
    assert_eq!(f.read(&k, "https://a.test/3").await.unwrap(), b"three");
}
