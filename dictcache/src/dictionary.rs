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

use std::sync::Arc;

use bytes::Bytes;
use dictcache_common::error::{Error, Result};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;

use crate::{backend::Payload, record::DictionaryRecord};

#[derive(Debug)]
struct SharedDictionaryInner {
    size: u64,
    hash: [u8; 32],
    id: Option<String>,
    payload: Arc<Payload>,
    data: OnceCell<Bytes>,
}

/// Read handle of a matched dictionary.
///
/// The handle is detached from the cache: it keeps reading the same bytes after the dictionary is evicted,
/// replaced or cleared.
#[derive(Debug, Clone)]
pub struct SharedDictionary {
    inner: Arc<SharedDictionaryInner>,
}

impl SharedDictionary {
    pub(crate) fn new(record: &DictionaryRecord, payload: Arc<Payload>) -> Self {
        let data = OnceCell::new_with(payload.inline().cloned());
        Self {
            inner: Arc::new(SharedDictionaryInner {
                size: record.size(),
                hash: *record.hash(),
                id: record.id().map(str::to_string),
                payload,
                data,
            }),
        }
    }

    /// Size of the dictionary in bytes.
    pub fn size(&self) -> u64 {
        self.inner.size
    }

    /// SHA-256 digest of the dictionary.
    pub fn hash(&self) -> &[u8; 32] {
        &self.inner.hash
    }

    /// Dictionary id advertised by the server.
    pub fn id(&self) -> Option<&str> {
        self.inner.id.as_deref()
    }

    /// Bytes of the dictionary if they are already available without I/O.
    ///
    /// In-memory dictionaries are always available. On-disk dictionaries are available after
    /// [`SharedDictionary::read_all`] resolved.
    pub fn data(&self) -> Option<Bytes> {
        self.inner.data.get().cloned()
    }

    /// Resolve the bytes of the dictionary.
    ///
    /// Concurrent and later calls share a single read. Dropping the future abandons the read. Bytes read from disk
    /// are checked against the recorded size and digest.
    pub async fn read_all(&self) -> Result<Bytes> {
        let inner = &self.inner;
        inner
            .data
            .get_or_try_init(|| async {
                let data = inner.payload.read().await?;
                if data.len() as u64 != inner.size {
                    return Err(Error::checksum_mismatch(
                        format!("{} bytes", inner.size),
                        format!("{} bytes", data.len()),
                    ));
                }
                let hash: [u8; 32] = Sha256::digest(&data).into();
                if hash != inner.hash {
                    return Err(Error::checksum_mismatch(hex::encode(inner.hash), hex::encode(hash)));
                }
                Ok(data)
            })
            .await
            .cloned()
    }

    /// Value of the `Available-Dictionary` request header: the hex encoded digest.
    pub fn available_dictionary_header(&self) -> String {
        hex::encode(self.inner.hash)
    }

    /// Value of the `Dictionary-ID` request header, as a structured field string, if the server advertised an id.
    pub fn dictionary_id_header(&self) -> Option<String> {
        let id = self.inner.id.as_deref()?;
        let mut value = String::with_capacity(id.len() + 2);
        value.push('"');
        for c in id.chars() {
            if c == '"' || c == '\\' {
                value.push('\\');
            }
            value.push(c);
        }
        value.push('"');
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use dictcache_common::{error::ErrorKind, metrics::model::Metrics};
    use dictcache_storage::{BlobStore, FsBlobStoreBuilder};
    use url::Url;

    use super::*;
    use crate::{
        backend::{DiskBackend, MemoryBackend, PayloadHandle, StorageBackend},
        isolation::Origin,
        record::DictionaryRegistration,
    };

    fn record(data: &[u8], id: Option<&str>) -> DictionaryRecord {
        let url = Url::parse("https://a.test/dict").unwrap();
        let mut registration =
            DictionaryRegistration::new(url.clone(), "/*", SystemTime::UNIX_EPOCH, Duration::from_secs(60));
        if let Some(id) = id {
            registration = registration.with_id(id);
        }
        DictionaryRecord::new(
            registration,
            Origin::from_url(&url).unwrap(),
            data.len() as _,
            Sha256::digest(data).into(),
        )
    }

    #[test_log::test(tokio::test)]
    async fn test_inline_dictionary() {
        let data = Bytes::from_static(b"Hello World");
        let payload = Arc::new(Payload::new(PayloadHandle::Inline(data.clone()), Arc::new(MemoryBackend)));
        let dictionary = SharedDictionary::new(&record(&data, Some("v\"1")), payload);

        assert_eq!(dictionary.size(), 11);
        assert_eq!(dictionary.data(), Some(data.clone()));
        assert_eq!(dictionary.read_all().await.unwrap(), data);
        assert_eq!(
            dictionary.available_dictionary_header(),
            "a591a6d40bf420404a011733cfb7b190d62c65bf0bcda32b57b277d9ad9f146e"
        );
        assert_eq!(dictionary.dictionary_id_header().as_deref(), Some("\"v\\\"1\""));
    }

    #[test_log::test(tokio::test)]
    async fn test_disk_dictionary_is_verified() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsBlobStoreBuilder::new(dir.path()).build().unwrap());
        let backend: Arc<dyn StorageBackend> = Arc::new(DiskBackend::new(store.clone(), Arc::new(Metrics::noop())));

        let data = Bytes::from_static(b"Hello World");
        let handle = backend.commit_payload(data.clone()).await.unwrap();
        let token = match &handle {
            PayloadHandle::Blob(token) => *token,
            PayloadHandle::Inline(_) => unreachable!(),
        };
        let payload = Arc::new(Payload::new(handle, backend.clone()));

        let dictionary = SharedDictionary::new(&record(&data, None), payload.clone());
        assert_eq!(dictionary.data(), None);
        assert_eq!(dictionary.read_all().await.unwrap(), data);
        assert_eq!(dictionary.data(), Some(data));
        assert_eq!(dictionary.dictionary_id_header(), None);

        // Corrupt the blob: a fresh handle must fail, the resolved one keeps its bytes.
        store.write(token, Bytes::from_static("Hello Wörld".as_bytes())).await.unwrap();
        let corrupted = SharedDictionary::new(&record(b"Hello World", None), payload.clone());
        assert_eq!(corrupted.read_all().await.unwrap_err().kind(), ErrorKind::ChecksumMismatch);
        store.write(token, Bytes::from_static(b"Hello_World")).await.unwrap();
        let corrupted = SharedDictionary::new(&record(b"Hello World", None), payload.clone());
        assert_eq!(corrupted.read_all().await.unwrap_err().kind(), ErrorKind::ChecksumMismatch);
        assert!(dictionary.read_all().await.is_ok());

        store.delete(token);
        while store.read(token).await.is_ok() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let missing = SharedDictionary::new(&record(b"Hello World", None), payload);
        assert_eq!(missing.read_all().await.unwrap_err().kind(), ErrorKind::NotFound);
    }
}
