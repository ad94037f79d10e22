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
use dictcache_common::error::{Error, ErrorKind, Result};
use sha2::{Digest, Sha256};

use crate::{
    backend::{Payload, PayloadWriter},
    index::StoredDictionary,
    isolation::Origin,
    manager::ManagerInner,
    record::{DictionaryRecord, DictionaryRegistration},
    storage::DictionaryStorage,
};

/// Incremental sink of a dictionary body.
///
/// Bytes are hashed and handed to the storage backend while they are appended: the in-memory backend buffers them,
/// the on-disk backend streams them into a blob. [`DictionaryWriter::finish`] registers the dictionary into the
/// partition the writer was created from. Dropping the writer discards everything appended.
#[derive(Debug)]
pub struct DictionaryWriter {
    storage: DictionaryStorage,
    registration: DictionaryRegistration,
    /// Opened on the first non-empty chunk.
    sink: Option<Box<dyn PayloadWriter>>,
    hasher: Sha256,
    size: u64,
    failed: bool,
}

impl DictionaryWriter {
    pub(crate) fn new(storage: DictionaryStorage, registration: DictionaryRegistration) -> Self {
        Self {
            storage,
            registration,
            sink: None,
            hasher: Sha256::new(),
            size: 0,
            failed: false,
        }
    }

    /// Registration the writer commits.
    pub fn registration(&self) -> &DictionaryRegistration {
        &self.registration
    }

    /// Append a chunk of the dictionary body.
    ///
    /// After an error the writer is unusable and [`DictionaryWriter::finish`] fails.
    pub async fn append(&mut self, chunk: &[u8]) -> Result<()> {
        if self.failed {
            return Err(Self::failed_error());
        }
        if chunk.is_empty() {
            return Ok(());
        }
        let sink = match self.sink.take() {
            Some(sink) => sink,
            None => self.manager()?.backend.payload_writer(),
        };
        let sink = self.sink.insert(sink);
        if let Err(e) = sink.append(Bytes::copy_from_slice(chunk)).await {
            self.failed = true;
            return Err(e);
        }
        self.hasher.update(chunk);
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Bytes appended so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    fn manager(&self) -> Result<Arc<ManagerInner>> {
        self.storage
            .inner
            .manager
            .upgrade()
            .ok_or_else(|| Error::new(ErrorKind::Closed, "dictionary manager is closed"))
    }

    fn failed_error() -> Error {
        Error::new(ErrorKind::Io, "dictionary writer failed on an earlier append")
    }

    /// Commit the dictionary and run eviction.
    ///
    /// An empty dictionary is discarded and `Ok(None)` is returned. Otherwise the committed record is returned,
    /// even if eviction already removed it again.
    pub async fn finish(self) -> Result<Option<DictionaryRecord>> {
        if self.failed {
            return Err(Self::failed_error());
        }
        let manager = self.manager()?;
        let Self {
            storage,
            registration,
            sink,
            hasher,
            size,
            ..
        } = self;

        let Some(sink) = sink else {
            manager.metrics.dictionary_discard.increase(1);
            tracing::debug!(
                key = %storage.isolation_key(),
                url = %registration.source_url(),
                "[dictionary writer]: discard empty dictionary"
            );
            return Ok(None);
        };

        let registered_origin = Origin::from_url(registration.source_url()).ok_or_else(|| {
            Error::new(ErrorKind::Unsupported, "dictionary source url has an opaque origin")
                .with_context("url", registration.source_url())
        })?;

        let hash: [u8; 32] = hasher.finalize().into();

        let handle = sink.finish().await?;
        let payload = Arc::new(Payload::new(handle, manager.backend.clone()));
        let record = DictionaryRecord::new(registration, registered_origin, size, hash);

        tracing::debug!(
            key = %storage.isolation_key(),
            url = %record.source_url(),
            pattern = record.match_pattern(),
            size,
            "[dictionary writer]: commit dictionary"
        );

        manager.commit(
            &storage.inner,
            StoredDictionary {
                record: record.clone(),
                payload,
            },
        );
        manager.persist().await;

        Ok(Some(record))
    }
}
