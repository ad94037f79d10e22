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
    collections::HashSet,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use bytes::{Bytes, BytesMut};
use dictcache_common::{
    error::{Error, ErrorKind, Result},
    metrics::model::Metrics,
};
use dictcache_storage::{BlobStore, BlobToken, BlobWriter};
use futures_util::future::BoxFuture;

use crate::manifest::Manifest;

/// Where the bytes of a dictionary live.
#[derive(Debug, Clone)]
pub enum PayloadHandle {
    /// Bytes kept in memory.
    Inline(Bytes),
    /// Bytes kept in a blob store.
    Blob(BlobToken),
}

/// Incremental sink of a single payload.
pub trait PayloadWriter: Send + Debug {
    /// Append a chunk of the payload.
    fn append(&mut self, chunk: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Complete the payload. Dropping the writer instead discards it.
    fn finish(self: Box<Self>) -> BoxFuture<'static, Result<PayloadHandle>>;
}

/// Backend-specific payload storage. Matching, eviction and bookkeeping are shared by all backends.
pub trait StorageBackend: Send + Sync + 'static + Debug {
    /// Open a sink for a new payload.
    fn payload_writer(&self) -> Box<dyn PayloadWriter>;

    /// Store a complete payload.
    fn commit_payload(&self, data: Bytes) -> BoxFuture<'static, Result<PayloadHandle>> {
        let mut writer = self.payload_writer();
        Box::pin(async move {
            writer.append(data).await?;
            writer.finish().await
        })
    }

    /// Load a complete payload.
    fn read_payload(&self, handle: &PayloadHandle) -> BoxFuture<'static, Result<Bytes>>;

    /// Release a payload. Best-effort.
    fn delete_payload(&self, handle: &PayloadHandle);

    /// Whether dictionaries survive the manager.
    fn is_persistent(&self) -> bool;

    /// Persist the manifest of all dictionaries.
    fn persist(&self, manifest: &Manifest) -> BoxFuture<'static, Result<()>>;

    /// Load the persisted manifest, if any.
    ///
    /// Entries whose payload is gone are dropped, and stored payloads no entry refers to are deleted.
    fn recover(&self) -> BoxFuture<'static, Result<Option<Manifest>>>;
}

/// Backend keeping payloads in memory. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryBackend;

#[derive(Debug, Default)]
struct MemoryPayloadWriter {
    buffer: BytesMut,
}

impl PayloadWriter for MemoryPayloadWriter {
    fn append(&mut self, chunk: Bytes) -> BoxFuture<'_, Result<()>> {
        self.buffer.extend_from_slice(&chunk);
        Box::pin(async { Ok(()) })
    }

    fn finish(self: Box<Self>) -> BoxFuture<'static, Result<PayloadHandle>> {
        let data = self.buffer.freeze();
        Box::pin(async move { Ok(PayloadHandle::Inline(data)) })
    }
}

impl StorageBackend for MemoryBackend {
    fn payload_writer(&self) -> Box<dyn PayloadWriter> {
        Box::new(MemoryPayloadWriter::default())
    }

    fn read_payload(&self, handle: &PayloadHandle) -> BoxFuture<'static, Result<Bytes>> {
        let res = match handle {
            PayloadHandle::Inline(data) => Ok(data.clone()),
            PayloadHandle::Blob(token) => Err(Error::new(
                ErrorKind::Unsupported,
                "in-memory backend cannot read blob payloads",
            )
            .with_context("token", token)),
        };
        Box::pin(async move { res })
    }

    fn delete_payload(&self, _: &PayloadHandle) {}

    fn is_persistent(&self) -> bool {
        false
    }

    fn persist(&self, _: &Manifest) -> BoxFuture<'static, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    fn recover(&self) -> BoxFuture<'static, Result<Option<Manifest>>> {
        Box::pin(async { Ok(None) })
    }
}

/// Backend keeping every payload as a blob, with the manifest in a reserved blob.
#[derive(Debug)]
pub struct DiskBackend {
    store: Arc<dyn BlobStore>,
    metrics: Arc<Metrics>,
}

impl DiskBackend {
    /// Create a disk backend upon a blob store.
    pub fn new(store: Arc<dyn BlobStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }
}

/// Streams a payload into a fresh blob.
#[derive(Debug)]
struct DiskPayloadWriter {
    token: BlobToken,
    writer: Box<dyn BlobWriter>,
    metrics: Arc<Metrics>,
    len: usize,
}

impl PayloadWriter for DiskPayloadWriter {
    fn append(&mut self, chunk: Bytes) -> BoxFuture<'_, Result<()>> {
        self.len += chunk.len();
        self.writer.write(chunk)
    }

    fn finish(self: Box<Self>) -> BoxFuture<'static, Result<PayloadHandle>> {
        let Self {
            token,
            writer,
            metrics,
            len,
        } = *self;
        Box::pin(async move {
            writer.finish().await?;
            metrics.disk_write.increase(1);
            metrics.disk_write_bytes.increase(len as _);
            Ok(PayloadHandle::Blob(token))
        })
    }
}

impl StorageBackend for DiskBackend {
    fn payload_writer(&self) -> Box<dyn PayloadWriter> {
        let token = BlobToken::random();
        Box::new(DiskPayloadWriter {
            token,
            writer: self.store.writer(token),
            metrics: self.metrics.clone(),
            len: 0,
        })
    }

    fn read_payload(&self, handle: &PayloadHandle) -> BoxFuture<'static, Result<Bytes>> {
        let token = match handle {
            PayloadHandle::Inline(data) => {
                let data = data.clone();
                return Box::pin(async move { Ok(data) });
            }
            PayloadHandle::Blob(token) => *token,
        };
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        Box::pin(async move {
            let now = Instant::now();
            match store.read(token).await {
                Ok(data) => {
                    metrics.disk_read.increase(1);
                    metrics.disk_read_bytes.increase(data.len() as _);
                    metrics.disk_read_duration.record(now.elapsed().as_secs_f64());
                    Ok(data)
                }
                Err(e) => {
                    metrics.disk_read_failure.increase(1);
                    Err(e)
                }
            }
        })
    }

    fn delete_payload(&self, handle: &PayloadHandle) {
        if let PayloadHandle::Blob(token) = handle {
            self.store.delete(*token);
        }
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn persist(&self, manifest: &Manifest) -> BoxFuture<'static, Result<()>> {
        let store = self.store.clone();
        let buf = manifest.encode();
        Box::pin(async move { store.write(BlobToken::MANIFEST, buf?).await })
    }

    fn recover(&self) -> BoxFuture<'static, Result<Option<Manifest>>> {
        let store = self.store.clone();
        Box::pin(async move {
            let mut manifest = match store.read(BlobToken::MANIFEST).await {
                Ok(buf) => match Manifest::decode(&buf) {
                    Ok(manifest) => Some(manifest),
                    Err(e) => {
                        // Every stored payload becomes an orphan below.
                        tracing::warn!("[disk backend]: manifest is unreadable, start empty: {e}");
                        store.write(BlobToken::MANIFEST, Manifest::new(vec![]).encode()?).await?;
                        None
                    }
                },
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(e),
            };

            let stored: HashSet<BlobToken> = store.tokens().await?.into_iter().collect();

            let mut referenced = HashSet::new();
            if let Some(manifest) = manifest.as_mut() {
                manifest.entries.retain(|entry| {
                    if !stored.contains(&entry.token) {
                        tracing::warn!(
                            token = %entry.token,
                            key = %entry.isolation_key,
                            "[disk backend]: dictionary payload is missing, skip"
                        );
                        return false;
                    }
                    referenced.insert(entry.token);
                    true
                });
            }

            for token in stored {
                if token.is_reserved() || referenced.contains(&token) {
                    continue;
                }
                tracing::debug!(%token, "[disk backend]: delete orphan payload");
                store.delete(token);
            }

            Ok(manifest)
        })
    }
}

/// A stored payload shared by the index and every read handle.
///
/// A payload released by the index is doomed: it is deleted from the backend once the last reference is dropped.
#[derive(Debug)]
pub struct Payload {
    handle: PayloadHandle,
    backend: Arc<dyn StorageBackend>,
    doomed: AtomicBool,
}

impl Payload {
    /// Wrap a committed payload.
    pub fn new(handle: PayloadHandle, backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            handle,
            backend,
            doomed: AtomicBool::new(false),
        }
    }

    /// Bytes of an in-memory payload.
    pub fn inline(&self) -> Option<&Bytes> {
        match &self.handle {
            PayloadHandle::Inline(data) => Some(data),
            PayloadHandle::Blob(_) => None,
        }
    }

    /// Blob token of an on-disk payload.
    pub fn token(&self) -> Option<BlobToken> {
        match &self.handle {
            PayloadHandle::Inline(_) => None,
            PayloadHandle::Blob(token) => Some(*token),
        }
    }

    /// Load the payload.
    pub fn read(&self) -> BoxFuture<'static, Result<Bytes>> {
        self.backend.read_payload(&self.handle)
    }

    /// Mark the payload to be deleted when the last reference is dropped.
    pub fn doom(&self) {
        self.doomed.store(true, Ordering::Release);
    }
}

impl Drop for Payload {
    fn drop(&mut self) {
        if self.doomed.load(Ordering::Acquire) {
            self.backend.delete_payload(&self.handle);
        }
    }
}
