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

use std::{collections::HashSet, sync::Arc};

use bytes::Bytes;
use dictcache_storage::{BlobStore, BlobToken, FsBlobStoreBuilder};
use futures_util::future::try_join_all;

const BLOBS: usize = 64;

fn data(i: usize) -> Bytes {
    Bytes::from(vec![i as u8; 1024 + i])
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn test_concurrent_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn BlobStore> = Arc::new(FsBlobStoreBuilder::new(dir.path()).build().unwrap());

    let tokens = (0..BLOBS).map(|_| BlobToken::random()).collect::<Vec<_>>();
    try_join_all(
        tokens
            .iter()
            .enumerate()
            .map(|(i, token)| store.write(*token, data(i))),
    )
    .await
    .unwrap();

    let stored = store.tokens().await.unwrap().into_iter().collect::<HashSet<_>>();
    assert_eq!(stored, tokens.iter().copied().collect::<HashSet<_>>());

    let reads = try_join_all(tokens.iter().map(|token| store.read(*token))).await.unwrap();
    for (i, read) in reads.into_iter().enumerate() {
        assert_eq!(read, data(i));
    }
}

#[test_log::test(tokio::test)]
async fn test_overwrite_and_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStoreBuilder::new(dir.path()).build().unwrap();

    store.write(BlobToken::MANIFEST, Bytes::from_static(b"v1")).await.unwrap();
    store.write(BlobToken::MANIFEST, Bytes::from_static(b"v2")).await.unwrap();
    assert_eq!(store.read(BlobToken::MANIFEST).await.unwrap(), Bytes::from_static(b"v2"));

    // Leftovers of interrupted writes and unrelated files are not blobs.
    let token = BlobToken::random();
    std::fs::write(dir.path().join(format!("dictcache-blob-{token}.tmp")), b"partial").unwrap();
    std::fs::write(dir.path().join("dictcache-blob-nothex"), b"?").unwrap();
    std::fs::write(dir.path().join("README"), b"hello").unwrap();

    assert_eq!(store.tokens().await.unwrap(), vec![BlobToken::MANIFEST]);
    assert!(store.read(token).await.is_err());
}
