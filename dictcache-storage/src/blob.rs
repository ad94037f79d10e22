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
    fmt::{Debug, Display},
    str::FromStr,
};

use bytes::Bytes;
use dictcache_common::error::{Error, ErrorKind, Result};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Opaque address of a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlobToken(u128);

impl BlobToken {
    /// Reserved token of the manifest blob.
    pub const MANIFEST: BlobToken = BlobToken(0);

    /// Generate a random token. Never returns a reserved token.
    pub fn random() -> Self {
        loop {
            let token = BlobToken(rand::random());
            if !token.is_reserved() {
                return token;
            }
        }
    }

    /// Whether the token is reserved for metadata.
    pub fn is_reserved(&self) -> bool {
        *self == Self::MANIFEST
    }

    /// Raw value of the token.
    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl From<u128> for BlobToken {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Display for BlobToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for BlobToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 32 {
            return Err(Error::new(ErrorKind::Parse, "blob token must be 32 hex digits").with_context("token", s));
        }
        u128::from_str_radix(s, 16)
            .map(BlobToken)
            .map_err(|e| Error::new(ErrorKind::Parse, "invalid blob token").with_source(e))
    }
}

/// Opaque key to bytes store.
///
/// Reads and writes complete asynchronously; dropping a returned future before it resolves abandons the
/// operation. Deletion is detached and best-effort.
pub trait BlobStore: Send + Sync + 'static + Debug {
    /// Store `data` under `token`, replacing any existing blob.
    fn write(&self, token: BlobToken, data: Bytes) -> BoxFuture<'static, Result<()>>;

    /// Load the whole blob stored under `token`.
    ///
    /// A missing blob is reported with [`ErrorKind::NotFound`].
    fn read(&self, token: BlobToken) -> BoxFuture<'static, Result<Bytes>>;

    /// Open an incremental writer for the blob stored under `token`.
    ///
    /// The blob becomes visible once [`BlobWriter::finish`] resolves. Dropping the writer before that discards
    /// the bytes written so far.
    fn writer(&self, token: BlobToken) -> Box<dyn BlobWriter>;

    /// Delete the blob stored under `token` in the background. Missing blobs are ignored.
    fn delete(&self, token: BlobToken);

    /// List the tokens of all stored blobs, reserved ones included.
    fn tokens(&self) -> BoxFuture<'static, Result<Vec<BlobToken>>>;
}

/// Incremental writer of a single blob, obtained from [`BlobStore::writer`].
pub trait BlobWriter: Send + Debug {
    /// Append `data` to the blob.
    fn write(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Complete the blob, replacing any existing blob under the same token.
    fn finish(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}
