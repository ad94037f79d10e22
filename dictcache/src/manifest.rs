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

use bytes::Bytes;
use dictcache_common::error::{Error, ErrorKind, Result};
use dictcache_storage::BlobToken;
use serde::{Deserialize, Serialize};

use crate::{isolation::IsolationKey, record::DictionaryRecord};

/// "dictcach"
const MAGIC: u64 = 0x6469_6374_6361_6368;
const VERSION: u32 = 1;

/// Persisted metadata of every dictionary of an on-disk cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    magic: u64,
    version: u32,
    /// Dictionaries with the blob holding their payload.
    pub entries: Vec<ManifestEntry>,
}

/// A persisted dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[expect(missing_docs)]
pub struct ManifestEntry {
    pub isolation_key: IsolationKey,
    pub record: DictionaryRecord,
    pub token: BlobToken,
}

impl Manifest {
    /// Create a manifest with the given entries.
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            entries,
        }
    }

    /// Serialize the manifest.
    pub fn encode(&self) -> Result<Bytes> {
        bincode::serialize(self)
            .map(Bytes::from)
            .map_err(|e| Error::new(ErrorKind::Parse, "encode manifest failed").with_source(e))
    }

    /// Deserialize a manifest and check its magic and version.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let manifest: Self = bincode::deserialize(buf)
            .map_err(|e| Error::new(ErrorKind::Parse, "decode manifest failed").with_source(e))?;
        if manifest.magic != MAGIC || manifest.version != VERSION {
            return Err(Error::new(ErrorKind::MagicMismatch, "unrecognized manifest")
                .with_context("magic", format!("{:#x}", manifest.magic))
                .with_context("version", manifest.version));
        }
        Ok(manifest)
    }
}
