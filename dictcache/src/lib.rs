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

//! A partitioned cache of shared compression dictionaries.
//!
//! Dictionaries advertised by responses through the `use-as-dictionary` header are admitted by a
//! [`DictionaryAdmission`], streamed into a [`DictionaryWriter`] and stored in the [`DictionaryStorage`] of
//! their [`IsolationKey`]. Outgoing requests find the best matching dictionary through
//! [`DictionaryManager::lookup`].
//!
//! The [`DictionaryManager`] owns every partition and enforces the global and per-site byte and count caps.
//! Dictionaries are kept in memory by default, or on disk when a [`BlobStore`] is supplied.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dictcache::{DictionaryManagerBuilder, FsBlobStoreBuilder};
//!
//! # async fn open() -> dictcache::Result<()> {
//! let store = FsBlobStoreBuilder::new("/tmp/dictcache").build()?;
//! let manager = DictionaryManagerBuilder::new()
//!     .with_cache_max_size(64 * 1024 * 1024)
//!     .with_blob_store(Arc::new(store))
//!     .build()
//!     .await?;
//! # drop(manager);
//! # Ok(())
//! # }
//! ```

mod admission;
mod backend;
mod dictionary;
mod eviction;
mod freshness;
mod header;
mod index;
mod isolation;
mod manager;
mod manifest;
mod pattern;
mod record;
mod request;
mod storage;
mod writer;

mod prelude;
pub use prelude::*;
