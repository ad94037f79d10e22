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

//! Blob storage for dictcache.
//!
//! The on-disk dictionary backend keeps every payload as an opaque blob addressed by a [`BlobToken`]. The blob
//! store knows nothing about dictionaries, partitions or eviction.

mod blob;
mod fs;

pub use blob::{BlobStore, BlobToken, BlobWriter};
pub use fs::{FsBlobStore, FsBlobStoreBuilder};
