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

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use url::Url;

use crate::{
    dictionary::SharedDictionary,
    index::MatchIndex,
    isolation::{IsolationKey, Origin},
    manager::ManagerInner,
    record::{DictionaryRecord, DictionaryRegistration},
    writer::DictionaryWriter,
};

#[derive(Debug)]
pub(crate) struct StorageInner {
    pub(crate) isolation_key: IsolationKey,
    pub(crate) index: Mutex<MatchIndex>,
    pub(crate) manager: Weak<ManagerInner>,
}

impl StorageInner {
    pub(crate) fn new(isolation_key: IsolationKey, manager: Weak<ManagerInner>) -> Self {
        Self {
            isolation_key,
            index: Mutex::new(MatchIndex::default()),
            manager,
        }
    }
}

/// Dictionaries of a single isolation key.
///
/// A partition stays registered in its manager while it holds dictionaries or any handle to it is alive. Once it
/// is empty and the last handle is dropped, the manager forgets it.
#[derive(Debug, Clone)]
pub struct DictionaryStorage {
    pub(crate) inner: Arc<StorageInner>,
}

impl DictionaryStorage {
    /// Isolation key of the partition.
    pub fn isolation_key(&self) -> &IsolationKey {
        &self.inner.isolation_key
    }

    /// Create a writer that registers a dictionary into the partition when finished.
    pub fn create_writer(&self, registration: DictionaryRegistration) -> DictionaryWriter {
        DictionaryWriter::new(self.clone(), registration)
    }

    /// Find the live dictionary with the longest pattern matching `url`, and mark it used.
    pub fn match_dictionary(&self, url: &Url) -> Option<SharedDictionary> {
        let manager = self.inner.manager.upgrade()?;
        manager.match_dictionary(&self.inner, url, |_| true)
    }

    /// Whether a dictionary registered by exactly the same advertisement is already stored.
    pub fn is_already_registered(&self, registration: &DictionaryRegistration) -> bool {
        let Some(origin) = Origin::from_url(registration.source_url()) else {
            return false;
        };
        self.inner
            .index
            .lock()
            .get(&origin, registration.match_pattern())
            .is_some_and(|d| d.record.is_registered_by(registration))
    }

    /// Records of all dictionaries in the partition, ordered by origin and pattern.
    pub fn dictionaries(&self) -> Vec<DictionaryRecord> {
        self.inner.index.lock().iter().map(|d| d.record.clone()).collect()
    }

    /// Whether the partition holds no dictionary.
    pub fn is_empty(&self) -> bool {
        self.inner.index.lock().is_empty()
    }
}

impl Drop for DictionaryStorage {
    fn drop(&mut self) {
        if let Some(manager) = self.inner.manager.upgrade() {
            manager.release_storage(&self.inner);
        }
    }
}
