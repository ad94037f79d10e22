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

use std::{collections::BTreeMap, sync::Arc, time::SystemTime};

use url::Url;

use crate::{backend::Payload, isolation::Origin, pattern::url_matches, record::DictionaryRecord};

/// A record with the payload it describes.
#[derive(Debug, Clone)]
pub struct StoredDictionary {
    pub record: DictionaryRecord,
    pub payload: Arc<Payload>,
}

/// Per-partition index: registered origin -> match pattern -> dictionary.
///
/// Iteration is ordered by origin, then pattern.
#[derive(Debug, Default)]
pub struct MatchIndex {
    origins: BTreeMap<Origin, BTreeMap<String, StoredDictionary>>,
    size: u64,
    count: usize,
}

impl MatchIndex {
    /// Insert a dictionary, returning the one it replaces.
    pub fn insert(&mut self, dictionary: StoredDictionary) -> Option<StoredDictionary> {
        self.size += dictionary.record.size();
        self.count += 1;
        let old = self
            .origins
            .entry(dictionary.record.registered_origin().clone())
            .or_default()
            .insert(dictionary.record.match_pattern().to_string(), dictionary);
        if let Some(old) = &old {
            self.size -= old.record.size();
            self.count -= 1;
        }
        old
    }

    /// Remove the dictionary registered by `origin` under `pattern`.
    pub fn remove(&mut self, origin: &Origin, pattern: &str) -> Option<StoredDictionary> {
        let patterns = self.origins.get_mut(origin)?;
        let removed = patterns.remove(pattern)?;
        if patterns.is_empty() {
            self.origins.remove(origin);
        }
        self.size -= removed.record.size();
        self.count -= 1;
        Some(removed)
    }

    /// Find the live dictionary with the longest pattern matching `url` among the ones `filter` accepts.
    ///
    /// Among equally long patterns the lexicographically smallest one wins.
    pub fn find(
        &mut self,
        url: &Url,
        now: SystemTime,
        filter: impl Fn(&DictionaryRecord) -> bool,
    ) -> Option<&mut StoredDictionary> {
        let origin = Origin::from_url(url)?;
        let patterns = self.origins.get_mut(&origin)?;

        let mut best: Option<&mut StoredDictionary> = None;
        for (pattern, dictionary) in patterns.iter_mut() {
            if !dictionary.record.is_live(now) || !url_matches(pattern, url) || !filter(&dictionary.record) {
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|b| pattern.len() > b.record.match_pattern().len())
            {
                best = Some(dictionary);
            }
        }
        best
    }

    /// Get a dictionary by its registered origin and pattern.
    pub fn get(&self, origin: &Origin, pattern: &str) -> Option<&StoredDictionary> {
        self.origins.get(origin)?.get(pattern)
    }

    /// Remove every dictionary for which `f` returns `false`, returning the removed ones.
    pub fn retain(&mut self, mut f: impl FnMut(&DictionaryRecord) -> bool) -> Vec<StoredDictionary> {
        let mut removed = vec![];
        for patterns in self.origins.values_mut() {
            let (keep, drop): (BTreeMap<_, _>, BTreeMap<_, _>) =
                std::mem::take(patterns).into_iter().partition(|(_, d)| f(&d.record));
            *patterns = keep;
            removed.extend(drop.into_values());
        }
        self.origins.retain(|_, patterns| !patterns.is_empty());
        for d in removed.iter() {
            self.size -= d.record.size();
            self.count -= 1;
        }
        removed
    }

    /// Iterate all dictionaries.
    pub fn iter(&self) -> impl Iterator<Item = &StoredDictionary> {
        self.origins.values().flat_map(|patterns| patterns.values())
    }

    /// Total payload size of all dictionaries.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Count of dictionaries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the index holds no dictionary.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
