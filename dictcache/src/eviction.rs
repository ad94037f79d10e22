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

use std::time::SystemTime;

use itertools::Itertools;

use crate::isolation::{IsolationKey, Origin, Site};

/// Eviction related information of a stored dictionary.
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
    /// Partition of the dictionary.
    pub isolation_key: IsolationKey,
    /// Registered origin of the dictionary.
    pub origin: Origin,
    /// Match pattern of the dictionary.
    pub pattern: String,
    /// Payload size.
    pub size: u64,
    /// Last time the dictionary was matched.
    pub last_used_time: SystemTime,
    /// Time the dictionary was received.
    pub response_time: SystemTime,
}

impl EvictionCandidate {
    fn site(&self) -> &Site {
        self.isolation_key.top_frame_site()
    }
}

/// Byte and count caps. A byte cap of `0` means unbounded size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionLimits {
    /// Byte cap, `0` for unbounded.
    pub max_size: u64,
    /// Count cap.
    pub max_count: usize,
}

impl EvictionLimits {
    /// Caps of a single top-level site: half of the global caps.
    pub fn per_site(&self) -> Self {
        Self {
            max_size: self.max_size / 2,
            max_count: self.max_count / 2,
        }
    }

    fn exceeded(&self, size: u64, count: usize) -> bool {
        (self.max_size != 0 && size > self.max_size) || count > self.max_count
    }

    /// Whether the usage is below the 90% low-water mark.
    fn drained(&self, size: u64, count: usize) -> bool {
        let size_low = (self.max_size as u128 * 9 / 10) as u64;
        let count_low = (self.max_count as u128 * 9 / 10) as usize;
        (self.max_size == 0 || size <= size_low) && count <= count_low
    }
}

/// Sites whose caps are checked by the per-site pass.
#[derive(Debug, Clone, Copy)]
pub enum EvictionScope<'a> {
    /// Only the site that just got a new dictionary.
    Site(&'a Site),
    /// Every site, e.g. after the global caps changed.
    All,
}

/// Pick the dictionaries to evict. Returns indices into `candidates`.
///
/// A per-site pass runs first for the sites in `scope`: a site over half of the global caps loses its least
/// recently used dictionaries until it is back under 90% of its caps. Then a global pass does the same for the
/// global caps regardless of sites.
///
/// Dictionaries are ordered by last use, then response time, then partition, origin and pattern.
pub fn pick(candidates: &[EvictionCandidate], limits: EvictionLimits, scope: EvictionScope<'_>) -> Vec<usize> {
    let order = (0..candidates.len())
        .sorted_by(|&a, &b| {
            let (a, b) = (&candidates[a], &candidates[b]);
            a.last_used_time
                .cmp(&b.last_used_time)
                .then(a.response_time.cmp(&b.response_time))
                .then_with(|| a.isolation_key.cmp(&b.isolation_key))
                .then_with(|| a.origin.cmp(&b.origin))
                .then_with(|| a.pattern.cmp(&b.pattern))
        })
        .collect_vec();

    let mut evicted = vec![false; candidates.len()];
    let mut picked = vec![];

    let per_site = limits.per_site();
    let sites = match scope {
        EvictionScope::Site(site) => vec![site.clone()],
        EvictionScope::All => candidates.iter().map(|c| c.site().clone()).sorted().dedup().collect_vec(),
    };
    for site in sites.iter() {
        let in_site = |i: usize| candidates[i].site() == site;
        let mut size = order.iter().filter(|&&i| in_site(i)).map(|&i| candidates[i].size).sum::<u64>();
        let mut count = order.iter().filter(|&&i| in_site(i)).count();
        if !per_site.exceeded(size, count) {
            continue;
        }
        tracing::debug!(%site, size, count, ?per_site, "[eviction]: site over limits");
        for &i in order.iter().filter(|&&i| in_site(i)) {
            if per_site.drained(size, count) {
                break;
            }
            evicted[i] = true;
            picked.push(i);
            size -= candidates[i].size;
            count -= 1;
        }
    }

    let mut size = order.iter().filter(|&&i| !evicted[i]).map(|&i| candidates[i].size).sum::<u64>();
    let mut count = order.iter().filter(|&&i| !evicted[i]).count();
    if limits.exceeded(size, count) {
        tracing::debug!(size, count, ?limits, "[eviction]: cache over limits");
        for &i in order.iter() {
            if limits.drained(size, count) {
                break;
            }
            if evicted[i] {
                continue;
            }
            evicted[i] = true;
            picked.push(i);
            size -= candidates[i].size;
            count -= 1;
        }
    }

    picked
}
