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

pub use dictcache_common::{
    clock::{Clock, MockClock, SystemClock},
    error::{Error, ErrorKind, Result},
    metrics::{registry::noop::NoopMetricsRegistry, BoxedRegistry, RegistryOps},
};
#[cfg(feature = "prometheus")]
pub use dictcache_common::metrics::registry::prometheus::PrometheusMetricsRegistry;
pub use dictcache_storage::{BlobStore, BlobToken, BlobWriter, FsBlobStore, FsBlobStoreBuilder};

pub use crate::{
    admission::{
        AccessChecker, AllowAll, DictionaryAdmission, DictionaryAdmissionBuilder, Rejection, ResponseInfo,
        MAX_EXPIRATION, MAX_ID_LENGTH, USE_AS_DICTIONARY,
    },
    dictionary::SharedDictionary,
    header::{BareItem, Dictionary, Item, Member, StructuredFieldParser},
    isolation::{IsolationKey, Origin, Site},
    manager::{DictionaryManager, DictionaryManagerBuilder, Usage, UsageInfo, UrlMatcher, DEFAULT_CACHE_MAX_COUNT},
    record::{DictionaryRecord, DictionaryRegistration},
    request::{Destination, DictionaryRequest},
    storage::DictionaryStorage,
    writer::DictionaryWriter,
};
