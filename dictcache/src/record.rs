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

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{isolation::Origin, request::Destination};

/// Parameters of a dictionary to register, produced by admission and consumed by a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryRegistration {
    source_url: Url,
    match_pattern: String,
    match_dest: Vec<Destination>,
    id: Option<String>,
    response_time: SystemTime,
    expiration: Duration,
}

impl DictionaryRegistration {
    /// Create a registration for a dictionary fetched from `source_url`.
    ///
    /// `match_pattern` is the pattern resolved against the source URL: a path, plus `?` and a query if any.
    pub fn new(source_url: Url, match_pattern: impl Into<String>, response_time: SystemTime, expiration: Duration) -> Self {
        Self {
            source_url,
            match_pattern: match_pattern.into(),
            match_dest: vec![],
            id: None,
            response_time,
            expiration,
        }
    }

    /// Set the request destinations the dictionary applies to. Empty means all destinations.
    pub fn with_match_dest(mut self, match_dest: Vec<Destination>) -> Self {
        self.match_dest = match_dest;
        self
    }

    /// Set the dictionary id advertised by the server.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// URL the dictionary is fetched from.
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Match pattern of the dictionary.
    pub fn match_pattern(&self) -> &str {
        &self.match_pattern
    }

    /// Request destinations of the dictionary.
    pub fn match_dest(&self) -> &[Destination] {
        &self.match_dest
    }

    /// Advertised dictionary id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Time the response carrying the dictionary was received.
    pub fn response_time(&self) -> SystemTime {
        self.response_time
    }

    /// Validity of the dictionary since `response_time`.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }
}

/// Metadata of a stored dictionary.
///
/// The payload itself is kept by the backend next to the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRecord {
    source_url: Url,
    registered_origin: Origin,
    match_pattern: String,
    match_dest: Vec<Destination>,
    id: Option<String>,
    response_time: SystemTime,
    expiration: Duration,
    last_used_time: SystemTime,
    size: u64,
    hash: [u8; 32],
}

impl DictionaryRecord {
    pub(crate) fn new(registration: DictionaryRegistration, registered_origin: Origin, size: u64, hash: [u8; 32]) -> Self {
        Self {
            last_used_time: registration.response_time,
            source_url: registration.source_url,
            registered_origin,
            match_pattern: registration.match_pattern,
            match_dest: registration.match_dest,
            id: registration.id,
            response_time: registration.response_time,
            expiration: registration.expiration,
            size,
            hash,
        }
    }

    /// URL the dictionary was fetched from.
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Origin of the source URL. Requests to this origin may use the dictionary.
    pub fn registered_origin(&self) -> &Origin {
        &self.registered_origin
    }

    /// Match pattern of the dictionary.
    pub fn match_pattern(&self) -> &str {
        &self.match_pattern
    }

    /// Request destinations of the dictionary. Empty means all destinations.
    pub fn match_dest(&self) -> &[Destination] {
        &self.match_dest
    }

    /// Advertised dictionary id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Time the response carrying the dictionary was received.
    pub fn response_time(&self) -> SystemTime {
        self.response_time
    }

    /// Validity of the dictionary since `response_time`.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// End of the live window, `None` if it lies beyond what `SystemTime` can represent.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.response_time.checked_add(self.expiration)
    }

    /// Whether the dictionary is live at `now`.
    pub fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at().is_none_or(|expires_at| now < expires_at)
    }

    /// Last time the dictionary was matched, or the response time if it never was.
    pub fn last_used_time(&self) -> SystemTime {
        self.last_used_time
    }

    /// Payload size in bytes. Never zero.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// SHA-256 digest of the payload.
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub(crate) fn touch(&mut self, now: SystemTime) {
        self.last_used_time = now;
    }

    /// Whether the record was registered from exactly the given registration.
    pub(crate) fn is_registered_by(&self, registration: &DictionaryRegistration) -> bool {
        self.source_url == registration.source_url
            && self.response_time == registration.response_time
            && self.expiration == registration.expiration
            && self.match_pattern == registration.match_pattern
            && self.match_dest == registration.match_dest
            && self.id == registration.id
    }
}
