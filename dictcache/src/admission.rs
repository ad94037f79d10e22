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
    fmt::Debug,
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures_util::future::BoxFuture;
use http::HeaderMap;
use itertools::Itertools;
use url::Url;

use crate::{
    freshness,
    header::{BareItem, Dictionary, Member, StructuredFieldParser},
    isolation::IsolationKey,
    pattern::resolve_match,
    record::DictionaryRegistration,
    request::Destination,
    storage::DictionaryStorage,
    writer::DictionaryWriter,
};

/// Name of the response header advertising a dictionary.
pub const USE_AS_DICTIONARY: &str = "use-as-dictionary";

/// Longest accepted dictionary id, in bytes.
pub const MAX_ID_LENGTH: usize = 1024;

/// Expiration cap applied unless full dictionary transport is enabled.
pub const MAX_EXPIRATION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const RAW_TYPE: &str = "raw";
const SHA_256: &str = "sha-256";

/// The parts of a response the admission policy looks at.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    /// URL of the response, which becomes the source URL of the dictionary.
    pub url: Url,
    /// Response headers.
    pub headers: HeaderMap,
    /// When the request was sent.
    pub request_time: SystemTime,
    /// When the response was received.
    pub response_time: SystemTime,
    /// Whether the response was served from the HTTP cache.
    pub was_fetched_via_cache: bool,
}

/// Decides whether a dictionary from `url` may be stored in the partition of `isolation_key`.
pub trait AccessChecker: Send + Sync + 'static + Debug {
    /// Resolve to `true` if storing is allowed.
    fn check(&self, isolation_key: &IsolationKey, url: &Url) -> BoxFuture<'static, bool>;
}

/// Access checker that allows everything.
#[derive(Debug, Default)]
pub struct AllowAll;

impl AccessChecker for AllowAll {
    fn check(&self, _: &IsolationKey, _: &Url) -> BoxFuture<'static, bool> {
        Box::pin(async { true })
    }
}

/// Why a response was not admitted as a dictionary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The response has no `use-as-dictionary` header.
    #[error("no dictionary advertised")]
    MissingHeader,
    /// The header is not a structured dictionary.
    #[error("malformed use-as-dictionary header")]
    MalformedHeader,
    /// `match` is missing, not a string, or does not resolve to a same-origin pattern.
    #[error("invalid match value")]
    InvalidMatch,
    /// `match-dest` is not an inner list of strings.
    #[error("invalid match-dest value")]
    InvalidMatchDest,
    /// `type` is not a token, or names a dictionary type other than `raw`.
    #[error("unsupported dictionary type")]
    UnsupportedType,
    /// `id` is not a string.
    #[error("invalid id value")]
    InvalidId,
    /// `id` is longer than [`MAX_ID_LENGTH`].
    #[error("id is too long: {0} bytes")]
    IdTooLong(usize),
    /// `algorithms` names something other than `sha-256`.
    #[error("unsupported hash algorithm")]
    UnsupportedAlgorithm,
    /// The response is not fresh enough to be used as a dictionary.
    #[error("response is not fresh")]
    NotFresh,
    /// The same advertisement is already stored and the response was replayed from the HTTP cache.
    #[error("dictionary is already registered")]
    AlreadyRegistered,
    /// The access checker denied storing the dictionary.
    #[error("access denied")]
    AccessDenied,
}

/// Admission policy turning `use-as-dictionary` advertisements into dictionary writers.
#[derive(Debug, Clone)]
pub struct DictionaryAdmission {
    parser: Arc<dyn StructuredFieldParser>,
    access_checker: Arc<dyn AccessChecker>,
    full_transport: bool,
}

impl DictionaryAdmission {
    /// Parse the advertisement of a response into a registration.
    pub fn parse(&self, response: &ResponseInfo) -> Result<DictionaryRegistration, Rejection> {
        let value = response
            .headers
            .get_all(USE_AS_DICTIONARY)
            .iter()
            .map(|value| value.to_str().map_err(|_| Rejection::MalformedHeader))
            .collect::<Result<Vec<_>, _>>()?;
        if value.is_empty() {
            return Err(Rejection::MissingHeader);
        }
        let dictionary = self
            .parser
            .parse_dictionary(&value.join(", "))
            .ok_or(Rejection::MalformedHeader)?;

        let match_value = string(&dictionary, "match")
            .ok_or(Rejection::InvalidMatch)?
            .ok_or(Rejection::InvalidMatch)?;
        let match_pattern = resolve_match(&response.url, match_value).ok_or(Rejection::InvalidMatch)?;

        let match_dest = match dictionary.get("match-dest") {
            None => vec![],
            Some(Member::InnerList(items, _)) => items
                .iter()
                .map(|item| item.bare.as_string().ok_or(Rejection::InvalidMatchDest))
                .filter_map_ok(|dest| dest.parse::<Destination>().ok())
                .collect::<Result<Vec<_>, _>>()?,
            Some(Member::Item(_)) => return Err(Rejection::InvalidMatchDest),
        };

        match dictionary.get("type") {
            None => {}
            Some(Member::Item(item)) if item.bare.as_token() == Some(RAW_TYPE) => {}
            Some(_) => return Err(Rejection::UnsupportedType),
        }

        let id = match string(&dictionary, "id") {
            None => None,
            Some(None) => return Err(Rejection::InvalidId),
            Some(Some(id)) if id.len() > MAX_ID_LENGTH => return Err(Rejection::IdTooLong(id.len())),
            Some(Some(id)) => Some(id.to_string()),
        };

        let algorithms_ok = match dictionary.get("algorithms") {
            None => true,
            Some(Member::Item(item)) => is_sha_256(&item.bare),
            Some(Member::InnerList(items, _)) => items.iter().all(|item| is_sha_256(&item.bare)),
        };
        if !algorithms_ok {
            return Err(Rejection::UnsupportedAlgorithm);
        }

        let mut expiration = freshness::expiration(&response.headers, response.request_time, response.response_time)
            .ok_or(Rejection::NotFresh)?;
        if !self.full_transport {
            expiration = expiration.min(MAX_EXPIRATION);
        }

        let mut registration =
            DictionaryRegistration::new(response.url.clone(), match_pattern, response.response_time, expiration)
                .with_match_dest(match_dest);
        if let Some(id) = id {
            registration = registration.with_id(id);
        }
        Ok(registration)
    }

    /// Decide whether the dictionary advertised by `response` is stored in `storage`.
    ///
    /// On admission, returns the writer the response body should be streamed into.
    pub async fn admit(
        &self,
        storage: &DictionaryStorage,
        response: &ResponseInfo,
    ) -> Result<DictionaryWriter, Rejection> {
        let res = self.decide(storage, response).await;

        let manager = storage.inner.manager.upgrade();
        match &res {
            Ok(registration) => {
                if let Some(manager) = manager {
                    manager.metrics.admission_accept.increase(1);
                }
                tracing::debug!(
                    key = %storage.isolation_key(),
                    url = %response.url,
                    pattern = registration.match_pattern(),
                    expiration = ?registration.expiration(),
                    "[dictionary admission]: accept"
                );
            }
            Err(rejection) => {
                if let Some(manager) = manager {
                    manager.metrics.admission_reject.increase(1);
                }
                tracing::debug!(
                    key = %storage.isolation_key(),
                    url = %response.url,
                    %rejection,
                    "[dictionary admission]: reject"
                );
            }
        }

        res.map(|registration| storage.create_writer(registration))
    }

    async fn decide(
        &self,
        storage: &DictionaryStorage,
        response: &ResponseInfo,
    ) -> Result<DictionaryRegistration, Rejection> {
        let registration = self.parse(response)?;

        // Only replays from the HTTP cache are deduplicated. A fresh fetch replaces the stored dictionary.
        if response.was_fetched_via_cache && storage.is_already_registered(&registration) {
            return Err(Rejection::AlreadyRegistered);
        }

        if !self
            .access_checker
            .check(storage.isolation_key(), &response.url)
            .await
        {
            return Err(Rejection::AccessDenied);
        }

        Ok(registration)
    }
}

/// `None` if `key` is absent, `Some(None)` if it is present but not a string item.
fn string<'a>(dictionary: &'a Dictionary, key: &str) -> Option<Option<&'a str>> {
    dictionary.get(key).map(|member| match member {
        Member::Item(item) => item.bare.as_string(),
        Member::InnerList(..) => None,
    })
}

fn is_sha_256(bare: &BareItem) -> bool {
    bare.as_token() == Some(SHA_256)
}

/// Builder of a [`DictionaryAdmission`].
#[derive(Debug)]
pub struct DictionaryAdmissionBuilder {
    parser: Arc<dyn StructuredFieldParser>,
    access_checker: Arc<dyn AccessChecker>,
    full_transport: bool,
}

impl DictionaryAdmissionBuilder {
    /// Create an admission builder with the structured field parser used for the advertisement header.
    pub fn new(parser: Arc<dyn StructuredFieldParser>) -> Self {
        Self {
            parser,
            access_checker: Arc::new(AllowAll),
            full_transport: false,
        }
    }

    /// Set the checker deciding whether a dictionary may be stored.
    ///
    /// Default: [`AllowAll`].
    pub fn with_access_checker(mut self, access_checker: Arc<dyn AccessChecker>) -> Self {
        self.access_checker = access_checker;
        self
    }

    /// Enable full dictionary transport. Without it expirations are capped at [`MAX_EXPIRATION`].
    ///
    /// Default: `false`.
    pub fn with_full_transport(mut self, full_transport: bool) -> Self {
        self.full_transport = full_transport;
        self
    }

    /// Build the admission policy.
    pub fn build(self) -> DictionaryAdmission {
        DictionaryAdmission {
            parser: self.parser,
            access_checker: self.access_checker,
            full_transport: self.full_transport,
        }
    }
}
