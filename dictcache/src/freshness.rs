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

//! HTTP caching arithmetic (RFC 9111) used to derive how long a dictionary advertisement stays valid.

use std::time::{Duration, SystemTime};

use chrono::DateTime;
use http::{
    header::{AGE, CACHE_CONTROL, DATE, EXPIRES, LAST_MODIFIED},
    HeaderMap, HeaderName,
};

/// Parsed `Cache-Control` response directives relevant to freshness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    /// `no-store` directive.
    pub no_store: bool,
    /// `no-cache` directive.
    pub no_cache: bool,
    /// `must-revalidate` directive.
    pub must_revalidate: bool,
    /// `max-age` directive.
    pub max_age: Option<Duration>,
    /// `stale-while-revalidate` directive.
    pub stale_while_revalidate: Option<Duration>,
}

impl CacheControl {
    /// Parse all `Cache-Control` header values. Unknown or malformed directives are ignored.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cc = Self::default();
        for value in headers.get_all(CACHE_CONTROL).iter().filter_map(|v| v.to_str().ok()) {
            for part in value.split(',') {
                let part = part.trim();
                let (name, arg) = match part.split_once('=') {
                    Some((name, arg)) => (name.trim(), Some(arg.trim().trim_matches('"'))),
                    None => (part, None),
                };
                let seconds = || arg.and_then(|v| v.parse::<u64>().ok()).map(Duration::from_secs);
                match name.to_ascii_lowercase().as_str() {
                    "no-store" => cc.no_store = true,
                    "no-cache" => cc.no_cache = true,
                    "must-revalidate" => cc.must_revalidate = true,
                    // The first occurrence wins.
                    "max-age" if cc.max_age.is_none() => cc.max_age = seconds(),
                    "stale-while-revalidate" if cc.stale_while_revalidate.is_none() => {
                        cc.stale_while_revalidate = seconds()
                    }
                    _ => {}
                }
            }
        }
        cc
    }
}

/// Freshness lifetime and staleness window of a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifetimes {
    /// How long the response is fresh since it was generated.
    pub freshness: Duration,
    /// How long the response may additionally be used while stale.
    pub staleness: Duration,
}

impl Lifetimes {
    /// Compute the lifetimes of a response received at `response_time`.
    pub fn from_headers(headers: &HeaderMap, response_time: SystemTime) -> Self {
        let cc = CacheControl::from_headers(headers);

        if cc.no_store || cc.no_cache {
            return Self::default();
        }

        let staleness = match cc.must_revalidate {
            true => Duration::ZERO,
            false => cc.stale_while_revalidate.unwrap_or_default(),
        };

        let date = http_date(headers, DATE).unwrap_or(response_time);

        let freshness = if let Some(max_age) = cc.max_age {
            max_age
        } else if headers.contains_key(EXPIRES) {
            // An invalid `Expires` means already expired.
            http_date(headers, EXPIRES)
                .and_then(|expires| expires.duration_since(date).ok())
                .unwrap_or_default()
        } else if let Some(last_modified) = http_date(headers, LAST_MODIFIED) {
            // Heuristic freshness: 10% of the time since last modification.
            date.duration_since(last_modified).unwrap_or_default() / 10
        } else {
            Duration::ZERO
        };

        Self { freshness, staleness }
    }
}

/// Age of a response at `now`, given when its request was sent and when it was received.
pub fn current_age(headers: &HeaderMap, request_time: SystemTime, response_time: SystemTime, now: SystemTime) -> Duration {
    let date = http_date(headers, DATE).unwrap_or(response_time);
    let age_value = headers
        .get(AGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_default();

    let apparent_age = response_time.duration_since(date).unwrap_or_default();
    let response_delay = response_time.duration_since(request_time).unwrap_or_default();
    let corrected_age_value = age_value.saturating_add(response_delay);
    let corrected_initial_age = apparent_age.max(corrected_age_value);
    let resident_time = now.duration_since(response_time).unwrap_or_default();

    corrected_initial_age.saturating_add(resident_time)
}

/// Expiration of a dictionary advertised by a response: freshness plus staleness minus the age at response time.
///
/// Returns `None` if the result is not positive.
pub fn expiration(headers: &HeaderMap, request_time: SystemTime, response_time: SystemTime) -> Option<Duration> {
    let lifetimes = Lifetimes::from_headers(headers, response_time);
    let age = current_age(headers, request_time, response_time, response_time);
    lifetimes
        .freshness
        .saturating_add(lifetimes.staleness)
        .checked_sub(age)
        .filter(|expiration| !expiration.is_zero())
}

fn http_date(headers: &HeaderMap, name: HeaderName) -> Option<SystemTime> {
    let value = headers.get(name)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(value.trim()).ok().map(SystemTime::from)
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    fn at(secs: u64) -> SystemTime {
        // Sun, 06 Nov 1994 08:49:37 GMT
        SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777 + secs)
    }

    #[test]
    fn test_cache_control() {
        let cc = CacheControl::from_headers(&headers(&[
            ("cache-control", "public, Max-Age=60"),
            ("cache-control", "stale-while-revalidate=\"30\", max-age=10"),
        ]));
        assert_eq!(cc.max_age, Some(Duration::from_secs(60)));
        assert_eq!(cc.stale_while_revalidate, Some(Duration::from_secs(30)));
        assert!(!cc.no_store);
    }

    #[test]
    fn test_max_age_and_staleness() {
        let h = headers(&[("cache-control", "max-age=100, stale-while-revalidate=20")]);
        let l = Lifetimes::from_headers(&h, at(0));
        assert_eq!(l.freshness, Duration::from_secs(100));
        assert_eq!(l.staleness, Duration::from_secs(20));
        assert_eq!(expiration(&h, at(0), at(0)), Some(Duration::from_secs(120)));

        let h = headers(&[("cache-control", "max-age=100, stale-while-revalidate=20, must-revalidate")]);
        assert_eq!(expiration(&h, at(0), at(0)), Some(Duration::from_secs(100)));
    }

    #[test]
    fn test_no_store_is_not_fresh() {
        let h = headers(&[("cache-control", "max-age=100, no-store")]);
        assert_eq!(expiration(&h, at(0), at(0)), None);
    }

    #[test]
    fn test_expires_and_heuristic() {
        let h = headers(&[
            ("date", "Sun, 06 Nov 1994 08:49:37 GMT"),
            ("expires", "Sun, 06 Nov 1994 09:49:37 GMT"),
        ]);
        assert_eq!(expiration(&h, at(0), at(0)), Some(Duration::from_secs(3600)));

        let h = headers(&[("date", "Sun, 06 Nov 1994 08:49:37 GMT"), ("expires", "0")]);
        assert_eq!(expiration(&h, at(0), at(0)), None);

        let h = headers(&[
            ("date", "Sun, 06 Nov 1994 08:49:37 GMT"),
            ("last-modified", "Sun, 06 Nov 1994 06:09:37 GMT"),
        ]);
        assert_eq!(expiration(&h, at(0), at(0)), Some(Duration::from_secs(960)));
    }

    #[test]
    fn test_age_is_subtracted() {
        let h = headers(&[("cache-control", "max-age=100"), ("age", "30")]);
        // 30s age header + 5s response delay
        assert_eq!(expiration(&h, at(0), at(5)), Some(Duration::from_secs(65)));

        let h = headers(&[("cache-control", "max-age=100"), ("date", "Sun, 06 Nov 1994 08:49:37 GMT")]);
        // apparent age of 40s wins over the 1s response delay
        assert_eq!(current_age(&h, at(39), at(40), at(40)), Duration::from_secs(40));
        assert_eq!(current_age(&h, at(39), at(40), at(50)), Duration::from_secs(50));

        let h = headers(&[("cache-control", "max-age=10"), ("age", "10")]);
        assert_eq!(expiration(&h, at(0), at(0)), None);
    }

    #[test]
    fn test_huge_values_saturate() {
        let h = headers(&[(
            "cache-control",
            "max-age=18446744073709551615, stale-while-revalidate=18446744073709551615",
        )]);
        assert_eq!(expiration(&h, at(0), at(0)), Some(Duration::MAX));

        let h = headers(&[("cache-control", "max-age=100"), ("age", "18446744073709551615")]);
        assert_eq!(current_age(&h, at(0), at(5), at(10)), Duration::MAX);
        assert_eq!(expiration(&h, at(0), at(5)), None);
    }
}
