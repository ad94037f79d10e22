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

use url::Url;

use crate::isolation::Origin;

/// Match `text` against a glob `pattern` where `*` matches any sequence of characters.
///
/// Every other character, `?` included, only matches itself.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text position it is currently anchored at.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, anchor)) = backtrack {
            p = star + 1;
            t = anchor + 1;
            backtrack = Some((star, anchor + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Resolve a `match` value advertised by a response at `response_url` into a stored match pattern.
///
/// The value is resolved as a relative URL. Returns `None` if it does not resolve or resolves to another origin.
/// The stored pattern is the resolved path, followed by `?` and the query when the value carries one.
pub fn resolve_match(response_url: &Url, value: &str) -> Option<String> {
    let resolved = response_url.join(value).ok()?;
    if Origin::from_url(&resolved)? != Origin::from_url(response_url)? {
        return None;
    }
    let mut pattern = resolved.path().to_string();
    if let Some(query) = resolved.query() {
        pattern.push('?');
        pattern.push_str(query);
    }
    Some(pattern)
}

/// Whether `url` matches a stored match `pattern`.
///
/// Patterns without a query match against the path only.
pub fn url_matches(pattern: &str, url: &Url) -> bool {
    if pattern.contains('?') {
        let target = format!("{}?{}", url.path(), url.query().unwrap_or_default());
        glob_match(pattern, &target)
    } else {
        glob_match(pattern, url.path())
    }
}
