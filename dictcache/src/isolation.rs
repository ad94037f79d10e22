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

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use url::Url;

/// A tuple origin: scheme, host and port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Origin {
    scheme: String,
    host: String,
    port: u16,
}

impl Origin {
    /// Create an origin from its parts. Scheme and host are lowercased.
    pub fn new(scheme: impl AsRef<str>, host: impl AsRef<str>, port: u16) -> Self {
        Self {
            scheme: scheme.as_ref().to_ascii_lowercase(),
            host: host.as_ref().to_ascii_lowercase(),
            port,
        }
    }

    /// Origin of a URL.
    ///
    /// Returns `None` for URLs with an opaque origin, e.g. `data:` URLs or URLs without a known default port.
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(url.scheme(), host, port))
    }

    /// Parse the origin of a URL string.
    pub fn parse(url: &str) -> Option<Self> {
        Url::parse(url).ok().as_ref().and_then(Self::from_url)
    }

    /// Scheme of the origin.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host of the origin.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port of the origin.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Site of the origin.
    pub fn site(&self) -> Site {
        Site::new(&self.scheme, &self.host)
    }

    /// URL that identifies the origin, e.g. `https://a.test/`.
    pub fn url(&self) -> Option<Url> {
        Url::parse(&format!("{self}/")).ok()
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if default_port(&self.scheme) == Some(self.port) {
            write!(f, "{}://{}", self.scheme, self.host)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}

/// A schemeful site: scheme and host of the top-level frame.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Site {
    scheme: String,
    host: String,
}

impl Site {
    /// Create a site from its parts. Scheme and host are lowercased.
    pub fn new(scheme: impl AsRef<str>, host: impl AsRef<str>) -> Self {
        Self {
            scheme: scheme.as_ref().to_ascii_lowercase(),
            host: host.as_ref().to_ascii_lowercase(),
        }
    }

    /// Site of a URL.
    pub fn from_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        Some(Self::new(url.scheme(), host))
    }

    /// Parse the site of a URL string.
    pub fn parse(url: &str) -> Option<Self> {
        Url::parse(url).ok().as_ref().and_then(Self::from_url)
    }

    /// Scheme of the site.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host of the site.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// URL that identifies the site, e.g. `https://top.test/`.
    pub fn url(&self) -> Option<Url> {
        Url::parse(&format!("{self}/")).ok()
    }
}

impl Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)
    }
}

/// Partition key of all dictionary state: the requesting frame origin and the top-level site.
///
/// Dictionaries registered under one isolation key are never visible under another one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IsolationKey {
    frame_origin: Origin,
    top_frame_site: Site,
}

impl IsolationKey {
    /// Create an isolation key.
    pub fn new(frame_origin: Origin, top_frame_site: Site) -> Self {
        Self {
            frame_origin,
            top_frame_site,
        }
    }

    /// Isolation key of a frame at `frame_url` embedded in a top-level page at `top_frame_url`.
    ///
    /// Returns `None` if the frame origin is opaque.
    pub fn from_urls(frame_url: &Url, top_frame_url: &Url) -> Option<Self> {
        Some(Self::new(Origin::from_url(frame_url)?, Site::from_url(top_frame_url)?))
    }

    /// Origin of the requesting frame.
    pub fn frame_origin(&self) -> &Origin {
        &self.frame_origin
    }

    /// Site of the top-level frame.
    pub fn top_frame_site(&self) -> &Site {
        &self.top_frame_site
    }
}

impl Display for IsolationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.frame_origin, self.top_frame_site)
    }
}
