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

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::isolation::IsolationKey;

/// Fetch request destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[expect(missing_docs)]
pub enum Destination {
    Empty,
    Audio,
    AudioWorklet,
    Document,
    Embed,
    Font,
    Frame,
    IFrame,
    Image,
    Json,
    Manifest,
    Object,
    PaintWorklet,
    Report,
    Script,
    ServiceWorker,
    SharedWorker,
    Style,
    Track,
    Video,
    WebIdentity,
    Worker,
    Xslt,
}

impl Destination {
    /// Fetch name of the destination.
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Empty => "",
            Destination::Audio => "audio",
            Destination::AudioWorklet => "audioworklet",
            Destination::Document => "document",
            Destination::Embed => "embed",
            Destination::Font => "font",
            Destination::Frame => "frame",
            Destination::IFrame => "iframe",
            Destination::Image => "image",
            Destination::Json => "json",
            Destination::Manifest => "manifest",
            Destination::Object => "object",
            Destination::PaintWorklet => "paintworklet",
            Destination::Report => "report",
            Destination::Script => "script",
            Destination::ServiceWorker => "serviceworker",
            Destination::SharedWorker => "sharedworker",
            Destination::Style => "style",
            Destination::Track => "track",
            Destination::Video => "video",
            Destination::WebIdentity => "webidentity",
            Destination::Worker => "worker",
            Destination::Xslt => "xslt",
        }
    }
}

impl Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Destination {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dest = match s {
            "" => Destination::Empty,
            "audio" => Destination::Audio,
            "audioworklet" => Destination::AudioWorklet,
            "document" => Destination::Document,
            "embed" => Destination::Embed,
            "font" => Destination::Font,
            "frame" => Destination::Frame,
            "iframe" => Destination::IFrame,
            "image" => Destination::Image,
            "json" => Destination::Json,
            "manifest" => Destination::Manifest,
            "object" => Destination::Object,
            "paintworklet" => Destination::PaintWorklet,
            "report" => Destination::Report,
            "script" => Destination::Script,
            "serviceworker" => Destination::ServiceWorker,
            "sharedworker" => Destination::SharedWorker,
            "style" => Destination::Style,
            "track" => Destination::Track,
            "video" => Destination::Video,
            "webidentity" => Destination::WebIdentity,
            "worker" => Destination::Worker,
            "xslt" => Destination::Xslt,
            _ => return Err(()),
        };
        Ok(dest)
    }
}

/// An outgoing request that may use a shared dictionary.
///
/// The cache is only consulted for requests that explicitly opted in with
/// [`DictionaryRequest::with_shared_dictionary`].
#[derive(Debug, Clone)]
pub struct DictionaryRequest {
    url: Url,
    isolation_key: IsolationKey,
    destination: Destination,
    shared_dictionary: bool,
}

impl DictionaryRequest {
    /// Create a request to `url` issued under `isolation_key`.
    pub fn new(url: Url, isolation_key: IsolationKey) -> Self {
        Self {
            url,
            isolation_key,
            destination: Destination::Empty,
            shared_dictionary: false,
        }
    }

    /// Set the request destination.
    ///
    /// Default: [`Destination::Empty`].
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Set whether the request may use a shared dictionary.
    ///
    /// Default: `false`.
    pub fn with_shared_dictionary(mut self, enable: bool) -> Self {
        self.shared_dictionary = enable;
        self
    }

    /// Request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Isolation key of the request.
    pub fn isolation_key(&self) -> &IsolationKey {
        &self.isolation_key
    }

    /// Request destination.
    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Whether the request opted in to shared dictionaries.
    pub fn shared_dictionary(&self) -> bool {
        self.shared_dictionary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_names() {
        for dest in [Destination::Empty, Destination::Script, Destination::IFrame, Destination::Xslt] {
            assert_eq!(dest.as_str().parse::<Destination>(), Ok(dest));
        }
        assert!("Script".parse::<Destination>().is_err());
        assert!("unknown".parse::<Destination>().is_err());
    }
}
