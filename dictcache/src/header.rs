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

//! Parsed structured field values (RFC 8941).
//!
//! dictcache does not parse the structured field grammar itself. The embedder provides a
//! [`StructuredFieldParser`] that turns a raw header value into a [`Dictionary`].

/// A bare item of a structured field.
#[derive(Debug, Clone, PartialEq)]
#[expect(missing_docs)]
pub enum BareItem {
    Integer(i64),
    Decimal(f64),
    String(String),
    Token(String),
    ByteSequence(Vec<u8>),
    Boolean(bool),
}

impl BareItem {
    /// The string value, if the item is a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            BareItem::String(s) => Some(s),
            _ => None,
        }
    }

    /// The token value, if the item is a token.
    pub fn as_token(&self) -> Option<&str> {
        match self {
            BareItem::Token(t) => Some(t),
            _ => None,
        }
    }
}

/// A bare item with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Value of the item.
    pub bare: BareItem,
    /// Parameters of the item, in order.
    pub params: Vec<(String, BareItem)>,
}

impl Item {
    /// Create an item without parameters.
    pub fn new(bare: BareItem) -> Self {
        Self { bare, params: vec![] }
    }

    /// Create a string item without parameters.
    pub fn string(s: impl Into<String>) -> Self {
        Self::new(BareItem::String(s.into()))
    }

    /// Create a token item without parameters.
    pub fn token(t: impl Into<String>) -> Self {
        Self::new(BareItem::Token(t.into()))
    }
}

/// A member of a structured dictionary: an item or an inner list.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// A single item.
    Item(Item),
    /// An inner list of items with the parameters of the list.
    InnerList(Vec<Item>, Vec<(String, BareItem)>),
}

impl Member {
    /// Create an inner list member without parameters.
    pub fn inner_list(items: impl IntoIterator<Item = Item>) -> Self {
        Self::InnerList(items.into_iter().collect(), vec![])
    }
}

impl From<Item> for Member {
    fn from(item: Item) -> Self {
        Self::Item(item)
    }
}

/// An ordered structured dictionary.
///
/// Inserting a key that already exists overwrites its value in place, as duplicate keys do when parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    members: Vec<(String, Member)>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member.
    pub fn insert(&mut self, key: impl Into<String>, member: impl Into<Member>) {
        let key = key.into();
        let member = member.into();
        match self.members.iter_mut().find(|(k, _)| *k == key) {
            Some((_, m)) => *m = member,
            None => self.members.push((key, member)),
        }
    }

    /// Insert a member and return the dictionary.
    pub fn with(mut self, key: impl Into<String>, member: impl Into<Member>) -> Self {
        self.insert(key, member);
        self
    }

    /// Get a member by key.
    pub fn get(&self, key: &str) -> Option<&Member> {
        self.members.iter().find(|(k, _)| k == key).map(|(_, m)| m)
    }

    /// Iterate members in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(k, m)| (k.as_str(), m))
    }

    /// Count of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the dictionary has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Parser of structured field dictionaries.
///
/// Returns `None` if the value is not a well-formed structured dictionary.
pub trait StructuredFieldParser: Send + Sync + 'static {
    /// Parse a header value as a structured dictionary.
    fn parse_dictionary(&self, value: &str) -> Option<Dictionary>;
}

impl std::fmt::Debug for dyn StructuredFieldParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StructuredFieldParser")
    }
}

impl<F> StructuredFieldParser for F
where
    F: Fn(&str) -> Option<Dictionary> + Send + Sync + 'static,
{
    fn parse_dictionary(&self, value: &str) -> Option<Dictionary> {
        self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_overwrite_keeps_order() {
        let dict = Dictionary::new()
            .with("match", Item::string("/a*"))
            .with("type", Item::token("raw"))
            .with("match", Item::string("/b*"));

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("match"), Some(&Member::Item(Item::string("/b*"))));
        let keys: Vec<_> = dict.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["match", "type"]);
    }

    #[test]
    fn test_closure_parser() {
        let parser = |v: &str| (v == "ok").then(|| Dictionary::new().with("id", Item::string("x")));
        assert!(parser.parse_dictionary("ok").is_some());
        assert!(parser.parse_dictionary("bad").is_none());
    }
}
