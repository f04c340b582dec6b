//! Registry configuration
//!
//! A configuration file looks like:
//!
//! ```toml
//! enabled = true
//! discovery_queries = ["tag|mirror:Mirror", "type|mirror/page"]
//! rescan_on_move = true
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;
use crate::schema::MIRROR_MARKER;

/// A store query in `language|query` form.
///
/// Discovery hands the two halves to
/// [`ResourceStore::find_resources`](mirror_store::ResourceStore::find_resources).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveryQuery {
    language: String,
    query: String,
}

impl DiscoveryQuery {
    pub fn new(language: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            query: query.into(),
        }
    }

    /// Query selecting every node carrying the mirror marker tag.
    pub fn marker() -> Self {
        Self::new(mirror_store::QUERY_LANGUAGE_TAG, MIRROR_MARKER)
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl FromStr for DiscoveryQuery {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::InvalidQuery {
            query: s.to_string(),
            reason: reason.to_string(),
        };

        let (language, query) = s
            .split_once('|')
            .ok_or_else(|| invalid("expected 'language|query'"))?;
        let language = language.trim();
        let query = query.trim();
        if language.is_empty() {
            return Err(invalid("query language is empty"));
        }
        if query.is_empty() {
            return Err(invalid("query statement is empty"));
        }
        Ok(Self::new(language, query))
    }
}

impl fmt::Display for DiscoveryQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.language, self.query)
    }
}

impl Serialize for DiscoveryQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DiscoveryQuery {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Mirror registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Whether the registry discovers and serves mirrors at all
    pub enabled: bool,
    /// Queries run during discovery, in order
    pub discovery_queries: Vec<DiscoveryQuery>,
    /// Whether a batch that both adds nodes and removes a mirror root
    /// triggers a full rediscovery
    pub rescan_on_move: bool,
}

impl MirrorConfig {
    /// Enabled configuration with the default queries.
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            discovery_queries: vec![DiscoveryQuery::marker()],
            rescan_on_move: true,
        }
    }
}
