//! Visibility lattice and per-element neighbor counters

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Visibility tier of a graph element
///
/// Totally ordered: `Private < Friends < Public`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareLevel {
    #[default]
    Private,
    Friends,
    Public,
}

impl ShareLevel {
    /// Every level, lowest first
    pub const ALL: [ShareLevel; 3] = [ShareLevel::Private, ShareLevel::Friends, ShareLevel::Public];

    /// Highest level a relation may have between endpoints at `a` and `b`
    pub fn relation_cap(a: ShareLevel, b: ShareLevel) -> ShareLevel {
        a.min(b)
    }

    pub fn is_public(self) -> bool {
        self == ShareLevel::Public
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Friends => "friends",
            Self::Public => "public",
        }
    }
}

impl std::fmt::Display for ShareLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown share level: {0}")]
pub struct ParseShareLevelError(String);

impl std::str::FromStr for ShareLevel {
    type Err = ParseShareLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "friends" | "friend" => Ok(Self::Friends),
            "public" => Ok(Self::Public),
            _ => Err(ParseShareLevelError(s.to_string())),
        }
    }
}

/// Neighbor counts partitioned by the neighbor's share level
///
/// On a vertex this counts distinct adjacent vertices; on a tag it counts
/// the elements referencing the tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NbNeighbors {
    pub private: u32,
    pub friend: u32,
    pub public: u32,
}

impl NbNeighbors {
    /// Counters built from one level per neighbor
    pub fn from_levels(levels: impl IntoIterator<Item = ShareLevel>) -> Self {
        let mut counts = Self::default();
        for level in levels {
            counts.increment(level);
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.private + self.friend + self.public
    }

    pub fn count(&self, level: ShareLevel) -> u32 {
        match level {
            ShareLevel::Private => self.private,
            ShareLevel::Friends => self.friend,
            ShareLevel::Public => self.public,
        }
    }

    pub fn increment(&mut self, level: ShareLevel) {
        *self.bucket(level) += 1;
    }

    pub fn decrement(&mut self, level: ShareLevel) {
        let bucket = self.bucket(level);
        *bucket = bucket.saturating_sub(1);
    }

    /// Move one neighbor from `from` to `to`; no-op when equal
    pub fn shift(&mut self, from: ShareLevel, to: ShareLevel) {
        if from != to {
            self.decrement(from);
            self.increment(to);
        }
    }

    fn bucket(&mut self, level: ShareLevel) -> &mut u32 {
        match level {
            ShareLevel::Private => &mut self.private,
            ShareLevel::Friends => &mut self.friend,
            ShareLevel::Public => &mut self.public,
        }
    }
}
