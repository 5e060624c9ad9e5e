//! Owner-scoped element identifiers
//!
//! Every element id is a URI-like path that embeds its owner and kind:
//! `/service/users/{owner}/graph/{kind}/{short_id}`. The owner of an element
//! is always derived from its id, never stored separately.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const USERS_PREFIX: &str = "/service/users/";

/// Namespace for tag ids derived from an owner and an external resource URI
const TAG_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a9e_84d3_4b07_a5e2_1c9d_7b30_58e4);

/// Error returned when a string is not a well-formed element id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid element identifier: {0}")]
pub struct InvalidIdentifier(pub String);

/// The four element variants an id can point to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Vertex,
    Relation,
    Tag,
    GroupRelation,
}

impl ElementKind {
    /// Path segment used inside ids
    fn segment(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Relation => "edge",
            Self::Tag => "identification",
            Self::GroupRelation => "group_relation",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "vertex" => Some(Self::Vertex),
            "edge" => Some(Self::Relation),
            "identification" => Some(Self::Tag),
            "group_relation" => Some(Self::GroupRelation),
            _ => None,
        }
    }

    /// Stable lowercase name (used by storage columns and logs)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Relation => "relation",
            Self::Tag => "tag",
            Self::GroupRelation => "group_relation",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique, owner-scoped identifier of a graph element
///
/// Serializes as the plain id string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementId {
    raw: String,
    kind: ElementKind,
}

impl ElementId {
    /// Fresh random id for `owner`
    pub fn new(owner: &str, kind: ElementKind) -> Self {
        Self::with_short_id(owner, kind, &Uuid::new_v4().to_string())
    }

    /// Id built from a caller-chosen short id
    pub fn with_short_id(owner: &str, kind: ElementKind, short_id: &str) -> Self {
        Self {
            raw: format!("{USERS_PREFIX}{owner}/graph/{}/{short_id}", kind.segment()),
            kind,
        }
    }

    /// Deterministic tag id: one tag per (owner, external resource)
    pub fn for_tag(owner: &str, external_uri: &str) -> Self {
        let name = format!("{owner}\n{external_uri}");
        let short_id = Uuid::new_v5(&TAG_NAMESPACE, name.as_bytes());
        Self::with_short_id(owner, ElementKind::Tag, &short_id.to_string())
    }

    /// Parse and validate an id string
    pub fn parse(s: &str) -> Result<Self, InvalidIdentifier> {
        let invalid = || InvalidIdentifier(s.to_string());
        let rest = s.strip_prefix(USERS_PREFIX).ok_or_else(invalid)?;
        let mut parts = rest.split('/');
        let (Some(owner), Some("graph"), Some(segment), Some(short_id), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(invalid());
        };
        if owner.is_empty() || short_id.is_empty() {
            return Err(invalid());
        }
        let kind = ElementKind::from_segment(segment).ok_or_else(invalid)?;
        Ok(Self {
            raw: s.to_string(),
            kind,
        })
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Username of the owner, taken from the id namespace
    pub fn owner(&self) -> &str {
        self.raw[USERS_PREFIX.len()..]
            .split('/')
            .next()
            .unwrap_or_default()
    }

    /// Last path segment
    pub fn short_id(&self) -> &str {
        self.raw.rsplit('/').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for ElementId {
    type Error = InvalidIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ElementId> for String {
    fn from(id: ElementId) -> Self {
        id.raw
    }
}

impl std::str::FromStr for ElementId {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
