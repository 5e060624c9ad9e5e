//! Graph element variants: vertices, relations, tags and group relations

use super::id::{ElementId, ElementKind};
use super::share_level::{NbNeighbors, ShareLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data shared by every element variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementData {
    pub id: ElementId,
    pub label: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub share_level: ShareLevel,
    pub is_pattern: bool,
    pub is_under_pattern: bool,
    /// Attached tags, keyed by the tag's external resource URI
    pub tags: BTreeMap<String, ElementId>,
    /// Set when the owner last focused on this element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_center_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub nb_visits: u32,
}

impl ElementData {
    pub fn new(id: ElementId) -> Self {
        let now = Utc::now();
        Self {
            id,
            label: String::new(),
            comment: String::new(),
            created_at: now,
            modified_at: now,
            share_level: ShareLevel::Private,
            is_pattern: false,
            is_under_pattern: false,
            tags: BTreeMap::new(),
            last_center_date: None,
            nb_visits: 0,
        }
    }

    pub fn owner(&self) -> &str {
        self.id.owner()
    }

    /// True when the element is a pattern or belongs to one
    pub fn in_pattern(&self) -> bool {
        self.is_pattern || self.is_under_pattern
    }

    /// Whether a tag with this external URI is attached
    pub fn has_tag(&self, external_uri: &str) -> bool {
        self.tags.contains_key(external_uri)
    }

    /// Update the last modification timestamp
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

/// A node of the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(flatten)]
    pub data: ElementData,
    /// Incident relations in both directions, in insertion order
    pub relations: Vec<ElementId>,
    pub nb_neighbors: NbNeighbors,
    /// Forks made from this vertex while it is a pattern
    pub nb_pattern_usage: u32,
}

impl Vertex {
    pub fn new(id: ElementId) -> Self {
        Self {
            data: ElementData::new(id),
            relations: Vec::new(),
            nb_neighbors: NbNeighbors::default(),
            nb_pattern_usage: 0,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.data.id
    }

    pub fn has_relation(&self, relation: &ElementId) -> bool {
        self.relations.contains(relation)
    }

    /// Record an incident relation; duplicates are ignored
    pub fn attach_relation(&mut self, relation: ElementId) {
        if !self.relations.contains(&relation) {
            self.relations.push(relation);
        }
    }

    pub fn detach_relation(&mut self, relation: &ElementId) {
        self.relations.retain(|r| r != relation);
    }
}

/// A directed relation between two vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(flatten)]
    pub data: ElementData,
    pub source: ElementId,
    pub destination: ElementId,
    /// Group relation this relation belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ElementId>,
}

impl Relation {
    pub fn new(id: ElementId, source: ElementId, destination: ElementId) -> Self {
        Self {
            data: ElementData::new(id),
            source,
            destination,
            group: None,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.data.id
    }

    /// The endpoint opposite to `vertex` (itself for a self-loop)
    pub fn other_end(&self, vertex: &ElementId) -> &ElementId {
        if &self.source == vertex {
            &self.destination
        } else {
            &self.source
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.destination
    }

    /// Swap source and destination, keeping id and tags
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.source, &mut self.destination);
        self.data.touch();
    }

    /// Replace every occurrence of `from` among the endpoints with `to`
    pub fn relink(&mut self, from: &ElementId, to: &ElementId) {
        if &self.source == from {
            self.source = to.clone();
        }
        if &self.destination == from {
            self.destination = to.clone();
        }
    }
}

/// A reusable identification, optionally bound to an external resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(flatten)]
    pub data: ElementData,
    pub external_uri: String,
    /// Referencing elements, partitioned by their share level
    pub nb_neighbors: NbNeighbors,
}

impl Tag {
    pub fn new(owner: &str, external_uri: impl Into<String>) -> Self {
        let external_uri = external_uri.into();
        Self {
            data: ElementData::new(ElementId::for_tag(owner, &external_uri)),
            external_uri,
            nb_neighbors: NbNeighbors::default(),
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.data.id
    }

    /// Number of elements referencing this tag
    pub fn nb_references(&self) -> u32 {
        self.nb_neighbors.total()
    }
}

/// Composite element aggregating member relations under one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRelation {
    #[serde(flatten)]
    pub data: ElementData,
    pub members: Vec<ElementId>,
}

impl GroupRelation {
    pub fn new(id: ElementId, members: Vec<ElementId>) -> Self {
        Self {
            data: ElementData::new(id),
            members,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.data.id
    }
}

/// Any element stored in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphElement {
    Vertex(Vertex),
    Relation(Relation),
    Tag(Tag),
    GroupRelation(GroupRelation),
}

impl GraphElement {
    pub fn data(&self) -> &ElementData {
        match self {
            Self::Vertex(v) => &v.data,
            Self::Relation(r) => &r.data,
            Self::Tag(t) => &t.data,
            Self::GroupRelation(g) => &g.data,
        }
    }

    pub fn data_mut(&mut self) -> &mut ElementData {
        match self {
            Self::Vertex(v) => &mut v.data,
            Self::Relation(r) => &mut r.data,
            Self::Tag(t) => &mut t.data,
            Self::GroupRelation(g) => &mut g.data,
        }
    }

    pub fn id(&self) -> &ElementId {
        &self.data().id
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Vertex(_) => ElementKind::Vertex,
            Self::Relation(_) => ElementKind::Relation,
            Self::Tag(_) => ElementKind::Tag,
            Self::GroupRelation(_) => ElementKind::GroupRelation,
        }
    }

    pub fn share_level(&self) -> ShareLevel {
        self.data().share_level
    }

    pub fn label(&self) -> &str {
        &self.data().label
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Self::Vertex(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Self::Relation(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Self::Tag(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_group_relation(&self) -> Option<&GroupRelation> {
        match self {
            Self::GroupRelation(g) => Some(g),
            _ => None,
        }
    }
}

impl From<Vertex> for GraphElement {
    fn from(v: Vertex) -> Self {
        Self::Vertex(v)
    }
}

impl From<Relation> for GraphElement {
    fn from(r: Relation) -> Self {
        Self::Relation(r)
    }
}

impl From<Tag> for GraphElement {
    fn from(t: Tag) -> Self {
        Self::Tag(t)
    }
}

impl From<GroupRelation> for GraphElement {
    fn from(g: GroupRelation) -> Self {
        Self::GroupRelation(g)
    }
}
