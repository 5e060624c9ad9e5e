//! GraphEngine: the consistency engine over a graph store
//!
//! Every public operation runs inside one store transaction. On success the
//! transaction commits and the queued index events are sent to the search
//! index sink; on any error it rolls back and nothing is published.

mod error;
mod fork;
mod merge;
mod pattern;
mod remove;
mod session;
mod tags;
mod visibility;

pub use error::{GraphError, GraphResult};
pub use fork::ForkCache;
pub(crate) use session::Session;
pub use tags::TagSpec;

use crate::center::{CenterQuery, FriendOracle};
use crate::config::EngineConfig;
use crate::graph::{
    ElementId, ElementKind, GraphElement, GroupRelation, Relation, ShareLevel, Tag, Vertex,
};
use crate::index::{IndexEvent, NoopIndexSink, SearchIndexSink};
use crate::query::{Subgraph, SubgraphQuery};
use crate::storage::{GraphStore, MemoryStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// The graph consistency engine
///
/// Cheap to share behind an `Arc`; all state lives in the store.
pub struct GraphEngine {
    store: Arc<dyn GraphStore>,
    index: Arc<dyn SearchIndexSink>,
    friends: Option<Arc<dyn FriendOracle>>,
    config: EngineConfig,
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEngine")
            .field("config", &self.config)
            .field("has_friend_oracle", &self.friends.is_some())
            .finish_non_exhaustive()
    }
}

impl GraphEngine {
    /// Create an engine over `store`
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            index: Arc::new(NoopIndexSink),
            friends: None,
            config: EngineConfig::default(),
        }
    }

    /// Create an engine over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Send committed changes to `sink`
    pub fn with_index_sink(mut self, sink: Arc<dyn SearchIndexSink>) -> Self {
        self.index = sink;
        self
    }

    /// Use `oracle` for friend-scoped listings and non-owner forks
    pub fn with_friend_oracle(mut self, oracle: Arc<dyn FriendOracle>) -> Self {
        self.friends = Some(oracle);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn friend_oracle(&self) -> Option<&dyn FriendOracle> {
        self.friends.as_deref()
    }

    /// Run `f` in a transaction, committing on success
    fn write<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Session<'_>) -> GraphResult<T>,
    ) -> GraphResult<T> {
        let mut session = Session::new(self.store.begin()?);
        match f(&mut session) {
            Ok(value) => {
                let events = session.commit()?;
                debug!(operation, events = events.len(), "committed");
                for event in &events {
                    self.index.notify(event);
                }
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "rolling back");
                if let Err(rollback) = session.rollback() {
                    warn!(operation, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Run `f` against a consistent snapshot; nothing is written
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Session<'_>) -> GraphResult<T>) -> GraphResult<T> {
        let session = Session::new(self.store.begin()?);
        let result = f(&session);
        session.rollback()?;
        result
    }

    // === Elements ===

    /// Load any element
    pub fn get(&self, id: &ElementId) -> GraphResult<GraphElement> {
        self.read(|s| s.element(id))
    }

    pub fn vertex(&self, id: &ElementId) -> GraphResult<Vertex> {
        self.read(|s| s.vertex(id))
    }

    pub fn relation(&self, id: &ElementId) -> GraphResult<Relation> {
        self.read(|s| s.relation(id))
    }

    pub fn tag(&self, id: &ElementId) -> GraphResult<Tag> {
        self.read(|s| s.tag(id))
    }

    pub fn group_relation(&self, id: &ElementId) -> GraphResult<GroupRelation> {
        self.read(|s| s.group(id))
    }

    /// Whether an element with this id exists
    pub fn exists(&self, id: &ElementId) -> GraphResult<bool> {
        self.read(|s| s.contains(id))
    }

    /// Total number of stored elements
    pub fn element_count(&self) -> GraphResult<usize> {
        self.read(|s| s.count())
    }

    /// Every element owned by `owner`
    pub fn elements_of_owner(&self, owner: &str) -> GraphResult<Vec<GraphElement>> {
        self.read(|s| s.elements_of_owner(owner))
    }

    /// Create a private, unconnected vertex
    pub fn create_vertex(&self, owner: &str) -> GraphResult<Vertex> {
        self.write("create_vertex", |s| {
            let vertex = Vertex::new(ElementId::new(owner, ElementKind::Vertex));
            s.put(vertex.clone())?;
            s.emit(IndexEvent::Upserted {
                id: vertex.id().clone(),
            });
            Ok(vertex)
        })
    }

    /// Create a new vertex linked from `source`; returns the new relation
    ///
    /// A child of a pattern (or of a vertex under one) joins the pattern and
    /// is public.
    pub fn add_vertex_and_relation(&self, source: &ElementId) -> GraphResult<Relation> {
        self.write("add_vertex_and_relation", |s| {
            let owner = source.owner();
            let vertex_id = ElementId::new(owner, ElementKind::Vertex);
            let relation_id = ElementId::new(owner, ElementKind::Relation);
            add_child(s, source, vertex_id, relation_id)
        })
    }

    /// Like [`add_vertex_and_relation`](Self::add_vertex_and_relation) with
    /// caller-chosen short ids; fresh ids are used if either is taken
    pub fn add_vertex_and_relation_with_ids(
        &self,
        source: &ElementId,
        vertex_short_id: &str,
        relation_short_id: &str,
    ) -> GraphResult<Relation> {
        self.write("add_vertex_and_relation_with_ids", |s| {
            let owner = source.owner();
            let mut vertex_id = ElementId::with_short_id(owner, ElementKind::Vertex, vertex_short_id);
            let mut relation_id =
                ElementId::with_short_id(owner, ElementKind::Relation, relation_short_id);
            if s.contains(&vertex_id)? || s.contains(&relation_id)? {
                debug!(%vertex_id, %relation_id, "requested ids taken, generating fresh ones");
                vertex_id = ElementId::new(owner, ElementKind::Vertex);
                relation_id = ElementId::new(owner, ElementKind::Relation);
            }
            add_child(s, source, vertex_id, relation_id)
        })
    }

    /// Relate two existing vertices of one owner
    ///
    /// Returns `None` when either endpoint is a pattern or under one, or when
    /// the vertices belong to different owners.
    pub fn add_relation(
        &self,
        source: &ElementId,
        destination: &ElementId,
    ) -> GraphResult<Option<Relation>> {
        self.write("add_relation", |s| {
            let mut from = s.vertex(source)?;
            let mut relation = Relation::new(
                ElementId::new(source.owner(), ElementKind::Relation),
                source.clone(),
                destination.clone(),
            );

            if source == destination {
                if from.data.in_pattern() {
                    return Ok(None);
                }
                relation.data.share_level = from.data.share_level;
                from.attach_relation(relation.id().clone());
                s.put(from)?;
            } else {
                let mut to = s.vertex(destination)?;
                if from.data.in_pattern()
                    || to.data.in_pattern()
                    || from.data.owner() != to.data.owner()
                {
                    debug!(%source, %destination, "relation refused");
                    return Ok(None);
                }
                let already_neighbors =
                    visibility::neighbor_levels(s, &from)?.contains_key(destination);
                if !already_neighbors {
                    from.nb_neighbors.increment(to.data.share_level);
                    to.nb_neighbors.increment(from.data.share_level);
                }
                relation.data.share_level =
                    ShareLevel::relation_cap(from.data.share_level, to.data.share_level);
                from.attach_relation(relation.id().clone());
                to.attach_relation(relation.id().clone());
                s.put(from)?;
                s.put(to)?;
            }

            s.put(relation.clone())?;
            s.emit(IndexEvent::Upserted {
                id: relation.id().clone(),
            });
            Ok(Some(relation))
        })
    }

    pub fn set_label(&self, id: &ElementId, label: &str) -> GraphResult<()> {
        self.write("set_label", |s| {
            let mut element = s.element(id)?;
            let data = element.data_mut();
            data.label = label.to_string();
            data.touch();
            s.put(element)?;
            s.emit(IndexEvent::LabelChanged { id: id.clone() });
            Ok(())
        })
    }

    pub fn set_comment(&self, id: &ElementId, comment: &str) -> GraphResult<()> {
        self.write("set_comment", |s| {
            let mut element = s.element(id)?;
            let data = element.data_mut();
            data.comment = comment.to_string();
            data.touch();
            s.put(element)?;
            s.emit(IndexEvent::LabelChanged { id: id.clone() });
            Ok(())
        })
    }

    /// Swap a relation's source and destination
    pub fn reverse_relation(&self, id: &ElementId) -> GraphResult<Relation> {
        self.write("reverse_relation", |s| {
            let mut relation = s.relation(id)?;
            relation.reverse();
            s.put(relation.clone())?;
            s.emit(IndexEvent::Upserted { id: id.clone() });
            Ok(relation)
        })
    }

    // === Visibility ===

    /// Change an element's share level and propagate the consequences
    pub fn set_share_level(&self, id: &ElementId, level: ShareLevel) -> GraphResult<()> {
        self.write("set_share_level", |s| visibility::set_share_level(s, id, level))
    }

    pub fn make_public(&self, id: &ElementId) -> GraphResult<()> {
        self.set_share_level(id, ShareLevel::Public)
    }

    pub fn make_private(&self, id: &ElementId) -> GraphResult<()> {
        self.set_share_level(id, ShareLevel::Private)
    }

    // === Tags ===

    /// Attach the owner's tag for `spec.external_uri` to an element
    pub fn add_tag(&self, element: &ElementId, spec: &TagSpec) -> GraphResult<Tag> {
        self.write("add_tag", |s| {
            let mut target = s.element(element)?;
            if target.kind() == ElementKind::Tag {
                return Err(GraphError::WrongKind {
                    id: element.clone(),
                    expected: ElementKind::Vertex,
                });
            }
            let tag = tags::attach_tag(s, target.data_mut(), spec)?;
            s.put(target)?;
            s.emit(IndexEvent::TagsChanged { id: element.clone() });
            s.emit(IndexEvent::Upserted {
                id: tag.id().clone(),
            });
            Ok(tag)
        })
    }

    /// Detach a tag; false when it was not attached
    pub fn remove_tag(&self, element: &ElementId, external_uri: &str) -> GraphResult<bool> {
        self.write("remove_tag", |s| {
            let mut target = s.element(element)?;
            if !tags::detach_tag(s, target.data_mut(), external_uri)? {
                return Ok(false);
            }
            s.put(target)?;
            s.emit(IndexEvent::TagsChanged { id: element.clone() });
            Ok(true)
        })
    }

    // === Structure ===

    /// Remove an element and everything that depends on it
    pub fn remove(&self, id: &ElementId) -> GraphResult<()> {
        self.write("remove", |s| remove::remove(s, id))
    }

    /// Group relations of one owner under a new group relation
    ///
    /// Returns `None` when a member is missing, not a relation, owned by
    /// someone else, already grouped, or part of a pattern.
    pub fn create_group_relation(
        &self,
        members: &[ElementId],
        label: &str,
    ) -> GraphResult<Option<GroupRelation>> {
        self.write("create_group_relation", |s| {
            let Some(first) = members.first() else {
                return Ok(None);
            };
            let owner = first.owner();
            let mut relations = Vec::with_capacity(members.len());
            for member in members {
                let Some(GraphElement::Relation(relation)) = s.find(member)? else {
                    return Ok(None);
                };
                if relation.data.owner() != owner
                    || relation.group.is_some()
                    || relation.data.in_pattern()
                {
                    return Ok(None);
                }
                if !relations.iter().any(|r: &Relation| r.id() == relation.id()) {
                    relations.push(relation);
                }
            }

            let mut group = GroupRelation::new(
                ElementId::new(owner, ElementKind::GroupRelation),
                relations.iter().map(|r| r.id().clone()).collect(),
            );
            group.data.label = label.to_string();
            for mut relation in relations {
                relation.group = Some(group.id().clone());
                s.put(relation)?;
            }
            s.put(group.clone())?;
            s.emit(IndexEvent::Upserted {
                id: group.id().clone(),
            });
            Ok(Some(group))
        })
    }

    /// Fold `source` into `target`; false when either is in a pattern
    pub fn merge_to(&self, source: &ElementId, target: &ElementId) -> GraphResult<bool> {
        self.write("merge_to", |s| merge::merge_to(s, source, target))
    }

    // === Patterns ===

    pub fn make_pattern(&self, id: &ElementId) -> GraphResult<bool> {
        self.write("make_pattern", |s| pattern::make_pattern(s, id))
    }

    pub fn undo_pattern(&self, id: &ElementId) -> GraphResult<bool> {
        self.write("undo_pattern", |s| pattern::undo_pattern(s, id))
    }

    // === Forks ===

    /// Copy the subgraph reachable from `root` into `requester`'s graph
    pub fn fork(&self, root: &ElementId, requester: &str) -> GraphResult<ElementId> {
        self.fork_with_cache(root, requester, &mut ForkCache::new())
    }

    /// Fork reusing clones recorded in `cache`
    ///
    /// The cache only learns the new clones if the fork commits.
    pub fn fork_with_cache(
        &self,
        root: &ElementId,
        requester: &str,
        cache: &mut ForkCache,
    ) -> GraphResult<ElementId> {
        let oracle = self.friend_oracle();
        let (clone, updated) = self.write("fork", |s| {
            let mut working = cache.clone();
            let clone = fork::fork(s, root, requester, &mut working, oracle)?;
            Ok((clone, working))
        })?;
        *cache = updated;
        Ok(clone)
    }

    // === Queries ===

    /// Neighborhood of `center` up to `depth` hops through elements at `levels`
    pub fn extract_subgraph(
        &self,
        center: &ElementId,
        depth: i32,
        levels: &[ShareLevel],
    ) -> GraphResult<Subgraph> {
        let query = SubgraphQuery::from(center.clone())
            .depth(depth)
            .levels(levels.iter().copied());
        self.subgraph(&query)
    }

    pub fn subgraph(&self, query: &SubgraphQuery) -> GraphResult<Subgraph> {
        self.read(|s| query.execute(s))
    }

    // === Centers ===

    /// Record that the owner focused on `id` now; not an edit
    pub fn update_last_center_date(&self, id: &ElementId) -> GraphResult<()> {
        self.write("update_last_center_date", |s| {
            let mut element = s.element(id)?;
            element.data_mut().last_center_date = Some(Utc::now());
            s.put(element)
        })
    }

    /// Count one more visit of `id`; returns the new count
    pub fn increment_number_of_visits(&self, id: &ElementId) -> GraphResult<u32> {
        self.write("increment_number_of_visits", |s| {
            let mut element = s.element(id)?;
            let data = element.data_mut();
            data.nb_visits += 1;
            let visits = data.nb_visits;
            s.put(element)?;
            Ok(visits)
        })
    }

    /// Start a paged center listing
    pub fn centers(&self) -> CenterQuery<'_> {
        CenterQuery::new(self)
    }
}

/// Create `vertex_id` under `source`, linked by `relation_id`
fn add_child(
    session: &mut Session<'_>,
    source: &ElementId,
    vertex_id: ElementId,
    relation_id: ElementId,
) -> GraphResult<Relation> {
    let mut parent = session.vertex(source)?;
    let mut child = Vertex::new(vertex_id);
    let in_pattern = parent.data.in_pattern();
    if in_pattern {
        child.data.share_level = ShareLevel::Public;
        child.data.is_under_pattern = true;
    }

    let mut relation = Relation::new(relation_id, source.clone(), child.id().clone());
    relation.data.share_level =
        ShareLevel::relation_cap(parent.data.share_level, child.data.share_level);
    relation.data.is_under_pattern = in_pattern;

    child.nb_neighbors.increment(parent.data.share_level);
    parent.nb_neighbors.increment(child.data.share_level);
    child.attach_relation(relation.id().clone());
    parent.attach_relation(relation.id().clone());

    session.emit(IndexEvent::Upserted {
        id: child.id().clone(),
    });
    session.emit(IndexEvent::Upserted {
        id: relation.id().clone(),
    });
    session.put(parent)?;
    session.put(child)?;
    session.put(relation.clone())?;
    Ok(relation)
}
