//! Copying a reachable subgraph into another user's namespace

use super::error::{GraphError, GraphResult};
use super::session::Session;
use super::tags::{attach_tag, TagSpec};
use super::visibility::recount_vertex;
use crate::center::FriendOracle;
use crate::graph::{
    ElementData, ElementId, ElementKind, GroupRelation, Relation, ShareLevel, Vertex,
};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::info;

/// Source element id to clone id, shared across fork calls
///
/// Holding on to a cache between forks makes each source element cloned at
/// most once, so forks of overlapping subgraphs reconnect to the same clones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForkCache {
    clones: HashMap<ElementId, ElementId>,
}

impl ForkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone made for `source`, if any
    pub fn clone_of(&self, source: &ElementId) -> Option<&ElementId> {
        self.clones.get(source)
    }

    pub fn len(&self) -> usize {
        self.clones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clones.is_empty()
    }
}

/// Which levels of the root owner's elements `requester` may copy
fn visible_levels(root_owner: &str, requester: &str, oracle: Option<&dyn FriendOracle>) -> Vec<ShareLevel> {
    if root_owner == requester {
        return ShareLevel::ALL.to_vec();
    }
    let friends = oracle.is_some_and(|o| o.is_confirmed_friend(root_owner, requester));
    if friends {
        vec![ShareLevel::Friends, ShareLevel::Public]
    } else {
        vec![ShareLevel::Public]
    }
}

fn copy_content(from: &ElementData, to: &mut ElementData) {
    to.label = from.label.clone();
    to.comment = from.comment.clone();
}

/// Re-create `source`'s tags as `target`'s owner's tags
fn copy_tags(session: &mut Session<'_>, source: &ElementData, target: &mut ElementData) -> GraphResult<()> {
    for (uri, tag_id) in &source.tags {
        let original = session.tag(tag_id)?;
        let spec = TagSpec::new(uri.clone())
            .with_label(original.data.label)
            .with_comment(original.data.comment);
        attach_tag(session, target, &spec)?;
    }
    Ok(())
}

/// Clone of `source` in the cache that still exists and is free to link to
///
/// A clone that has since joined a pattern is frozen, so it gets replaced.
fn cached_clone(session: &Session<'_>, cache: &ForkCache, source: &ElementId) -> GraphResult<Option<ElementId>> {
    let Some(clone) = cache.clone_of(source) else {
        return Ok(None);
    };
    match session.find(clone)? {
        Some(element) if !element.data().in_pattern() => Ok(Some(clone.clone())),
        _ => Ok(None),
    }
}

pub(crate) fn fork(
    session: &mut Session<'_>,
    root: &ElementId,
    requester: &str,
    cache: &mut ForkCache,
    oracle: Option<&dyn FriendOracle>,
) -> GraphResult<ElementId> {
    let root_vertex = session.vertex(root)?;
    let levels = visible_levels(root.owner(), requester, oracle);
    if !levels.contains(&root_vertex.data.share_level) {
        return Err(GraphError::NotFound(root.clone()));
    }

    // Visible component of the root, breadth first
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut relations: Vec<Relation> = Vec::new();
    let mut seen: HashSet<ElementId> = HashSet::from([root.clone()]);
    let mut queue = VecDeque::from([root_vertex.clone()]);
    while let Some(vertex) = queue.pop_front() {
        for relation_id in &vertex.relations {
            if seen.contains(relation_id) {
                continue;
            }
            let relation = session.relation(relation_id)?;
            if !levels.contains(&relation.data.share_level) {
                continue;
            }
            seen.insert(relation_id.clone());
            let other = relation.other_end(vertex.id()).clone();
            if !seen.contains(&other) {
                let neighbor = session.vertex(&other)?;
                if !levels.contains(&neighbor.data.share_level) {
                    continue;
                }
                seen.insert(other);
                queue.push_back(neighbor);
            }
            relations.push(relation);
        }
        vertices.push(vertex);
    }

    let mut touched: Vec<ElementId> = Vec::new();
    for vertex in &vertices {
        if let Some(clone) = cached_clone(session, cache, vertex.id())? {
            touched.push(clone);
            continue;
        }
        let mut clone = Vertex::new(ElementId::new(requester, ElementKind::Vertex));
        copy_content(&vertex.data, &mut clone.data);
        copy_tags(session, &vertex.data, &mut clone.data)?;
        cache.clones.insert(vertex.id().clone(), clone.id().clone());
        touched.push(clone.id().clone());
        session.put(clone)?;
    }

    let mut groups: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
    for relation in &relations {
        if let Some(clone_id) = cached_clone(session, cache, relation.id())? {
            if let Some(group) = &relation.group {
                groups.entry(group.clone()).or_default().push(clone_id);
            }
            continue;
        }
        let (Some(source), Some(destination)) = (
            cache.clone_of(&relation.source).cloned(),
            cache.clone_of(&relation.destination).cloned(),
        ) else {
            continue;
        };
        let mut clone = Relation::new(
            ElementId::new(requester, ElementKind::Relation),
            source.clone(),
            destination.clone(),
        );
        copy_content(&relation.data, &mut clone.data);
        copy_tags(session, &relation.data, &mut clone.data)?;

        for endpoint in [&source, &destination] {
            let mut vertex = session.vertex(endpoint)?;
            vertex.attach_relation(clone.id().clone());
            session.put(vertex)?;
        }
        if let Some(group) = &relation.group {
            groups
                .entry(group.clone())
                .or_default()
                .push(clone.id().clone());
        }
        cache
            .clones
            .insert(relation.id().clone(), clone.id().clone());
        session.put(clone)?;
    }

    for (group_id, members) in groups {
        let group = session.group(&group_id)?;
        if !levels.contains(&group.data.share_level) {
            continue;
        }
        let clone_id = match cached_clone(session, cache, &group_id)? {
            Some(existing) => existing,
            None => {
                let mut clone = GroupRelation::new(
                    ElementId::new(requester, ElementKind::GroupRelation),
                    Vec::new(),
                );
                copy_content(&group.data, &mut clone.data);
                copy_tags(session, &group.data, &mut clone.data)?;
                cache.clones.insert(group_id.clone(), clone.id().clone());
                let id = clone.id().clone();
                session.put(clone)?;
                id
            }
        };
        let mut clone = session.group(&clone_id)?;
        for member in members {
            let mut relation = session.relation(&member)?;
            if relation.group.is_some() {
                continue;
            }
            relation.group = Some(clone_id.clone());
            session.put(relation)?;
            if !clone.members.contains(&member) {
                clone.members.push(member);
            }
        }
        session.put(clone)?;
    }

    let root_clone = cache
        .clone_of(root)
        .cloned()
        .ok_or_else(|| GraphError::NotFound(root.clone()))?;
    let mut clone = session.vertex(&root_clone)?;
    let provenance = TagSpec::new(root.as_str()).with_label(root_vertex.data.label.clone());
    attach_tag(session, &mut clone.data, &provenance)?;
    session.put(clone)?;

    for id in &touched {
        recount_vertex(session, id)?;
    }

    if root_vertex.data.is_pattern {
        let mut pattern = session.vertex(root)?;
        pattern.nb_pattern_usage += 1;
        session.put(pattern)?;
    }

    for id in &touched {
        session.emit(crate::index::IndexEvent::Upserted { id: id.clone() });
    }
    info!(
        root = %root,
        requester,
        vertices = vertices.len(),
        relations = relations.len(),
        "subgraph forked"
    );
    Ok(root_clone)
}
