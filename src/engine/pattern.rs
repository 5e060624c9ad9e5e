//! Pattern creation, reversal and under-pattern flag upkeep

use super::error::GraphResult;
use super::session::Session;
use super::visibility::{relation_cap, set_vertex_level, store_relation_level};
use crate::graph::{ElementId, GroupRelation, Relation, ShareLevel, Vertex};
use crate::index::IndexEvent;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};

/// Everything connected to a root vertex, ignoring relation direction
pub(crate) struct Reach {
    /// Breadth-first order, root first
    pub vertices: Vec<Vertex>,
    pub relations: Vec<Relation>,
    pub groups: Vec<GroupRelation>,
}

impl Reach {
    fn ids(&self) -> impl Iterator<Item = &ElementId> {
        self.vertices
            .iter()
            .map(|v| v.id())
            .chain(self.relations.iter().map(|r| r.id()))
            .chain(self.groups.iter().map(|g| g.id()))
    }
}

/// Collect the connected component of `root` with an explicit worklist
pub(crate) fn reachable(session: &Session<'_>, root: &ElementId) -> GraphResult<Reach> {
    let mut reach = Reach {
        vertices: Vec::new(),
        relations: Vec::new(),
        groups: Vec::new(),
    };
    let mut seen: HashSet<ElementId> = HashSet::new();
    let mut queue = VecDeque::from([root.clone()]);
    seen.insert(root.clone());

    while let Some(id) = queue.pop_front() {
        let vertex = session.vertex(&id)?;
        for relation_id in &vertex.relations {
            if !seen.insert(relation_id.clone()) {
                continue;
            }
            let relation = session.relation(relation_id)?;
            let other = relation.other_end(&id);
            if seen.insert(other.clone()) {
                queue.push_back(other.clone());
            }
            if let Some(group_id) = &relation.group {
                if seen.insert(group_id.clone()) {
                    reach.groups.push(session.group(group_id)?);
                }
            }
            reach.relations.push(relation);
        }
        reach.vertices.push(vertex);
    }
    Ok(reach)
}

/// Turn `id` into a pattern; false when it or its component is already in one
pub(crate) fn make_pattern(session: &mut Session<'_>, id: &ElementId) -> GraphResult<bool> {
    let root = session.vertex(id)?;
    if root.data.in_pattern() {
        return Ok(false);
    }
    let reach = reachable(session, id)?;
    let conflicting = reach.vertices.iter().any(|v| v.data.in_pattern())
        || reach.relations.iter().any(|r| r.data.in_pattern())
        || reach.groups.iter().any(|g| g.data.in_pattern());
    if conflicting {
        debug!(vertex = %id, "pattern refused: component already holds a pattern");
        return Ok(false);
    }

    // Vertices sharing a tag with another vertex of the component keep
    // their visibility; the root is always published
    let shared = shared_tag_uris(&reach);
    let kept_private: HashSet<ElementId> = reach
        .vertices
        .iter()
        .filter(|v| v.id() != id && v.data.tags.keys().any(|uri| shared.contains(uri.as_str())))
        .map(|v| v.id().clone())
        .collect();

    for mut vertex in reach.vertices.iter().cloned() {
        if vertex.id() == id {
            vertex.data.is_pattern = true;
            vertex.nb_pattern_usage = 0;
        } else {
            vertex.data.is_under_pattern = true;
        }
        session.put(vertex)?;
    }
    for mut relation in reach.relations.iter().cloned() {
        relation.data.is_under_pattern = true;
        session.put(relation)?;
    }
    for mut group in reach.groups.iter().cloned() {
        group.data.is_under_pattern = true;
        session.put(group)?;
    }

    for vertex in &reach.vertices {
        if !kept_private.contains(vertex.id()) {
            set_vertex_level(session, vertex.id(), ShareLevel::Public)?;
        }
    }
    for relation in &reach.relations {
        let relation = session.relation(relation.id())?;
        let cap = relation_cap(session, &relation)?;
        store_relation_level(session, relation, cap)?;
    }

    let mut published_tags: HashSet<ElementId> = HashSet::new();
    for vertex in reach.vertices.iter().filter(|v| !kept_private.contains(v.id())) {
        published_tags.extend(vertex.data.tags.values().cloned());
    }
    for relation in &reach.relations {
        published_tags.extend(relation.data.tags.values().cloned());
    }
    for tag_id in published_tags {
        let mut tag = session.tag(&tag_id)?;
        if tag.data.share_level != ShareLevel::Public {
            tag.data.share_level = ShareLevel::Public;
            tag.data.touch();
            session.emit(IndexEvent::ShareLevelChanged {
                id: tag_id.clone(),
                level: ShareLevel::Public,
            });
            session.put(tag)?;
        }
    }

    info!(
        pattern = %id,
        vertices = reach.vertices.len(),
        relations = reach.relations.len(),
        kept_private = kept_private.len(),
        "pattern created"
    );
    Ok(true)
}

/// Tag URIs carried by more than one vertex of the component
fn shared_tag_uris(reach: &Reach) -> HashSet<&str> {
    let mut carriers: HashMap<&str, usize> = HashMap::new();
    for vertex in &reach.vertices {
        for uri in vertex.data.tags.keys() {
            *carriers.entry(uri.as_str()).or_default() += 1;
        }
    }
    carriers
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(uri, _)| uri)
        .collect()
}

/// Clear pattern flags on `id`'s component; visibility is left as is
pub(crate) fn undo_pattern(session: &mut Session<'_>, id: &ElementId) -> GraphResult<bool> {
    let root = session.vertex(id)?;
    if !root.data.is_pattern {
        return Ok(false);
    }
    let reach = reachable(session, id)?;
    for mut vertex in reach.vertices.iter().cloned() {
        vertex.data.is_pattern = false;
        vertex.data.is_under_pattern = false;
        session.put(vertex)?;
    }
    for mut relation in reach.relations.iter().cloned() {
        relation.data.is_under_pattern = false;
        session.put(relation)?;
    }
    for mut group in reach.groups.iter().cloned() {
        group.data.is_under_pattern = false;
        session.put(group)?;
    }
    info!(pattern = %id, elements = reach.ids().count(), "pattern undone");
    Ok(true)
}

/// Recompute under-pattern flags on the components containing `seeds`
///
/// Used after removals, which can split a component away from its pattern.
pub(crate) fn normalize_pattern_flags(
    session: &mut Session<'_>,
    seeds: impl IntoIterator<Item = ElementId>,
) -> GraphResult<()> {
    let mut done: HashSet<ElementId> = HashSet::new();
    for seed in seeds {
        if done.contains(&seed) || !session.contains(&seed)? {
            continue;
        }
        let reach = reachable(session, &seed)?;
        let has_pattern = reach.vertices.iter().any(|v| v.data.is_pattern);

        for mut vertex in reach.vertices.iter().cloned() {
            let under = has_pattern && !vertex.data.is_pattern;
            done.insert(vertex.id().clone());
            if vertex.data.is_under_pattern != under {
                vertex.data.is_under_pattern = under;
                session.put(vertex)?;
            }
        }
        for mut relation in reach.relations.iter().cloned() {
            if relation.data.is_under_pattern != has_pattern {
                relation.data.is_under_pattern = has_pattern;
                session.put(relation)?;
            }
        }
        for mut group in reach.groups.iter().cloned() {
            if group.data.is_under_pattern != has_pattern {
                group.data.is_under_pattern = has_pattern;
                session.put(group)?;
            }
        }
    }
    Ok(())
}
