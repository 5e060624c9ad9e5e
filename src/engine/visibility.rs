//! Share-level propagation and neighbor counter maintenance
//!
//! A vertex's `nb_neighbors` counts its distinct adjacent vertices by their
//! level; a tag's counts the elements referencing it by their level. Both are
//! kept exact here, inside the transaction that changes a level.

use super::error::GraphResult;
use super::session::Session;
use crate::graph::{ElementData, ElementId, GraphElement, NbNeighbors, Relation, ShareLevel, Vertex};
use crate::index::IndexEvent;
use std::collections::BTreeMap;
use tracing::debug;

/// Distinct neighbors of `vertex` (itself excluded) with their current level
pub(crate) fn neighbor_levels(
    session: &Session<'_>,
    vertex: &Vertex,
) -> GraphResult<BTreeMap<ElementId, ShareLevel>> {
    let mut neighbors = BTreeMap::new();
    for relation_id in &vertex.relations {
        let relation = session.relation(relation_id)?;
        let other = relation.other_end(vertex.id());
        if other == vertex.id() || neighbors.contains_key(other) {
            continue;
        }
        let level = session.vertex(other)?.data.share_level;
        neighbors.insert(other.clone(), level);
    }
    Ok(neighbors)
}

/// Recompute a vertex's counters from its current adjacency
pub(crate) fn recount_vertex(session: &mut Session<'_>, id: &ElementId) -> GraphResult<()> {
    let mut vertex = session.vertex(id)?;
    let counts = NbNeighbors::from_levels(neighbor_levels(session, &vertex)?.into_values());
    if counts != vertex.nb_neighbors {
        vertex.nb_neighbors = counts;
        session.put(vertex)?;
    }
    Ok(())
}

/// Move every tag reference held by `data` from one level bucket to another
pub(crate) fn shift_tag_references(
    session: &mut Session<'_>,
    data: &ElementData,
    from: ShareLevel,
    to: ShareLevel,
) -> GraphResult<()> {
    if from == to {
        return Ok(());
    }
    for tag_id in data.tags.values() {
        let mut tag = session.tag(tag_id)?;
        tag.nb_neighbors.shift(from, to);
        session.put(tag)?;
    }
    Ok(())
}

/// Drop every tag reference held by `data`; tags themselves are kept
pub(crate) fn release_tag_references(
    session: &mut Session<'_>,
    data: &ElementData,
) -> GraphResult<()> {
    for tag_id in data.tags.values() {
        let mut tag = session.tag(tag_id)?;
        tag.nb_neighbors.decrement(data.share_level);
        session.put(tag)?;
    }
    Ok(())
}

/// Store `relation` at `level`, shifting its tag references
///
/// Callers pass an already capped level.
pub(crate) fn store_relation_level(
    session: &mut Session<'_>,
    mut relation: Relation,
    level: ShareLevel,
) -> GraphResult<()> {
    let old = relation.data.share_level;
    if old == level {
        return Ok(());
    }
    shift_tag_references(session, &relation.data, old, level)?;
    relation.data.share_level = level;
    relation.data.touch();
    session.emit(IndexEvent::ShareLevelChanged {
        id: relation.id().clone(),
        level,
    });
    session.put(relation)
}

/// Highest level `relation` may have given its endpoints' current levels
pub(crate) fn relation_cap(session: &Session<'_>, relation: &Relation) -> GraphResult<ShareLevel> {
    let source = session.vertex(&relation.source)?.data.share_level;
    if relation.is_self_loop() {
        return Ok(source);
    }
    let destination = session.vertex(&relation.destination)?.data.share_level;
    Ok(ShareLevel::relation_cap(source, destination))
}

/// Change a vertex's level and cascade to its relations, neighbors and tags
///
/// Raising a vertex sets its relations to their cap; lowering it only
/// lowers relations that now exceed the cap. Returns false when the vertex
/// already had `level`.
pub(crate) fn set_vertex_level(
    session: &mut Session<'_>,
    id: &ElementId,
    level: ShareLevel,
) -> GraphResult<bool> {
    let mut vertex = session.vertex(id)?;
    let old = vertex.data.share_level;
    if old == level {
        return Ok(false);
    }
    debug!(vertex = %id, from = %old, to = %level, "share level cascade");

    shift_tag_references(session, &vertex.data, old, level)?;
    vertex.data.share_level = level;
    vertex.data.touch();
    session.put(vertex.clone())?;

    let mut shifted = Vec::new();
    for relation_id in &vertex.relations {
        let relation = session.relation(relation_id)?;
        let other = relation.other_end(id).clone();
        let cap = relation_cap(session, &relation)?;
        // Raising opens relations up to the cap; lowering never raises one
        let target = if level > old {
            cap
        } else {
            relation.data.share_level.min(cap)
        };
        store_relation_level(session, relation, target)?;

        if &other != id && !shifted.contains(&other) {
            let mut neighbor = session.vertex(&other)?;
            neighbor.nb_neighbors.shift(old, level);
            session.put(neighbor)?;
            shifted.push(other);
        }
    }

    session.emit(IndexEvent::ShareLevelChanged {
        id: id.clone(),
        level,
    });
    Ok(true)
}

/// Set any element's level
///
/// Vertices cascade; a relation's requested level is capped by its endpoints;
/// tags and group relations only change their own level and tag references.
pub(crate) fn set_share_level(
    session: &mut Session<'_>,
    id: &ElementId,
    level: ShareLevel,
) -> GraphResult<()> {
    match session.element(id)? {
        GraphElement::Vertex(_) => {
            set_vertex_level(session, id, level)?;
        }
        GraphElement::Relation(relation) => {
            let capped = level.min(relation_cap(session, &relation)?);
            store_relation_level(session, relation, capped)?;
        }
        mut element => {
            let old = element.share_level();
            if old == level {
                return Ok(());
            }
            shift_tag_references(session, element.data(), old, level)?;
            let data = element.data_mut();
            data.share_level = level;
            data.touch();
            session.emit(IndexEvent::ShareLevelChanged {
                id: id.clone(),
                level,
            });
            session.put(element)?;
        }
    }
    Ok(())
}
