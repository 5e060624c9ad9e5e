//! Folding one vertex into another

use super::error::GraphResult;
use super::session::Session;
use super::remove::release_from_group;
use super::visibility::{recount_vertex, relation_cap, release_tag_references, store_relation_level};
use crate::graph::{ElementId, Relation, Vertex};
use crate::index::IndexEvent;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Whether `target` already holds a relation other than `except` with the
/// given ordered endpoints
fn has_parallel(
    session: &Session<'_>,
    target_relations: &[ElementId],
    except: &ElementId,
    source: &ElementId,
    destination: &ElementId,
) -> GraphResult<bool> {
    for id in target_relations.iter().filter(|id| *id != except) {
        let existing = session.relation(id)?;
        if &existing.source == source && &existing.destination == destination {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Merge `source` into `target`; false when either is in a pattern
pub(crate) fn merge_to(
    session: &mut Session<'_>,
    source: &ElementId,
    target: &ElementId,
) -> GraphResult<bool> {
    if source == target {
        return Ok(false);
    }
    let from = session.vertex(source)?;
    let mut into = session.vertex(target)?;
    if from.data.in_pattern() || into.data.in_pattern() || from.data.owner() != into.data.owner() {
        debug!(%source, %target, "merge refused");
        return Ok(false);
    }

    let mut affected: BTreeSet<ElementId> = BTreeSet::new();
    let mut relinked: Vec<ElementId> = Vec::new();
    let mut discarded = 0usize;

    for relation_id in &from.relations {
        let mut relation = session.relation(relation_id)?;
        let mut moved = relation.clone();
        moved.relink(source, target);

        let duplicate = has_parallel(
            session,
            &into.relations,
            relation_id,
            &moved.source,
            &moved.destination,
        )?;

        if duplicate {
            discard_relation(session, &relation, source, &mut into, &mut affected)?;
            discarded += 1;
            continue;
        }

        for endpoint in [&moved.source, &moved.destination] {
            if endpoint != target {
                affected.insert(endpoint.clone());
            }
        }
        relation.relink(source, target);
        relation.data.touch();
        into.attach_relation(relation_id.clone());
        session.put(relation)?;
        relinked.push(relation_id.clone());
    }

    // Tags move; a tag the target already carries only loses a reference
    for (uri, tag_id) in &from.data.tags {
        let mut tag = session.tag(tag_id)?;
        tag.nb_neighbors.decrement(from.data.share_level);
        if !into.data.has_tag(uri) {
            tag.nb_neighbors.increment(into.data.share_level);
            into.data.tags.insert(uri.clone(), tag_id.clone());
        }
        session.put(tag)?;
    }

    into.data.touch();
    session.put(into.clone())?;
    session.delete(source)?;

    // Relinked relations keep their level unless the new endpoint caps it
    for relation_id in &relinked {
        let relation = session.relation(relation_id)?;
        let level = relation.data.share_level.min(relation_cap(session, &relation)?);
        store_relation_level(session, relation, level)?;
    }

    recount_vertex(session, target)?;
    for id in &affected {
        recount_vertex(session, id)?;
    }

    session.emit(IndexEvent::Removed { id: source.clone() });
    session.emit(IndexEvent::Upserted { id: target.clone() });
    info!(
        %source,
        %target,
        relinked = relinked.len(),
        discarded,
        "vertices merged"
    );
    Ok(true)
}

/// Drop a relation that would duplicate one the target already has
fn discard_relation(
    session: &mut Session<'_>,
    relation: &Relation,
    source: &ElementId,
    into: &mut Vertex,
    affected: &mut BTreeSet<ElementId>,
) -> GraphResult<()> {
    for endpoint in [&relation.source, &relation.destination] {
        if endpoint == source {
            continue;
        }
        if endpoint == into.id() {
            into.detach_relation(relation.id());
        } else {
            let mut vertex = session.vertex(endpoint)?;
            vertex.detach_relation(relation.id());
            session.put(vertex)?;
            affected.insert(endpoint.clone());
        }
    }
    release_tag_references(session, &relation.data)?;
    if let Some(group) = &relation.group {
        release_from_group(session, group, relation.id())?;
    }
    session.delete(relation.id())?;
    session.emit(IndexEvent::Removed {
        id: relation.id().clone(),
    });
    Ok(())
}
