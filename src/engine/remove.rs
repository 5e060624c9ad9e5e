//! Element removal with its cascades

use super::error::GraphResult;
use super::pattern::normalize_pattern_flags;
use super::session::Session;
use super::visibility::{recount_vertex, release_tag_references};
use crate::graph::{ElementId, GraphElement, GroupRelation, Relation};
use crate::index::IndexEvent;
use tracing::debug;

/// Remove any element
///
/// A vertex takes its incident relations with it; tags it referenced lose a
/// reference but survive. Removing a tag detaches it from every element of
/// its owner. Removing a group relation releases its members.
pub(crate) fn remove(session: &mut Session<'_>, id: &ElementId) -> GraphResult<()> {
    match session.element(id)? {
        GraphElement::Vertex(vertex) => {
            let mut neighbors = Vec::new();
            for relation_id in &vertex.relations {
                let relation = session.relation(relation_id)?;
                let other = relation.other_end(id).clone();
                delete_relation(session, relation, Some(id))?;
                if &other != id && !neighbors.contains(&other) {
                    neighbors.push(other);
                }
            }
            release_tag_references(session, &vertex.data)?;
            session.delete(id)?;
            session.emit(IndexEvent::Removed { id: id.clone() });
            debug!(vertex = %id, relations = vertex.relations.len(), "vertex removed");
            if vertex.data.in_pattern() {
                normalize_pattern_flags(session, neighbors)?;
            }
        }
        GraphElement::Relation(relation) => {
            let endpoints = [relation.source.clone(), relation.destination.clone()];
            let in_pattern = relation.data.in_pattern();
            delete_relation(session, relation, None)?;
            if in_pattern {
                normalize_pattern_flags(session, endpoints)?;
            }
        }
        GraphElement::Tag(tag) => {
            for mut element in session.elements_of_owner(tag.data.owner())? {
                let data = element.data_mut();
                if data.tags.remove(&tag.external_uri).is_some() {
                    data.touch();
                    let element_id = data.id.clone();
                    session.put(element)?;
                    session.emit(IndexEvent::TagsChanged { id: element_id });
                }
            }
            session.delete(id)?;
            session.emit(IndexEvent::Removed { id: id.clone() });
        }
        GraphElement::GroupRelation(group) => delete_group(session, group)?,
    }
    Ok(())
}

/// Delete a relation, detach it from its endpoints and recount them
///
/// `skip` names an endpoint that is itself being deleted.
pub(crate) fn delete_relation(
    session: &mut Session<'_>,
    relation: Relation,
    skip: Option<&ElementId>,
) -> GraphResult<()> {
    let mut endpoints = vec![&relation.source];
    if !relation.is_self_loop() {
        endpoints.push(&relation.destination);
    }
    let endpoints: Vec<&ElementId> = endpoints
        .into_iter()
        .filter(|e| Some(*e) != skip)
        .collect();

    for endpoint in &endpoints {
        let mut vertex = session.vertex(endpoint)?;
        vertex.detach_relation(relation.id());
        session.put(vertex)?;
    }
    release_tag_references(session, &relation.data)?;
    if let Some(group) = &relation.group {
        release_from_group(session, group, relation.id())?;
    }
    session.delete(relation.id())?;
    for endpoint in endpoints {
        recount_vertex(session, endpoint)?;
    }
    session.emit(IndexEvent::Removed {
        id: relation.id().clone(),
    });
    Ok(())
}

/// Take `member` out of `group`; a group left empty is deleted
pub(crate) fn release_from_group(
    session: &mut Session<'_>,
    group: &ElementId,
    member: &ElementId,
) -> GraphResult<()> {
    let Some(GraphElement::GroupRelation(mut group)) = session.find(group)? else {
        return Ok(());
    };
    group.members.retain(|m| m != member);
    if group.members.is_empty() {
        release_tag_references(session, &group.data)?;
        session.delete(group.id())?;
        session.emit(IndexEvent::Removed {
            id: group.id().clone(),
        });
    } else {
        session.put(group)?;
    }
    Ok(())
}

fn delete_group(session: &mut Session<'_>, group: GroupRelation) -> GraphResult<()> {
    for member in &group.members {
        if let Some(GraphElement::Relation(mut relation)) = session.find(member)? {
            relation.group = None;
            session.put(relation)?;
        }
    }
    release_tag_references(session, &group.data)?;
    session.delete(group.id())?;
    session.emit(IndexEvent::Removed {
        id: group.id().clone(),
    });
    Ok(())
}
