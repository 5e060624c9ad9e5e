//! Recompute denormalized state from scratch and compare
//!
//! Checks, for every element of one owner:
//! - relation level never exceeds either endpoint's level
//! - vertex counters equal the distinct neighbors by level
//! - tag counters equal the referencing elements by level
//! - under-pattern flags match reachability from a pattern vertex

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use trellis::{ElementId, GraphElement, GraphEngine, NbNeighbors, ShareLevel};

pub fn assert_invariants(engine: &GraphEngine, owner: &str) {
    let elements: HashMap<ElementId, GraphElement> = engine
        .elements_of_owner(owner)
        .unwrap()
        .into_iter()
        .map(|e| (e.id().clone(), e))
        .collect();
    let level_of = |id: &ElementId| elements[id].share_level();

    for element in elements.values() {
        match element {
            GraphElement::Relation(relation) => {
                let cap = level_of(&relation.source).min(level_of(&relation.destination));
                assert!(
                    relation.data.share_level <= cap,
                    "relation {} at {} exceeds endpoint cap {}",
                    relation.id(),
                    relation.data.share_level,
                    cap
                );
                for endpoint in [&relation.source, &relation.destination] {
                    let vertex = elements[endpoint].as_vertex().unwrap();
                    assert!(
                        vertex.has_relation(relation.id()),
                        "{} missing from adjacency of {}",
                        relation.id(),
                        endpoint
                    );
                }
            }
            GraphElement::Vertex(vertex) => {
                let mut neighbors: BTreeMap<&ElementId, ShareLevel> = BTreeMap::new();
                for relation_id in &vertex.relations {
                    let relation = elements[relation_id].as_relation().unwrap();
                    let other = relation.other_end(vertex.id());
                    if other != vertex.id() {
                        neighbors.insert(other, level_of(other));
                    }
                }
                let expected = NbNeighbors::from_levels(neighbors.into_values());
                assert_eq!(
                    vertex.nb_neighbors,
                    expected,
                    "neighbor counters of {} ({})",
                    vertex.id(),
                    vertex.data.label
                );
                assert!(
                    !(vertex.data.is_pattern && vertex.data.is_under_pattern),
                    "{} is both a pattern and under one",
                    vertex.id()
                );
            }
            GraphElement::Tag(tag) => {
                let expected = NbNeighbors::from_levels(
                    elements
                        .values()
                        .filter(|e| e.data().tags.get(&tag.external_uri) == Some(tag.id()))
                        .map(|e| e.share_level()),
                );
                assert_eq!(
                    tag.nb_neighbors, expected,
                    "reference counters of tag {}",
                    tag.external_uri
                );
            }
            GraphElement::GroupRelation(_) => {}
        }
    }

    assert_pattern_flags(&elements);
}

fn assert_pattern_flags(elements: &HashMap<ElementId, GraphElement>) {
    let mut seen: BTreeSet<ElementId> = BTreeSet::new();
    for start in elements.values().filter_map(|e| e.as_vertex()) {
        if seen.contains(start.id()) {
            continue;
        }
        let mut component_vertices = Vec::new();
        let mut component_relations = BTreeSet::new();
        let mut queue = VecDeque::from([start.id().clone()]);
        seen.insert(start.id().clone());
        while let Some(id) = queue.pop_front() {
            let vertex = elements[&id].as_vertex().unwrap();
            for relation_id in &vertex.relations {
                component_relations.insert(relation_id.clone());
                let other = elements[relation_id].as_relation().unwrap().other_end(&id);
                if seen.insert(other.clone()) {
                    queue.push_back(other.clone());
                }
            }
            component_vertices.push(vertex);
        }

        let has_pattern = component_vertices.iter().any(|v| v.data.is_pattern);
        for vertex in &component_vertices {
            assert_eq!(
                vertex.data.is_under_pattern,
                has_pattern && !vertex.data.is_pattern,
                "under-pattern flag of {}",
                vertex.id()
            );
        }
        for relation_id in &component_relations {
            assert_eq!(
                elements[relation_id].data().is_under_pattern,
                has_pattern,
                "under-pattern flag of relation {}",
                relation_id
            );
        }
    }
}
