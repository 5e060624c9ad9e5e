//! Visibility-filtered neighborhood extraction

use super::ordered::OrderedMap;
use crate::engine::{GraphError, GraphResult, Session};
use crate::graph::{ElementData, ElementId, ElementKind, GraphElement, GroupRelation, Relation, ShareLevel, Tag, Vertex};
use serde::Serialize;
use std::collections::VecDeque;

/// A vertex snapshot with its hop count from the center
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VertexInSubgraph {
    #[serde(flatten)]
    pub vertex: Vertex,
    pub distance_from_center: u32,
}

/// Snapshot of the neighborhood of a center element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subgraph {
    pub center: ElementId,
    pub vertices: OrderedMap<VertexInSubgraph>,
    pub relations: OrderedMap<Relation>,
    pub group_relations: OrderedMap<GroupRelation>,
    pub tags: OrderedMap<Tag>,
}

impl Subgraph {
    fn new(center: ElementId) -> Self {
        Self {
            center,
            vertices: OrderedMap::new(),
            relations: OrderedMap::new(),
            group_relations: OrderedMap::new(),
            tags: OrderedMap::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn contains_vertex(&self, id: &ElementId) -> bool {
        self.vertices.contains_key(id)
    }

    pub fn contains_relation(&self, id: &ElementId) -> bool {
        self.relations.contains_key(id)
    }

    pub fn vertex(&self, id: &ElementId) -> Option<&Vertex> {
        self.vertices.get(id).map(|v| &v.vertex)
    }

    pub fn relation(&self, id: &ElementId) -> Option<&Relation> {
        self.relations.get(id)
    }

    pub fn distance_of(&self, id: &ElementId) -> Option<u32> {
        self.vertices.get(id).map(|v| v.distance_from_center)
    }

    /// Vertex with the given label, if exactly one is present
    pub fn vertex_with_label(&self, label: &str) -> Option<&Vertex> {
        let mut matches = self
            .vertices
            .values()
            .map(|v| &v.vertex)
            .filter(|v| v.data.label == label);
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }
}

/// Query extracting the neighborhood of a vertex or tag
#[derive(Debug, Clone)]
pub struct SubgraphQuery {
    /// Center element
    pub center: ElementId,
    /// Maximum hop count (0 = center only); negative depths are rejected
    pub depth: i32,
    /// Levels an element must have to be included
    pub levels: Vec<ShareLevel>,
}

impl SubgraphQuery {
    /// Create a query around `center` with depth 1 and every level allowed
    pub fn from(center: ElementId) -> Self {
        Self {
            center,
            depth: 1,
            levels: ShareLevel::ALL.to_vec(),
        }
    }

    /// Set the maximum depth
    pub fn depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    /// Restrict the levels included
    pub fn levels(mut self, levels: impl IntoIterator<Item = ShareLevel>) -> Self {
        self.levels = levels.into_iter().collect();
        self
    }

    /// Only public elements
    pub fn public_only(self) -> Self {
        self.levels([ShareLevel::Public])
    }

    fn allows(&self, data: &ElementData) -> bool {
        self.levels.contains(&data.share_level)
    }

    pub(crate) fn execute(&self, session: &Session<'_>) -> GraphResult<Subgraph> {
        if self.depth < 0 {
            return Err(GraphError::InvalidDepth {
                center: self.center.clone(),
                depth: self.depth,
            });
        }
        let center = session.element(&self.center)?;
        if !self.allows(center.data()) {
            return Err(GraphError::NotFound(self.center.clone()));
        }

        let mut subgraph = Subgraph::new(self.center.clone());
        match center {
            GraphElement::Vertex(vertex) => self.traverse(session, vertex, &mut subgraph)?,
            GraphElement::Tag(tag) => self.referencing(session, tag, &mut subgraph)?,
            _ => {
                return Err(GraphError::WrongKind {
                    id: self.center.clone(),
                    expected: ElementKind::Vertex,
                })
            }
        }
        self.collect_tags(session, &mut subgraph)?;
        Ok(subgraph)
    }

    /// Breadth-first over allowed relations, then the induced relation set
    fn traverse(&self, session: &Session<'_>, center: Vertex, subgraph: &mut Subgraph) -> GraphResult<()> {
        let max_depth = self.depth as u32;
        let mut queue: VecDeque<(ElementId, u32)> = VecDeque::new();
        queue.push_back((center.id().clone(), 0));
        subgraph.vertices.insert(
            center.id().clone(),
            VertexInSubgraph {
                vertex: center,
                distance_from_center: 0,
            },
        );

        while let Some((id, distance)) = queue.pop_front() {
            if distance >= max_depth {
                continue;
            }
            let relations = match subgraph.vertex(&id) {
                Some(vertex) => vertex.relations.clone(),
                None => continue,
            };
            for relation_id in &relations {
                let relation = session.relation(relation_id)?;
                if !self.allows(&relation.data) {
                    continue;
                }
                let other = relation.other_end(&id);
                if subgraph.contains_vertex(other) {
                    continue;
                }
                let neighbor = session.vertex(other)?;
                if !self.allows(&neighbor.data) {
                    continue;
                }
                queue.push_back((other.clone(), distance + 1));
                subgraph.vertices.insert(
                    other.clone(),
                    VertexInSubgraph {
                        vertex: neighbor,
                        distance_from_center: distance + 1,
                    },
                );
            }
        }

        let relation_ids: Vec<ElementId> = subgraph
            .vertices
            .values()
            .flat_map(|v| v.vertex.relations.iter().cloned())
            .collect();
        for relation_id in relation_ids {
            if subgraph.contains_relation(&relation_id) {
                continue;
            }
            let relation = session.relation(&relation_id)?;
            if self.allows(&relation.data)
                && subgraph.contains_vertex(&relation.source)
                && subgraph.contains_vertex(&relation.destination)
            {
                self.add_relation(session, relation, subgraph)?;
            }
        }
        Ok(())
    }

    fn add_relation(&self, session: &Session<'_>, relation: Relation, subgraph: &mut Subgraph) -> GraphResult<()> {
        if let Some(group_id) = &relation.group {
            if !subgraph.group_relations.contains_key(group_id) {
                let group = session.group(group_id)?;
                if self.allows(&group.data) {
                    subgraph.group_relations.insert(group_id.clone(), group);
                }
            }
        }
        subgraph.relations.insert(relation.id().clone(), relation);
        Ok(())
    }

    /// Tag-centered view: the tag and the allowed vertices referencing it
    fn referencing(&self, session: &Session<'_>, tag: Tag, subgraph: &mut Subgraph) -> GraphResult<()> {
        if self.depth > 0 {
            for element in session.elements_of_owner(tag.data.owner())? {
                let GraphElement::Vertex(vertex) = element else {
                    continue;
                };
                if vertex.data.has_tag(&tag.external_uri) && self.allows(&vertex.data) {
                    subgraph.vertices.insert(
                        vertex.id().clone(),
                        VertexInSubgraph {
                            vertex,
                            distance_from_center: 1,
                        },
                    );
                }
            }
        }
        subgraph.tags.insert(tag.id().clone(), tag);
        Ok(())
    }

    /// Every tag referenced by an included element
    fn collect_tags(&self, session: &Session<'_>, subgraph: &mut Subgraph) -> GraphResult<()> {
        let tag_ids: Vec<ElementId> = subgraph
            .vertices
            .values()
            .map(|v| &v.vertex.data)
            .chain(subgraph.relations.values().map(|r| &r.data))
            .chain(subgraph.group_relations.values().map(|g| &g.data))
            .flat_map(|data| data.tags.values().cloned())
            .collect();
        for tag_id in tag_ids {
            if !subgraph.tags.contains_key(&tag_id) {
                let tag = session.tag(&tag_id)?;
                subgraph.tags.insert(tag_id, tag);
            }
        }
        Ok(())
    }
}
