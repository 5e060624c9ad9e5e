//! Scenario graphs for integration tests
//!
//! The base scenario is the three-vertex chain `A -> B -> C` owned by
//! "roger", every element private, plus one vertex owned by "colette".

use std::sync::{Arc, Mutex};
use trellis::{
    ElementId, GraphEngine, IndexEvent, Relation, SearchIndexSink, ShareLevel, TagSpec, Vertex,
};

pub const OWNER: &str = "roger";
pub const OTHER_USER: &str = "colette";

/// Index sink that keeps every event it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<IndexEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<IndexEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl SearchIndexSink for RecordingSink {
    fn notify(&self, event: &IndexEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// The `A -> B -> C` chain and the handles tests need
pub struct AbcGraph {
    pub engine: GraphEngine,
    pub a: ElementId,
    pub b: ElementId,
    pub c: ElementId,
    pub a_to_b: ElementId,
    pub b_to_c: ElementId,
    /// Vertex owned by [`OTHER_USER`]
    pub foreign: ElementId,
}

impl AbcGraph {
    pub fn new() -> Self {
        Self::on(GraphEngine::in_memory())
    }

    /// Build the scenario on an existing engine
    pub fn on(engine: GraphEngine) -> Self {
        let a = engine.create_vertex(OWNER).unwrap();
        engine.set_label(a.id(), "vertex A").unwrap();
        let a_to_b = engine.add_vertex_and_relation(a.id()).unwrap();
        let b = a_to_b.destination.clone();
        engine.set_label(&b, "vertex B").unwrap();
        let b_to_c = engine.add_vertex_and_relation(&b).unwrap();
        let c = b_to_c.destination.clone();
        engine.set_label(&c, "vertex C").unwrap();
        engine.set_label(a_to_b.id(), "between vertex A and vertex B").unwrap();
        engine.set_label(b_to_c.id(), "between vertex B and vertex C").unwrap();

        let foreign = engine.create_vertex(OTHER_USER).unwrap();
        engine.set_label(foreign.id(), "colette's vertex").unwrap();

        Self {
            engine,
            a: a.id().clone(),
            b,
            c,
            a_to_b: a_to_b.id().clone(),
            b_to_c: b_to_c.id().clone(),
            foreign: foreign.id().clone(),
        }
    }

    pub fn vertex(&self, id: &ElementId) -> Vertex {
        self.engine.vertex(id).unwrap()
    }

    pub fn relation(&self, id: &ElementId) -> Relation {
        self.engine.relation(id).unwrap()
    }

    pub fn level(&self, id: &ElementId) -> ShareLevel {
        self.engine.get(id).unwrap().share_level()
    }

    /// Add a vertex D hanging off C and return it
    pub fn add_d(&self) -> ElementId {
        let relation = self.engine.add_vertex_and_relation(&self.c).unwrap();
        self.engine.set_label(&relation.destination, "vertex D").unwrap();
        relation.destination
    }

    /// Tag `id` with the shared "computer scientist" resource
    pub fn tag_computer_scientist(&self, id: &ElementId) {
        self.engine
            .add_tag(
                id,
                &TagSpec::new("http://xmlns.com/foaf/0.1/ComputerScientist")
                    .with_label("Computer Scientist"),
            )
            .unwrap();
    }
}
