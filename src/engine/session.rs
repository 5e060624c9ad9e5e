//! Typed access to one open store transaction

use super::error::{GraphError, GraphResult};
use crate::graph::{ElementId, ElementKind, GraphElement, GroupRelation, Relation, Tag, Vertex};
use crate::index::IndexEvent;
use crate::storage::GraphTransaction;

/// A store transaction plus the index events it will publish on commit
pub(crate) struct Session<'t> {
    tx: Box<dyn GraphTransaction + 't>,
    events: Vec<IndexEvent>,
}

impl<'t> Session<'t> {
    pub(crate) fn new(tx: Box<dyn GraphTransaction + 't>) -> Self {
        Self {
            tx,
            events: Vec::new(),
        }
    }

    pub(crate) fn find(&self, id: &ElementId) -> GraphResult<Option<GraphElement>> {
        Ok(self.tx.get(id)?)
    }

    pub(crate) fn contains(&self, id: &ElementId) -> GraphResult<bool> {
        Ok(self.tx.get(id)?.is_some())
    }

    pub(crate) fn element(&self, id: &ElementId) -> GraphResult<GraphElement> {
        self.find(id)?
            .ok_or_else(|| GraphError::NotFound(id.clone()))
    }

    pub(crate) fn vertex(&self, id: &ElementId) -> GraphResult<Vertex> {
        match self.element(id)? {
            GraphElement::Vertex(v) => Ok(v),
            _ => Err(wrong_kind(id, ElementKind::Vertex)),
        }
    }

    pub(crate) fn relation(&self, id: &ElementId) -> GraphResult<Relation> {
        match self.element(id)? {
            GraphElement::Relation(r) => Ok(r),
            _ => Err(wrong_kind(id, ElementKind::Relation)),
        }
    }

    pub(crate) fn tag(&self, id: &ElementId) -> GraphResult<Tag> {
        match self.element(id)? {
            GraphElement::Tag(t) => Ok(t),
            _ => Err(wrong_kind(id, ElementKind::Tag)),
        }
    }

    pub(crate) fn group(&self, id: &ElementId) -> GraphResult<GroupRelation> {
        match self.element(id)? {
            GraphElement::GroupRelation(g) => Ok(g),
            _ => Err(wrong_kind(id, ElementKind::GroupRelation)),
        }
    }

    pub(crate) fn put(&mut self, element: impl Into<GraphElement>) -> GraphResult<()> {
        self.tx.put(element.into())?;
        Ok(())
    }

    pub(crate) fn delete(&mut self, id: &ElementId) -> GraphResult<bool> {
        Ok(self.tx.delete(id)?)
    }

    pub(crate) fn elements_of_owner(&self, owner: &str) -> GraphResult<Vec<GraphElement>> {
        Ok(self.tx.elements_of_owner(owner)?)
    }

    pub(crate) fn centered(&self) -> GraphResult<Vec<GraphElement>> {
        Ok(self.tx.centered_elements()?)
    }

    pub(crate) fn count(&self) -> GraphResult<usize> {
        Ok(self.tx.count()?)
    }

    /// Queue an index event; dropped if the transaction rolls back
    pub(crate) fn emit(&mut self, event: IndexEvent) {
        self.events.push(event);
    }

    pub(crate) fn commit(self) -> GraphResult<Vec<IndexEvent>> {
        self.tx.commit()?;
        Ok(self.events)
    }

    pub(crate) fn rollback(self) -> GraphResult<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

fn wrong_kind(id: &ElementId, expected: ElementKind) -> GraphError {
    GraphError::WrongKind {
        id: id.clone(),
        expected,
    }
}
