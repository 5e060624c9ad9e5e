//! In-memory storage backend

use super::traits::{GraphStore, GraphTransaction, StorageError, StorageResult};
use crate::graph::{ElementId, GraphElement};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

type Elements = BTreeMap<ElementId, GraphElement>;

/// Volatile graph store keyed by element id
///
/// A transaction holds the store lock for its whole lifetime and stages its
/// writes; they are applied to the shared map only on commit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    elements: Mutex<Elements>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryStore {
    fn begin(&self) -> StorageResult<Box<dyn GraphTransaction + '_>> {
        let committed = self.elements.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(Box::new(MemoryTransaction {
            committed,
            staged: BTreeMap::new(),
        }))
    }
}

struct MemoryTransaction<'a> {
    committed: MutexGuard<'a, Elements>,
    /// `None` marks a staged deletion
    staged: BTreeMap<ElementId, Option<GraphElement>>,
}

impl MemoryTransaction<'_> {
    /// Current view: staged writes layered over committed state
    fn current(&self) -> Vec<&GraphElement> {
        let staged = &self.staged;
        self.committed
            .iter()
            .filter(|(id, _)| !staged.contains_key(*id))
            .map(|(_, element)| element)
            .chain(staged.values().flatten())
            .collect()
    }
}

impl GraphTransaction for MemoryTransaction<'_> {
    fn get(&self, id: &ElementId) -> StorageResult<Option<GraphElement>> {
        match self.staged.get(id) {
            Some(entry) => Ok(entry.clone()),
            None => Ok(self.committed.get(id).cloned()),
        }
    }

    fn put(&mut self, element: GraphElement) -> StorageResult<()> {
        self.staged.insert(element.id().clone(), Some(element));
        Ok(())
    }

    fn delete(&mut self, id: &ElementId) -> StorageResult<bool> {
        let existed = self.get(id)?.is_some();
        self.staged.insert(id.clone(), None);
        Ok(existed)
    }

    fn elements_of_owner(&self, owner: &str) -> StorageResult<Vec<GraphElement>> {
        Ok(self
            .current()
            .into_iter()
            .filter(|element| element.id().owner() == owner)
            .cloned()
            .collect())
    }

    fn centered_elements(&self) -> StorageResult<Vec<GraphElement>> {
        Ok(self
            .current()
            .into_iter()
            .filter(|element| element.data().last_center_date.is_some())
            .cloned()
            .collect())
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.current().len())
    }

    fn commit(mut self: Box<Self>) -> StorageResult<()> {
        let staged = std::mem::take(&mut self.staged);
        for (id, entry) in staged {
            match entry {
                Some(element) => {
                    self.committed.insert(id, element);
                }
                None => {
                    self.committed.remove(&id);
                }
            }
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) -> StorageResult<()> {
        Ok(())
    }
}
