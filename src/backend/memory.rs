//! In-memory backend. Nothing survives the process; meant for tests and for
//! embedders that bring their own persistence.

use super::{ItemStore, ItemTable};
use crate::attributes::AttributeMap;
use crate::error::Status;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    table: ItemTable,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl ItemStore for MemoryBackend {
    fn insert(&mut self, attributes: &AttributeMap) -> Status {
        self.table.insert(attributes)
    }

    fn query(&self, query: &AttributeMap) -> (Status, Option<AttributeMap>) {
        self.table.query(query)
    }

    fn delete(&mut self, query: &AttributeMap) -> Status {
        self.table.delete(query)
    }

    fn update(&mut self, query: &AttributeMap, attributes: &AttributeMap) -> Status {
        self.table.update(query, attributes)
    }
}
