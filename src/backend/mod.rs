//! Storage primitives the engine dispatches requests to.

use crate::attributes::AttributeMap;
use crate::error::Status;

/// The secure item store: insert, query, delete and update by attribute map.
///
/// Implementations report outcomes as raw [`Status`] codes; translating them
/// into errors is the engine's job.
pub trait ItemStore {
    fn insert(&mut self, attributes: &AttributeMap) -> Status;

    /// Look up the first item matching `query`. The returned map honours the
    /// query's return-data and return-attributes flags.
    fn query(&self, query: &AttributeMap) -> (Status, Option<AttributeMap>);

    fn delete(&mut self, query: &AttributeMap) -> Status;

    /// Overwrite `attributes` on every item matching `query`.
    fn update(&mut self, query: &AttributeMap, attributes: &AttributeMap) -> Status {
        let _ = (query, attributes);
        Status::UNIMPLEMENTED
    }
}

impl<T: ItemStore + ?Sized> ItemStore for Box<T> {
    fn insert(&mut self, attributes: &AttributeMap) -> Status {
        (**self).insert(attributes)
    }

    fn query(&self, query: &AttributeMap) -> (Status, Option<AttributeMap>) {
        (**self).query(query)
    }

    fn delete(&mut self, query: &AttributeMap) -> Status {
        (**self).delete(query)
    }

    fn update(&mut self, query: &AttributeMap, attributes: &AttributeMap) -> Status {
        (**self).update(query, attributes)
    }
}

pub mod memory;
pub mod table;

pub use memory::MemoryBackend;
pub use table::ItemTable;

#[cfg(feature = "secret-service-backend")]
pub mod secret_service;

#[cfg(feature = "age-backend")]
pub mod age;
