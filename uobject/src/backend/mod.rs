//! Storage backends: one descriptor per concrete [`StorageMethod`], each knowing how to
//! persist its payload into a container section and how to materialize the canonical
//! table back out of it.

use crate::{
    error::Result,
    file::{ContainerReader, ContainerWriter},
    storage::StorageMethod,
    table::Table,
};

mod relational;
mod tabular;

pub use self::relational::{RelationalBackend, RelationalSource};
pub use self::tabular::TabularBackend;

/// The read side of a backend.
pub trait Backend: Sync {
    fn method(&self) -> StorageMethod;

    /// Reads the section of this backend and produces the canonical table.
    fn materialize(&self, reader: &ContainerReader) -> Result<Table>;
}

/// The write side of a backend.
pub trait Persist: Backend {
    type Payload: ?Sized;

    /// Writes `payload` as this backend's section and returns the tag to record.
    fn persist(&self, writer: &mut ContainerWriter, payload: &Self::Payload)
        -> Result<StorageMethod>;
}

pub static TABULAR: TabularBackend = TabularBackend::new();
pub static RELATIONAL: RelationalBackend = RelationalBackend;

/// The descriptor for `method`, or `None` for the incomplete sentinel.
pub fn descriptor(method: StorageMethod) -> Option<&'static dyn Backend> {
    match method {
        StorageMethod::Incomplete => None,
        StorageMethod::Tabular => Some(&TABULAR),
        StorageMethod::Relational => Some(&RELATIONAL),
    }
}
