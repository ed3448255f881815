//! Write-once intermediary tables for data pipelines.
//!
//! A [`UObject`] is written exactly once through one of its `from_*` methods and
//! read through one of its `to_*` methods, either in the same process after
//! [`UObject::transition_to_read`] or by reopening its [`Identity`] elsewhere. The
//! payload lives in a single container file that records which [`StorageMethod`]
//! encoded it.

mod compression;
mod de;
mod file;
mod header;
mod section;
mod ser;

pub mod backend;
pub mod codec;
mod config;
mod container;
mod error;
pub mod stage;
mod storage;
mod table;

pub use backend::{Backend, Persist, RelationalBackend, RelationalSource, TabularBackend};
pub use codec::{DelimitedOptions, KeyMap};
pub use compression::{Compression, ParseCompressionError};
pub use config::ContainerConfig;
pub use container::{Identity, Phase, UObject, EXTENSION};
pub use error::{OpenError, Result, UObjectError};
pub use file::{AttrMap, ContainerMetadata, ContainerReader, ContainerWriter};
pub use section::Section;
pub use stage::{Handoff, Ports, Stage};
pub use storage::{StorageMethod, STORAGE_METHOD_ATTR};
pub use table::{Field, FieldType, Scalar, Schema, Table};

#[doc(hidden)]
pub use comde;
