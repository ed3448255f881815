use std::collections::{BTreeMap, HashMap};

use super::{Backend, Persist};
use crate::{
    compression::Compression,
    error::{Result, UObjectError},
    file::{ContainerReader, ContainerWriter},
    storage::StorageMethod,
    table::Table,
};

const SECTION: &str = StorageMethod::Relational.as_str();
const ENDPOINT_URL_ATTR: &str = "endpoint_url";
const CONNECTION_PARAMS_ATTR: &str = "connection_params";
const TABLE_REFERENCE_ATTR: &str = "table_reference";

/// Where a SQL-origin result table lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationalSource {
    pub endpoint_url: String,
    pub connection_params: BTreeMap<String, String>,
    pub table_reference: String,
}

/// Persists a reference to a result table instead of its rows.
///
/// Materializing the referenced table requires a database client, which this
/// crate does not have: every read through this backend fails with
/// [`UObjectError::UnsupportedStorage`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationalBackend;

impl RelationalBackend {
    /// Reads back the persisted connection descriptor without touching the endpoint.
    pub fn describe(&self, reader: &ContainerReader) -> Result<RelationalSource> {
        let meta = reader.metadata();
        let section = reader
            .section(SECTION)
            .ok_or(UObjectError::MissingSection(SECTION))?;

        let text_attr = |key: &'static str| {
            section
                .attr_str(meta, key)
                .map(str::to_string)
                .ok_or(UObjectError::MissingAttr(key))
        };

        let params = section
            .attr(meta, CONNECTION_PARAMS_ATTR)
            .ok_or(UObjectError::MissingAttr(CONNECTION_PARAMS_ATTR))?;

        Ok(RelationalSource {
            endpoint_url: text_attr(ENDPOINT_URL_ATTR)?,
            connection_params: serde_json::from_slice(params)?,
            table_reference: text_attr(TABLE_REFERENCE_ATTR)?,
        })
    }
}

impl Backend for RelationalBackend {
    fn method(&self) -> StorageMethod {
        StorageMethod::Relational
    }

    fn materialize(&self, reader: &ContainerReader) -> Result<Table> {
        tracing::debug!(path = ?reader.path(), "relational materialization requested");
        Err(UObjectError::UnsupportedStorage(SECTION.to_string()))
    }
}

impl Persist for RelationalBackend {
    type Payload = RelationalSource;

    fn persist(
        &self,
        writer: &mut ContainerWriter,
        source: &RelationalSource,
    ) -> Result<StorageMethod> {
        let mut attrs = HashMap::new();
        attrs.insert(
            ENDPOINT_URL_ATTR.to_string(),
            source.endpoint_url.as_bytes().to_vec(),
        );
        attrs.insert(
            CONNECTION_PARAMS_ATTR.to_string(),
            serde_json::to_vec(&source.connection_params)?,
        );
        attrs.insert(
            TABLE_REFERENCE_ATTR.to_string(),
            source.table_reference.as_bytes().to_vec(),
        );

        writer.insert_section(SECTION, Compression::Stored, &mut std::io::empty(), attrs)?;
        Ok(StorageMethod::Relational)
    }
}
