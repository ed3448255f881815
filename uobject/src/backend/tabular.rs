use std::collections::HashMap;
use std::io::Cursor;

use super::{Backend, Persist};
use crate::{
    compression::Compression,
    de::DeserializeOwned,
    error::{Result, UObjectError},
    file::{ContainerReader, ContainerWriter},
    ser::Serialize,
    storage::StorageMethod,
    table::Table,
};

const SECTION: &str = StorageMethod::Tabular.as_str();
const ROW_COUNT_ATTR: &str = "row_count";

/// Persists the canonical table itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularBackend {
    pub compression: Compression,
}

impl TabularBackend {
    pub const fn new() -> TabularBackend {
        TabularBackend {
            compression: Compression::Stored,
        }
    }

    pub const fn with_compression(compression: Compression) -> TabularBackend {
        TabularBackend { compression }
    }
}

impl Backend for TabularBackend {
    fn method(&self) -> StorageMethod {
        StorageMethod::Tabular
    }

    fn materialize(&self, reader: &ContainerReader) -> Result<Table> {
        let section = reader
            .section(SECTION)
            .ok_or(UObjectError::MissingSection(SECTION))?;
        let bytes = reader.read_section(section)?;
        let table = Table::deserialize_owned(&mut Cursor::new(bytes))?;

        tracing::debug!(
            rows = table.num_rows(),
            fields = table.num_fields(),
            compression = %section.compression,
            "materialized tabular section"
        );

        Ok(table)
    }
}

impl Persist for TabularBackend {
    type Payload = Table;

    fn persist(&self, writer: &mut ContainerWriter, table: &Table) -> Result<StorageMethod> {
        let mut buf = Cursor::new(Vec::new());
        table.write(&mut buf)?;
        buf.set_position(0);

        let mut attrs = HashMap::new();
        attrs.insert(
            ROW_COUNT_ATTR.to_string(),
            (table.num_rows() as u64).to_le_bytes().to_vec(),
        );

        writer.insert_section(SECTION, self.compression, &mut buf, attrs)?;
        Ok(StorageMethod::Tabular)
    }
}
