use std::collections::HashMap;
use std::io::Read;
use std::num::NonZeroU64;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{
    file::{AttrMap, ContainerMetadata},
    header::ContainerHeader,
    section::Section,
    table::{Field, FieldType, Scalar, Schema, Table},
    Compression,
};

fn invalid_data<E>(error: E) -> std::io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    std::io::Error::new(std::io::ErrorKind::InvalidData, error)
}

/// Reads exactly `len` bytes without trusting `len` for the allocation.
fn read_bytes<R: Read>(reader: &mut R, len: u64) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, found {}", len, buf.len()),
        ));
    }
    Ok(buf)
}

pub(crate) trait DeserializeOwned {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self>
    where
        Self: Sized;
}

impl<T: DeserializeOwned> DeserializeOwned for Vec<T> {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self>
    where
        Self: Sized,
    {
        let len = reader.read_u64::<LittleEndian>()?;
        let mut buf = Vec::new();
        for _ in 0..len {
            buf.push(T::deserialize_owned(reader)?);
        }
        Ok(buf)
    }
}

impl DeserializeOwned for String {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self>
    where
        Self: Sized,
    {
        let len = reader.read_u64::<LittleEndian>()?;
        let buf = read_bytes(reader, len)?;
        String::from_utf8(buf).map_err(invalid_data)
    }
}

impl DeserializeOwned for Vec<u8> {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self>
    where
        Self: Sized,
    {
        let len = reader.read_u64::<LittleEndian>()?;
        read_bytes(reader, len)
    }
}

impl DeserializeOwned for AttrMap {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self>
    where
        Self: Sized,
    {
        let _byte_count = reader.read_u64::<LittleEndian>()?;
        let len = reader.read_u64::<LittleEndian>()?;
        let mut buf: HashMap<usize, Vec<u8>> = HashMap::new();
        for _ in 0..len {
            let key = reader.read_u64::<LittleEndian>()?;
            let value = <Vec<u8>>::deserialize_owned(reader)?;
            buf.insert(key as usize, value);
        }
        Ok(buf)
    }
}

impl DeserializeOwned for Compression {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self>
    where
        Self: Sized,
    {
        Ok(Compression::from_id(reader.read_u8()?))
    }
}

impl DeserializeOwned for Section {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let name = String::deserialize_owned(reader)?;
        let compression = Compression::deserialize_owned(reader)?;
        let length = reader.read_u64::<LittleEndian>()?;
        let decompressed_length = reader.read_u64::<LittleEndian>()?;
        let data = reader.read_u64::<LittleEndian>()?;
        let attrs = AttrMap::deserialize_owned(reader)?;

        tracing::debug!(%name, %compression, length, data, "deserialized Section");

        Ok(Section {
            name,
            compression,
            length,
            decompressed_length,
            data: NonZeroU64::new(data).ok_or_else(|| invalid_data("section offset is zero"))?,
            attrs,
        })
    }
}

impl DeserializeOwned for ContainerHeader {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut magic_bytes = [0u8; 4];
        reader.read_exact(&mut magic_bytes)?;

        if &magic_bytes != crate::header::MAGIC_BYTES {
            return Err(invalid_data("Magic bytes invalid"));
        }

        let version = reader.read_u32::<LittleEndian>()?;
        reader.read_exact(&mut [0u8; 8])?; // skip reserved
        let trailer = reader.read_u64::<LittleEndian>()?;

        tracing::debug!(
            version,
            trailer = format_args!("{:#x}", trailer),
            "deserialized ContainerHeader"
        );

        Ok(ContainerHeader {
            magic_bytes,
            version,
            trailer: NonZeroU64::new(trailer),
        })
    }
}

impl DeserializeOwned for ContainerMetadata {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let attr_keys = <Vec<String>>::deserialize_owned(reader)?;
        let attrs = AttrMap::deserialize_owned(reader)?;
        let sections = <Vec<Section>>::deserialize_owned(reader)?;

        tracing::debug!(
            attr_keys = attr_keys.len(),
            sections = sections.len(),
            "deserialized ContainerMetadata"
        );

        Ok(ContainerMetadata {
            attr_keys,
            attrs,
            sections,
        })
    }
}

impl DeserializeOwned for FieldType {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let id = reader.read_u8()?;
        FieldType::from_id(id)
            .ok_or_else(|| invalid_data(format!("invalid or unsupported field type: {}", id)))
    }
}

impl DeserializeOwned for Field {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let name = String::deserialize_owned(reader)?;
        let ty = FieldType::deserialize_owned(reader)?;
        Ok(Field { name, ty })
    }
}

impl DeserializeOwned for Scalar {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let value = match FieldType::deserialize_owned(reader)? {
            FieldType::Int => Scalar::Int(reader.read_i64::<LittleEndian>()?),
            FieldType::Float => Scalar::Float(reader.read_f64::<LittleEndian>()?),
            FieldType::Bool => Scalar::Bool(reader.read_u8()? != 0),
            FieldType::Str => Scalar::Str(String::deserialize_owned(reader)?),
        };
        Ok(value)
    }
}

impl DeserializeOwned for Table {
    fn deserialize_owned<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let fields = <Vec<Field>>::deserialize_owned(reader)?;
        let schema = Schema::new(fields).map_err(invalid_data)?;
        let row_count = reader.read_u64::<LittleEndian>()?;

        let mut table = Table::new(schema);
        for _ in 0..row_count {
            let row = (0..table.num_fields())
                .map(|_| Scalar::deserialize_owned(reader))
                .collect::<std::io::Result<Vec<_>>>()?;
            table.push_row(row).map_err(invalid_data)?;
        }

        tracing::debug!(
            fields = table.num_fields(),
            rows = table.num_rows(),
            "deserialized Table"
        );

        Ok(table)
    }
}
