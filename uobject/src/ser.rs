use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::{
    file::{AttrMap, ContainerMetadata},
    header::ContainerHeader,
    section::Section,
    table::{Field, Scalar, Table},
    Compression,
};

pub(crate) trait Serialize {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()>;
}

impl<T: Serialize> Serialize for Vec<T> {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u64::<LittleEndian>(self.len() as u64)?;

        for item in self.iter() {
            item.write(writer)?;
        }
        Ok(())
    }
}

impl Serialize for String {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u64::<LittleEndian>(self.len() as u64)?;
        writer.write_all(self.as_bytes())
    }
}

impl Serialize for Vec<u8> {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u64::<LittleEndian>(self.len() as u64)?;
        writer.write_all(self)
    }
}

impl Serialize for AttrMap {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        // Write the length in bytes so implementations can skip the entire map if they so choose.

        // Write it as u64::MAX, then seek back
        let size_index = writer.stream_position()?;
        writer.write_u64::<LittleEndian>(u64::MAX)?;
        writer.write_u64::<LittleEndian>(self.len() as u64)?;

        // Sorted so identical metadata encodes to identical bytes.
        let mut entries = self.iter().collect::<Vec<_>>();
        entries.sort_by_key(|(key, _)| **key);

        for (key, value) in entries {
            writer.write_u64::<LittleEndian>(*key as u64)?;
            value.write(writer)?;
        }

        // Go back and write size
        let cur_index = writer.stream_position()?;
        writer.seek(SeekFrom::Start(size_index))?;
        writer.write_u64::<LittleEndian>(cur_index - size_index)?;
        writer.seek(SeekFrom::Start(cur_index))?;

        Ok(())
    }
}

impl Serialize for Compression {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u8(self.id())
    }
}

impl Serialize for Section {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name.write(writer)?;
        self.compression.write(writer)?;
        writer.write_u64::<LittleEndian>(self.length)?;
        writer.write_u64::<LittleEndian>(self.decompressed_length)?;
        writer.write_u64::<LittleEndian>(self.data.get())?;
        self.attrs.write(writer)
    }
}

impl Serialize for ContainerHeader {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.magic_bytes)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_all(&[0u8; 8])?; // reserved
        writer.write_u64::<LittleEndian>(self.trailer.map(|x| x.get()).unwrap_or(0))
    }
}

impl Serialize for ContainerMetadata {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.attr_keys.write(writer)?;
        self.attrs.write(writer)?;
        self.sections.write(writer)
    }
}

impl Serialize for Field {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        self.name.write(writer)?;
        writer.write_u8(self.ty.id())
    }
}

impl Serialize for Scalar {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u8(self.field_type().id())?;

        match self {
            Scalar::Int(v) => writer.write_i64::<LittleEndian>(*v),
            Scalar::Float(v) => writer.write_f64::<LittleEndian>(*v),
            Scalar::Bool(v) => writer.write_u8(*v as u8),
            Scalar::Str(v) => v.write(writer),
        }
    }
}

impl Serialize for Table {
    fn write<W: Write + Seek>(&self, writer: &mut W) -> std::io::Result<()> {
        let fields = self.schema().fields();
        writer.write_u64::<LittleEndian>(fields.len() as u64)?;
        for field in fields {
            field.write(writer)?;
        }

        writer.write_u64::<LittleEndian>(self.num_rows() as u64)?;
        for row in self.rows() {
            for value in row {
                value.write(writer)?;
            }
        }
        Ok(())
    }
}
