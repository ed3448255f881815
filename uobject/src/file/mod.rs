use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroU64;

use crate::de::DeserializeOwned;
use crate::header::ContainerHeader;

mod meta;
mod reader;
mod writer;

pub use self::meta::ContainerMetadata;
pub use self::reader::ContainerReader;
pub use self::writer::ContainerWriter;

pub type AttrMap = HashMap<usize, Vec<u8>>;

#[inline(always)]
pub(crate) fn read_header<R: Read + Seek>(file: &mut R) -> std::io::Result<ContainerHeader> {
    file.seek(SeekFrom::Start(0))?;
    ContainerHeader::deserialize_owned(file)
}

#[inline(always)]
pub(crate) fn read_trailer<R: Read + Seek>(
    file: &mut R,
    ptr: NonZeroU64,
) -> std::io::Result<ContainerMetadata> {
    file.seek(SeekFrom::Start(ptr.get()))?;
    ContainerMetadata::deserialize_owned(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compression::Compression, error::OpenError};
    use std::io::{Cursor, Write};
    use std::path::Path;

    const TEXT: &str =
        "This, this, this, this, this is a compressable string string string string string.\n";

    fn create_test_container(path: &Path) {
        let mut writer = ContainerWriter::create(path).unwrap();
        writer.set_file_attr("storage_method", b"tabular".to_vec());
        writer
            .insert_section(
                "tabular",
                Compression::Stored,
                &mut Cursor::new(b"hello\0\0\0".to_vec()),
                HashMap::new(),
            )
            .unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn create_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smoketest.upsg");
        create_test_container(&path);

        let reader = ContainerReader::open(&path).unwrap();
        assert_eq!(reader.file_attr("storage_method"), Some(&b"tabular"[..]));
        assert_eq!(reader.metadata().sections().len(), 1);

        let section = reader.section("tabular").unwrap();
        assert_eq!(reader.read_section(section).unwrap(), b"hello\0\0\0");

        let mut raw = vec![];
        reader
            .read_bytes(section)
            .unwrap()
            .read_to_end(&mut raw)
            .unwrap();
        assert_eq!(raw, b"hello\0\0\0");
    }

    #[test]
    fn create_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taken.upsg");
        create_test_container(&path);

        let err = ContainerWriter::create(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn empty_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.upsg");
        ContainerWriter::create(&path).unwrap().finish().unwrap();

        let reader = ContainerReader::open(&path).unwrap();
        assert!(reader.metadata().sections().is_empty());
        assert_eq!(reader.file_attr("storage_method"), None);
    }

    #[test]
    fn compressed_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compressed.upsg");

        let mut attrs = HashMap::new();
        attrs.insert("row_count".to_string(), 1u64.to_le_bytes().to_vec());

        {
            let mut writer = ContainerWriter::create(&path).unwrap();
            for (name, compression) in [
                ("stored", Compression::Stored),
                ("zstd", Compression::Zstd),
                ("deflate", Compression::Deflate),
            ] {
                let section = writer
                    .insert_section(
                        name,
                        compression,
                        &mut Cursor::new(TEXT.as_bytes()),
                        attrs.clone(),
                    )
                    .unwrap();
                assert_eq!(section.decompressed_length, TEXT.len() as u64);
            }
            writer.finish().unwrap();
        }

        let reader = ContainerReader::open(&path).unwrap();
        let meta = reader.metadata();
        for name in ["stored", "zstd", "deflate"] {
            let section = reader.section(name).unwrap();
            assert_eq!(reader.read_section(section).unwrap(), TEXT.as_bytes());
            assert_eq!(
                section.attr(meta, "row_count"),
                Some(&1u64.to_le_bytes()[..])
            );
        }
        assert!(reader.section("zstd").unwrap().length < TEXT.len() as u64);
    }

    #[test]
    fn duplicate_section_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duplicate.upsg");

        let mut writer = ContainerWriter::create(&path).unwrap();
        writer
            .insert_section(
                "tabular",
                Compression::Stored,
                &mut Cursor::new(vec![1u8]),
                HashMap::new(),
            )
            .unwrap();
        let err = writer
            .insert_section(
                "tabular",
                Compression::Stored,
                &mut Cursor::new(vec![2u8]),
                HashMap::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        writer.finish().unwrap();
    }

    #[test]
    fn empty_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty_section.upsg");

        let mut writer = ContainerWriter::create(&path).unwrap();
        writer
            .insert_section(
                "relational",
                Compression::Stored,
                &mut std::io::empty(),
                HashMap::new(),
            )
            .unwrap();
        writer.finish().unwrap();

        let reader = ContainerReader::open(&path).unwrap();
        let section = reader.section("relational").unwrap();
        assert_eq!(section.length, 0);
        assert!(reader.read_section(section).unwrap().is_empty());
    }

    #[test]
    fn dropped_writer_leaves_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.upsg");

        {
            let mut writer = ContainerWriter::create(&path).unwrap();
            writer.set_file_attr("storage_method", b"INCOMPLETE".to_vec());
        }

        let reader = ContainerReader::open(&path).unwrap();
        assert_eq!(
            reader.file_attr("storage_method"),
            Some(&b"INCOMPLETE"[..])
        );
    }

    #[test]
    fn read_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.upsg");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"id,name\n1,a\n")
            .unwrap();

        match ContainerReader::open(&path) {
            Err(OpenError::MissingHeader(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_trailer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_trailer.upsg");
        let mut header = Vec::new();
        crate::ser::Serialize::write(
            &ContainerHeader::default(),
            &mut Cursor::new(&mut header),
        )
        .unwrap();
        std::fs::write(&path, &header).unwrap();

        match ContainerReader::open(&path) {
            Err(OpenError::MissingTrailer) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        match ContainerReader::open(dir.path().join("nothing.upsg")) {
            Err(OpenError::InvalidPath(_, _)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
