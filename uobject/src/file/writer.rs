use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{prelude::*, BufWriter, SeekFrom};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use crate::{compression::Compression, header::ContainerHeader, section::Section, ser::Serialize};

use super::ContainerMetadata;

/// Writes a container file.
///
/// The file is kept well-formed: [checkpoint][ContainerWriter::checkpoint] and
/// [finish][ContainerWriter::finish] both rewrite the header and a complete trailer,
/// and a writer dropped without finishing does so one last time.
#[derive(Debug)]
pub struct ContainerWriter {
    pub(crate) file: BufWriter<File>,
    pub(crate) path: PathBuf,
    pub(crate) header: ContainerHeader,
    pub(crate) meta: ContainerMetadata,
    finished: bool,
}

impl Drop for ContainerWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        tracing::warn!(
            "ContainerWriter dropped without calling finish(). Container at {:?} is left incomplete.",
            self.path
        );

        if let Err(error) = self.write_trailer() {
            tracing::warn!(%error, path = ?self.path, "could not write trailer of dropped container");
        }
    }
}

impl ContainerWriter {
    #[inline(always)]
    fn write_header(&mut self) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.header.write(&mut self.file)
    }

    fn write_trailer(&mut self) -> std::io::Result<u64> {
        let pos = self.next_write_addr().get();
        self.header.trailer = NonZeroU64::new(pos);
        self.write_header()?;
        self.file.seek(SeekFrom::Start(pos))?;
        self.meta.write(&mut self.file)?;

        let new_pos = self.file.stream_position()?;
        self.file.flush()?;
        self.file.get_mut().set_len(new_pos)?;

        tracing::debug!(
            path = ?self.path,
            trailer = format_args!("{:#x}", pos),
            bytes = new_pos,
            sections = self.meta.sections.len(),
            "wrote container trailer"
        );

        Ok(new_pos)
    }

    /// Persists the current metadata without closing the file.
    pub fn checkpoint(&mut self) -> std::io::Result<u64> {
        self.write_trailer()
    }

    /// Persists the metadata, flushes and closes the file. Returns the final file size.
    pub fn finish(mut self) -> std::io::Result<u64> {
        let len = self.write_trailer()?;
        self.finished = true;
        Ok(len)
    }

    #[inline(always)]
    fn next_write_addr(&self) -> NonZeroU64 {
        self.meta
            .sections
            .iter()
            .map(|s| s.data.get() + s.length)
            .max()
            .and_then(NonZeroU64::new)
            .unwrap_or(ContainerHeader::SIZE_NONZERO)
    }

    /// This will create a new container file for writing, and error if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<ContainerWriter> {
        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create_new(true)
            .open(path.as_ref())?;

        let mut writer = ContainerWriter {
            file: BufWriter::new(file),
            path: path.as_ref().to_path_buf(),
            header: ContainerHeader::default(),
            meta: ContainerMetadata::default(),
            finished: false,
        };

        writer.write_header()?;

        Ok(writer)
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline(always)]
    pub fn metadata(&self) -> &ContainerMetadata {
        &self.meta
    }

    /// Sets a root attribute of the container, replacing any previous value.
    pub fn set_file_attr<S: AsRef<str>>(&mut self, key: S, value: Vec<u8>) {
        let key = self.meta.attr_key_or_create(key.as_ref());
        self.meta.attrs.insert(key, value);
    }

    /// Appends a section holding the bytes of `value`. Section names are unique.
    pub fn insert_section<R: Read>(
        &mut self,
        name: &str,
        compression: Compression,
        value: &mut R,
        attrs: HashMap<String, Vec<u8>>,
    ) -> std::io::Result<&Section> {
        if self.meta.section(name).is_some() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("section '{}' already exists", name),
            ));
        }

        let data = self.next_write_addr();
        self.file.seek(SeekFrom::Start(data.get()))?;
        let bytes = compression.compress(&mut self.file, value)?;

        let attrs = attrs
            .into_iter()
            .map(|(k, v)| (self.meta.attr_key_or_create(&k), v))
            .collect::<HashMap<_, _>>();

        tracing::debug!(
            name,
            %compression,
            data = format_args!("{:#x}", data.get()),
            length = bytes.write,
            decompressed_length = bytes.read,
            "inserted section"
        );

        self.meta.sections.push(Section {
            name: name.to_string(),
            compression,
            length: bytes.write,
            decompressed_length: bytes.read,
            data,
            attrs,
        });

        Ok(&self.meta.sections[self.meta.sections.len() - 1])
    }
}
