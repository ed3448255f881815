use std::fs::{File, OpenOptions};
use std::io::{prelude::*, BufReader, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;

use super::{read_header, read_trailer, ContainerMetadata};
use crate::{error::OpenError, header::ContainerHeader, section::Section};

/// Read-only view of a container file.
#[derive(Debug)]
pub struct ContainerReader {
    pub(crate) file: File,
    pub(crate) path: PathBuf,
    pub(crate) header: ContainerHeader,
    pub(crate) meta: ContainerMetadata,
}

impl ContainerReader {
    /// This will open an existing container file for reading, and error if the file is not valid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ContainerReader, OpenError> {
        let path = path.as_ref().to_path_buf();
        let path = std::fs::canonicalize(&path).map_err(|e| OpenError::InvalidPath(e, path))?;

        let mut file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|e| OpenError::ReadFailed(e, path.clone()))?;

        let (header, meta) = {
            let mut reader = BufReader::new(&mut file);
            let header = read_header(&mut reader).map_err(OpenError::MissingHeader)?;
            let ptr = header.trailer.ok_or(OpenError::MissingTrailer)?;
            let meta = read_trailer(&mut reader, ptr).map_err(OpenError::InvalidTrailer)?;
            (header, meta)
        };

        tracing::debug!(path = ?path, version = header.version, "opened container");

        Ok(ContainerReader {
            file,
            path,
            header,
            meta,
        })
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline(always)]
    pub fn version(&self) -> u32 {
        self.header.version
    }

    #[inline(always)]
    pub fn metadata(&self) -> &ContainerMetadata {
        &self.meta
    }

    #[inline(always)]
    pub fn file_attr<S: AsRef<str>>(&self, key: S) -> Option<&[u8]> {
        self.meta.file_attr(key.as_ref())
    }

    #[inline(always)]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.meta.section(name)
    }

    /// Decompresses the payload of `section` into `dest`.
    pub fn decompress<W: Write>(&self, section: &Section, dest: W) -> std::io::Result<()> {
        if section.length == 0 {
            return Ok(());
        }

        let mmap = unsafe { self.memory_map(section)? };
        section
            .compression
            .decompress_write(std::io::Cursor::new(&mmap[..]), dest)
    }

    /// The decompressed payload of `section`.
    pub fn read_section(&self, section: &Section) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(section.decompressed_length.min(1 << 24) as usize);
        self.decompress(section, &mut buf)?;
        Ok(buf)
    }

    /// The raw, still compressed, bytes of `section`.
    #[inline(always)]
    pub fn read_bytes(&self, section: &Section) -> std::io::Result<std::io::Take<File>> {
        let mut file = OpenOptions::new().read(true).open(&self.path)?;

        file.seek(SeekFrom::Start(section.data.get()))?;
        Ok(file.take(section.length))
    }

    /// # Safety
    ///
    /// The container must not be modified while the map is alive.
    #[inline(always)]
    pub unsafe fn memory_map(&self, section: &Section) -> std::io::Result<memmap2::Mmap> {
        MmapOptions::new()
            .offset(section.data.get())
            .len(section.length as usize)
            .map(&self.file)
    }
}
