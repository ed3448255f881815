use std::path::{Path, PathBuf};

use crate::compression::Compression;

/// Where containers live and how their payloads are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Directory that relative and generated identities resolve against.
    pub directory: PathBuf,

    /// Compression applied to tabular payloads.
    pub compression: Compression,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            directory: PathBuf::from("."),
            compression: Compression::Stored,
        }
    }
}

impl ContainerConfig {
    pub fn in_directory<P: AsRef<Path>>(directory: P) -> ContainerConfig {
        ContainerConfig {
            directory: directory.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> ContainerConfig {
        self.compression = compression;
        self
    }
}
