use std::num::NonZeroU64;

use crate::{compression::Compression, file::ContainerMetadata, AttrMap};

/// A named region of payload bytes inside a container, one per storage method.
#[derive(Debug, Clone)]
pub struct Section {
    /// The storage method tag this section belongs to.
    pub name: String,

    pub compression: Compression,

    /// The exact length of the data as written, ignoring any padding.
    pub length: u64,

    /// A hint for the size of the content when decompressed. Do not trust in absolute terms.
    pub decompressed_length: u64,

    /// The position of the data in the file
    pub data: NonZeroU64,

    /// Backend-specific attributes, keyed by interned attribute key.
    pub attrs: AttrMap,
}

impl Section {
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[inline(always)]
    pub fn attr<S: AsRef<str>>(&self, meta: &ContainerMetadata, key: S) -> Option<&[u8]> {
        let key = meta.attr_key(key.as_ref())?;
        self.attrs.get(&key).map(|v| v.as_slice())
    }

    /// A UTF-8 attribute, or `None` if missing or not valid UTF-8.
    pub fn attr_str<S: AsRef<str>>(&self, meta: &ContainerMetadata, key: S) -> Option<&str> {
        self.attr(meta, key)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}
