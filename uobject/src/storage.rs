use std::fmt;
use std::str::FromStr;

use crate::error::{Result, UObjectError};

/// Root attribute holding the storage method tag.
pub const STORAGE_METHOD_ATTR: &str = "storage_method";

/// How the payload of a container was persisted.
///
/// `Incomplete` is the sentinel a container carries from creation until its
/// single successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageMethod {
    Incomplete,
    Tabular,
    Relational,
}

impl StorageMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            StorageMethod::Incomplete => "INCOMPLETE",
            StorageMethod::Tabular => "tabular",
            StorageMethod::Relational => "relational",
        }
    }

    /// Whether a payload has been persisted under this method.
    #[inline(always)]
    pub const fn is_concrete(self) -> bool {
        !matches!(self, StorageMethod::Incomplete)
    }

    /// Decodes the raw `storage_method` attribute of a container.
    pub fn from_attr(value: Option<&[u8]>) -> Result<StorageMethod> {
        let value = value.ok_or(UObjectError::MissingStorageMethod)?;
        let tag = std::str::from_utf8(value)
            .map_err(|_| UObjectError::UnsupportedStorage(String::from_utf8_lossy(value).into()))?;
        tag.parse()
    }
}

impl fmt::Display for StorageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMethod {
    type Err = UObjectError;

    fn from_str(src: &str) -> Result<Self> {
        match src {
            "INCOMPLETE" => Ok(StorageMethod::Incomplete),
            "tabular" => Ok(StorageMethod::Tabular),
            "relational" => Ok(StorageMethod::Relational),
            other => Err(UObjectError::UnsupportedStorage(other.to_string())),
        }
    }
}
