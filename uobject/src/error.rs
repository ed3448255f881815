use std::path::PathBuf;

pub type Result<T, E = UObjectError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("Could not find trailer (the container was never closed).")]
    MissingTrailer,

    #[error("Invalid trailer data (the metadata describing the container is invalid).")]
    InvalidTrailer(#[source] std::io::Error),

    #[error("Could not read header. Is this a valid container file?")]
    MissingHeader(#[source] std::io::Error),

    #[error("Invalid path to container file. Path: '{}'", .1.display())]
    InvalidPath(#[source] std::io::Error, PathBuf),

    #[error("Failed to read container file. Path: '{}'", .1.display())]
    ReadFailed(#[source] std::io::Error, PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum UObjectError {
    #[error("Invalid phase provided: '{0}'")]
    InvalidPhase(String),

    #[error("Specified read phase without providing an identity")]
    MissingIdentity,

    #[error("UObject is already finalized")]
    AlreadyFinalized,

    #[error("UObject is not in the read phase")]
    NotInReadPhase,

    #[error("UObject is not in the write phase")]
    NotInWritePhase,

    #[error("UObject is not finalized")]
    NotFinalized,

    #[error("UObject failed during finalization and must be discarded")]
    Poisoned,

    #[error("Unsupported storage method: '{0}'")]
    UnsupportedStorage(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Container has no storage method attribute")]
    MissingStorageMethod,

    #[error("Container has no '{0}' section")]
    MissingSection(&'static str),

    #[error("Container section is missing the '{0}' attribute")]
    MissingAttr(&'static str),

    #[error("Stage received no container on port '{0}'")]
    MissingPort(String),

    #[error("Creating container failed. Path: '{}'", .1.display())]
    CreateFailed(#[source] std::io::Error, PathBuf),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Delimited text could not be processed")]
    Delimited(#[from] csv::Error),

    #[error("Invalid JSON in container attribute")]
    Json(#[from] serde_json::Error),
}

impl UObjectError {
    pub(crate) fn mismatch<S: Into<String>>(reason: S) -> UObjectError {
        UObjectError::SchemaMismatch(reason.into())
    }
}
