//! The write-once, read-phase container.
//!
//! A [`UObject`] is created in the [`Phase::Write`] phase, populated by exactly one
//! `from_*` call, then read by exactly one `to_*` call per instance, either after
//! [`UObject::transition_to_read`] or by reopening its [`Identity`] in the
//! [`Phase::Read`] phase.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use uuid::Uuid;

use crate::{
    backend::{self, Backend, Persist, RelationalSource, TabularBackend, RELATIONAL},
    codec::{delimited, keymap, DelimitedOptions, KeyMap},
    config::ContainerConfig,
    error::{Result, UObjectError},
    file::{ContainerReader, ContainerWriter},
    storage::{StorageMethod, STORAGE_METHOD_ATTR},
    table::Table,
};

/// File extension of generated identities.
pub const EXTENSION: &str = "upsg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Write,
    Read,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Write => f.write_str("write"),
            Phase::Read => f.write_str("read"),
        }
    }
}

impl FromStr for Phase {
    type Err = UObjectError;

    fn from_str(src: &str) -> Result<Self> {
        if src.eq_ignore_ascii_case("write") {
            Ok(Phase::Write)
        } else if src.eq_ignore_ascii_case("read") {
            Ok(Phase::Read)
        } else {
            Err(UObjectError::InvalidPhase(src.to_string()))
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = UObjectError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Phase::Write),
            1 => Ok(Phase::Read),
            other => Err(UObjectError::InvalidPhase(other.to_string())),
        }
    }
}

/// The stable name of a container: the path of its file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(PathBuf);

impl Identity {
    pub fn new<P: Into<PathBuf>>(path: P) -> Identity {
        Identity(path.into())
    }

    /// A fresh, globally unique identity inside the configured directory.
    pub fn generate(config: &ContainerConfig) -> Identity {
        Identity(
            config
                .directory
                .join(format!("{}.{}", Uuid::new_v4(), EXTENSION)),
        )
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Anchors a relative identity to the configured directory, then to the working
    /// directory, so it can be published to stages running elsewhere.
    fn resolve(self, config: &ContainerConfig) -> Result<Identity> {
        let path = if self.0.is_absolute() {
            self.0
        } else {
            config.directory.join(self.0)
        };

        if path.is_absolute() {
            Ok(Identity(path))
        } else {
            Ok(Identity(std::env::current_dir()?.join(path)))
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for Identity {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for Identity {
    fn from(path: PathBuf) -> Self {
        Identity(path)
    }
}

impl From<&Path> for Identity {
    fn from(path: &Path) -> Self {
        Identity(path.to_path_buf())
    }
}

impl From<&str> for Identity {
    fn from(path: &str) -> Self {
        Identity(PathBuf::from(path))
    }
}

impl From<String> for Identity {
    fn from(path: String) -> Self {
        Identity(PathBuf::from(path))
    }
}

/// Each variant owns exactly the file handle it needs; leaving a variant drops it.
#[derive(Debug)]
enum State {
    Writing(ContainerWriter),
    Written,
    Reading(ContainerReader),
    Consumed,
    Failed(Phase),
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Writing(_) | State::Written => Phase::Write,
            State::Reading(_) | State::Consumed => Phase::Read,
            State::Failed(phase) => *phase,
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        match self {
            State::Writing(_) => Ok(()),
            State::Written => Err(UObjectError::AlreadyFinalized),
            State::Reading(_) | State::Consumed => Err(UObjectError::NotInWritePhase),
            State::Failed(_) => Err(UObjectError::Poisoned),
        }
    }

    fn ensure_readable(&self) -> Result<()> {
        match self {
            State::Reading(_) => Ok(()),
            State::Consumed => Err(UObjectError::AlreadyFinalized),
            State::Writing(_) | State::Written => Err(UObjectError::NotInReadPhase),
            State::Failed(_) => Err(UObjectError::Poisoned),
        }
    }
}

/// Opens `identity` and checks that a payload was persisted in it.
fn open_finalized(identity: &Identity) -> Result<ContainerReader> {
    let reader = ContainerReader::open(identity.path())?;
    let method = StorageMethod::from_attr(reader.file_attr(STORAGE_METHOD_ATTR))?;
    if !method.is_concrete() {
        return Err(UObjectError::NotFinalized);
    }
    Ok(reader)
}

/// A write-once table handed between pipeline stages.
#[derive(Debug)]
pub struct UObject {
    identity: Identity,
    config: ContainerConfig,
    state: State,
}

impl UObject {
    /// Creates a container with the default configuration.
    ///
    /// In the write phase a missing identity is generated. In the read phase the
    /// identity is mandatory and must name a finalized container.
    pub fn create(phase: Phase, identity: Option<Identity>) -> Result<UObject> {
        UObject::create_with_config(phase, identity, ContainerConfig::default())
    }

    pub fn create_with_config(
        phase: Phase,
        identity: Option<Identity>,
        config: ContainerConfig,
    ) -> Result<UObject> {
        let (identity, state) = match phase {
            Phase::Write => {
                let identity = identity
                    .unwrap_or_else(|| Identity::generate(&config))
                    .resolve(&config)?;

                let mut writer = ContainerWriter::create(identity.path())
                    .map_err(|e| UObjectError::CreateFailed(e, identity.0.clone()))?;
                writer.set_file_attr(
                    STORAGE_METHOD_ATTR,
                    StorageMethod::Incomplete.as_str().as_bytes().to_vec(),
                );
                writer.checkpoint()?;

                (identity, State::Writing(writer))
            }
            Phase::Read => {
                let identity = identity
                    .ok_or(UObjectError::MissingIdentity)?
                    .resolve(&config)?;
                let reader = open_finalized(&identity)?;
                (identity, State::Reading(reader))
            }
        };

        tracing::info!(%identity, %phase, "created container");

        Ok(UObject {
            identity,
            config,
            state,
        })
    }

    /// A write-phase container with a generated identity.
    pub fn writer() -> Result<UObject> {
        UObject::create(Phase::Write, None)
    }

    /// Reopens a finalized container in the read phase.
    pub fn open<I: Into<Identity>>(identity: I) -> Result<UObject> {
        UObject::create(Phase::Read, Some(identity.into()))
    }

    #[inline(always)]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The resolved identity, which is what a producer publishes.
    #[inline(always)]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[inline(always)]
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Whether the terminal operation of the current phase has completed.
    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::Written | State::Consumed)
    }

    /// Reopens a finalized write-phase container for reading. A no-op in the read phase.
    pub fn transition_to_read(&mut self) -> Result<()> {
        match self.state {
            State::Reading(_) | State::Consumed => Ok(()),
            State::Writing(_) => Err(UObjectError::NotFinalized),
            State::Failed(_) => Err(UObjectError::Poisoned),
            State::Written => {
                let reader = open_finalized(&self.identity)?;
                self.state = State::Reading(reader);
                tracing::info!(identity = %self.identity, "transitioned container to read phase");
                Ok(())
            }
        }
    }

    fn take_writer(&mut self) -> Result<ContainerWriter> {
        self.state.ensure_writable()?;
        match std::mem::replace(&mut self.state, State::Failed(Phase::Write)) {
            State::Writing(writer) => Ok(writer),
            _ => Err(UObjectError::Poisoned),
        }
    }

    fn take_reader(&mut self) -> Result<ContainerReader> {
        self.state.ensure_readable()?;
        match std::mem::replace(&mut self.state, State::Failed(Phase::Read)) {
            State::Reading(reader) => Ok(reader),
            _ => Err(UObjectError::Poisoned),
        }
    }

    /// Runs `encoder` against the open container file, records the storage method it
    /// returns and closes the file.
    ///
    /// This is the only way a payload gets into a container. If `encoder` or the
    /// final flush fails, the instance must be discarded.
    pub fn write<F>(&mut self, encoder: F) -> Result<StorageMethod>
    where
        F: FnOnce(&mut ContainerWriter) -> Result<StorageMethod>,
    {
        let mut writer = self.take_writer()?;

        let result = encoder(&mut writer).and_then(|method| {
            if !method.is_concrete() {
                return Err(UObjectError::UnsupportedStorage(method.to_string()));
            }
            writer.set_file_attr(STORAGE_METHOD_ATTR, method.as_str().as_bytes().to_vec());
            Ok(method)
        });

        let method = match result {
            Ok(method) => method,
            Err(error) => {
                if let Err(close_error) = writer.finish() {
                    tracing::warn!(%close_error, identity = %self.identity, "could not close failed container");
                }
                tracing::debug!(%error, identity = %self.identity, "write failed");
                return Err(error);
            }
        };

        let len = writer.finish()?;
        self.state = State::Written;

        tracing::info!(
            identity = %self.identity,
            storage_method = %method,
            bytes = len,
            "finalized container for write"
        );

        Ok(method)
    }

    /// Materializes the persisted payload through its backend, closes the file and
    /// hands the canonical table to `decoder`.
    ///
    /// This is the only way a payload gets out of a container instance.
    pub fn read<T, F>(&mut self, decoder: F) -> Result<T>
    where
        F: FnOnce(Table) -> Result<T>,
    {
        let reader = self.take_reader()?;

        let method = StorageMethod::from_attr(reader.file_attr(STORAGE_METHOD_ATTR))?;
        let backend = backend::descriptor(method).ok_or(UObjectError::NotFinalized)?;
        let table = backend.materialize(&reader);
        drop(reader);

        let value = decoder(table?)?;
        self.state = State::Consumed;

        tracing::info!(
            identity = %self.identity,
            storage_method = %method,
            "finalized container for read"
        );

        Ok(value)
    }

    /// Persists `table` as the canonical tabular payload.
    pub fn from_native_tabular(&mut self, table: &Table) -> Result<()> {
        let backend = TabularBackend::with_compression(self.config.compression);
        self.write(|writer| backend.persist(writer, table))?;
        Ok(())
    }

    /// Persists a sequence of records. Records must share one field set.
    pub fn from_key_mapping(&mut self, records: &[KeyMap]) -> Result<()> {
        self.state.ensure_writable()?;
        let table = keymap::decode(records)?;
        self.from_native_tabular(&table)
    }

    /// Persists the contents of the delimited text file at `path`.
    pub fn from_delimited_text<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.from_delimited_text_with(path, &DelimitedOptions::default())
    }

    pub fn from_delimited_text_with<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: &DelimitedOptions,
    ) -> Result<()> {
        self.state.ensure_writable()?;
        let table = delimited::read_path(path, options)?;
        self.from_native_tabular(&table)
    }

    /// Running `query` against a database is not supported; the container is left untouched.
    pub fn from_relational(
        &mut self,
        endpoint: &str,
        _params: &BTreeMap<String, String>,
        _query: &str,
    ) -> Result<()> {
        self.state.ensure_writable()?;
        tracing::debug!(identity = %self.identity, endpoint, "relational query requested");
        Err(UObjectError::NotImplemented("writing from a relational query"))
    }

    /// Persists a reference to an existing result table.
    pub fn from_relational_reference(&mut self, source: &RelationalSource) -> Result<()> {
        self.write(|writer| RELATIONAL.persist(writer, source))?;
        Ok(())
    }

    pub fn to_native_tabular(&mut self) -> Result<Table> {
        self.read(Ok)
    }

    pub fn to_key_mapping(&mut self) -> Result<Vec<KeyMap>> {
        self.read(|table| keymap::encode(&table))
    }

    /// Writes the payload as delimited text to `path` and returns the path.
    pub fn to_delimited_text<P: AsRef<Path>>(&mut self, path: P) -> Result<PathBuf> {
        self.to_delimited_text_with(path, &DelimitedOptions::default())
    }

    pub fn to_delimited_text_with<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: &DelimitedOptions,
    ) -> Result<PathBuf> {
        self.read(|table| delimited::write_path(&table, path, options))
    }

    /// Loading the payload into a database is not supported. The payload is still
    /// materialized through [`UObject::read`], so the instance ends up poisoned.
    pub fn to_relational(
        &mut self,
        endpoint: &str,
        _params: &BTreeMap<String, String>,
    ) -> Result<String> {
        tracing::debug!(identity = %self.identity, endpoint, "relational target requested");
        self.read(|_table| {
            Err(UObjectError::UnsupportedStorage(
                StorageMethod::Relational.to_string(),
            ))
        })
    }
}
