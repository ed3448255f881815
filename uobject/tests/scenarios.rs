use std::collections::BTreeMap;

use serde_json::{json, Value};
use tempfile::TempDir;
use uobject::{
    ContainerConfig, ContainerReader, Field, FieldType, Identity, KeyMap, OpenError, Phase,
    RelationalSource, Scalar, Schema, StorageMethod, Table, UObject, UObjectError,
    STORAGE_METHOD_ATTR,
};

fn records(value: Value) -> Vec<KeyMap> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => map,
                other => panic!("not an object: {}", other),
            })
            .collect(),
        other => panic!("not an array: {}", other),
    }
}

fn payload() -> Vec<KeyMap> {
    records(json!([{"a": 1, "b": "x"}, {"a": 2, "b": "y"}]))
}

struct Fixture {
    dir: TempDir,
    config: ContainerConfig,
}

impl Fixture {
    fn new() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = ContainerConfig::in_directory(dir.path());
        Fixture { dir, config }
    }

    fn writer(&self) -> UObject {
        UObject::create_with_config(Phase::Write, None, self.config.clone()).unwrap()
    }

    fn reader(&self, identity: &Identity) -> uobject::Result<UObject> {
        UObject::create_with_config(Phase::Read, Some(identity.clone()), self.config.clone())
    }

    fn written(&self) -> UObject {
        let mut container = self.writer();
        container.from_key_mapping(&payload()).unwrap();
        container
    }

    fn storage_method(&self, identity: &Identity) -> Vec<u8> {
        let reader = ContainerReader::open(identity).unwrap();
        reader.file_attr(STORAGE_METHOD_ATTR).unwrap().to_vec()
    }
}

fn relational_source() -> RelationalSource {
    let mut connection_params = BTreeMap::new();
    connection_params.insert("user".to_string(), "upsg".to_string());
    RelationalSource {
        endpoint_url: "postgresql://localhost/pipeline".to_string(),
        connection_params,
        table_reference: "results".to_string(),
    }
}

#[test]
fn native_tabular_after_transition() {
    let fixture = Fixture::new();
    let mut container = fixture.written();
    assert_eq!(container.phase(), Phase::Write);
    assert!(container.is_finalized());

    container.transition_to_read().unwrap();
    assert_eq!(container.phase(), Phase::Read);
    assert!(!container.is_finalized());

    let table = container.to_native_tabular().unwrap();
    assert!(container.is_finalized());
    assert_eq!(table.schema().names().collect::<Vec<_>>(), ["a", "b"]);
    assert_eq!(
        table.rows(),
        &[
            vec![Scalar::Int(1), Scalar::from("x")],
            vec![Scalar::Int(2), Scalar::from("y")],
        ]
    );
}

#[test]
fn delimited_text_header_is_quoted() {
    let fixture = Fixture::new();
    let mut container = fixture.written();
    container.transition_to_read().unwrap();

    let target = fixture.dir.path().join("out.csv");
    let written = container.to_delimited_text(&target).unwrap();

    assert_eq!(written, target);
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        "\"a\",\"b\"\n1,x\n2,y\n"
    );
}

#[test]
fn transition_before_write() {
    let fixture = Fixture::new();
    let mut container = fixture.writer();

    assert!(matches!(
        container.transition_to_read(),
        Err(UObjectError::NotFinalized)
    ));

    container.from_key_mapping(&payload()).unwrap();
    container.transition_to_read().unwrap();
}

#[test]
fn independent_readers() {
    let fixture = Fixture::new();
    let container = fixture.written();
    let identity = container.identity().clone();
    drop(container);

    let mut first = fixture.reader(&identity).unwrap();
    let mut second = fixture.reader(&identity).unwrap();

    let a = first.to_native_tabular().unwrap();
    let b = second.to_native_tabular().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.num_rows(), 2);
}

#[test]
fn generated_identity_lives_in_configured_directory() {
    let fixture = Fixture::new();
    let container = fixture.writer();

    let path = container.identity().path();
    assert!(path.starts_with(fixture.dir.path()));
    assert_eq!(path.extension().unwrap(), uobject::EXTENSION);
    assert_eq!(fixture.storage_method(container.identity()), b"INCOMPLETE");
}

#[test]
fn explicit_identity() {
    let fixture = Fixture::new();
    let identity = Identity::from("stage_1.upsg");

    let mut container =
        UObject::create_with_config(Phase::Write, Some(identity.clone()), fixture.config.clone())
            .unwrap();
    assert_eq!(
        container.identity().path(),
        fixture.dir.path().join("stage_1.upsg")
    );
    container.from_key_mapping(&payload()).unwrap();

    let mut reader = fixture.reader(&identity).unwrap();
    assert_eq!(reader.to_key_mapping().unwrap(), payload());
}

#[test]
fn create_never_overwrites() {
    let fixture = Fixture::new();
    let container = fixture.written();

    match UObject::create_with_config(
        Phase::Write,
        Some(container.identity().clone()),
        fixture.config.clone(),
    ) {
        Err(UObjectError::CreateFailed(_, path)) => assert_eq!(path, container.identity().path()),
        other => panic!("unexpected result: {:?}", other),
    }

    let mut reader = fixture.reader(container.identity()).unwrap();
    assert_eq!(reader.to_key_mapping().unwrap(), payload());
}

#[test]
fn second_write_fails() {
    let fixture = Fixture::new();
    let mut container = fixture.written();

    let other = records(json!([{"z": true}]));
    assert!(matches!(
        container.from_key_mapping(&other),
        Err(UObjectError::AlreadyFinalized)
    ));
    assert!(matches!(
        container.from_native_tabular(&Table::default()),
        Err(UObjectError::AlreadyFinalized)
    ));

    container.transition_to_read().unwrap();
    assert_eq!(container.to_key_mapping().unwrap(), payload());
}

#[test]
fn second_read_fails() {
    let fixture = Fixture::new();
    let mut container = fixture.written();
    container.transition_to_read().unwrap();

    container.to_native_tabular().unwrap();
    assert!(matches!(
        container.to_native_tabular(),
        Err(UObjectError::AlreadyFinalized)
    ));
    assert!(matches!(
        container.to_key_mapping(),
        Err(UObjectError::AlreadyFinalized)
    ));
}

#[test]
fn read_requires_identity() {
    assert!(matches!(
        UObject::create(Phase::Read, None),
        Err(UObjectError::MissingIdentity)
    ));
}

#[test]
fn invalid_phase() {
    assert!(matches!(
        "overwrite".parse::<Phase>(),
        Err(UObjectError::InvalidPhase(_))
    ));
    assert!(matches!(
        Phase::try_from(7u8),
        Err(UObjectError::InvalidPhase(_))
    ));
}

#[test]
fn wrong_phase() {
    let fixture = Fixture::new();
    let mut container = fixture.writer();
    assert!(matches!(
        container.to_native_tabular(),
        Err(UObjectError::NotInReadPhase)
    ));

    container.from_key_mapping(&payload()).unwrap();
    assert!(matches!(
        container.to_key_mapping(),
        Err(UObjectError::NotInReadPhase)
    ));

    container.transition_to_read().unwrap();
    assert!(matches!(
        container.from_key_mapping(&payload()),
        Err(UObjectError::NotInWritePhase)
    ));
}

#[test]
fn transition_in_read_phase_is_a_no_op() {
    let fixture = Fixture::new();
    let container = fixture.written();

    let mut reader = fixture.reader(container.identity()).unwrap();
    reader.transition_to_read().unwrap();
    reader.transition_to_read().unwrap();
    assert_eq!(reader.phase(), Phase::Read);
    assert!(!reader.is_finalized());
    reader.to_native_tabular().unwrap();
}

#[test]
fn open_unwritten_container() {
    let fixture = Fixture::new();
    let container = fixture.writer();

    assert!(matches!(
        fixture.reader(container.identity()),
        Err(UObjectError::NotFinalized)
    ));
}

#[test]
fn open_missing_container() {
    let fixture = Fixture::new();
    assert!(matches!(
        fixture.reader(&Identity::from("nothing.upsg")),
        Err(UObjectError::Open(OpenError::InvalidPath(_, _)))
    ));
}

#[test]
fn open_foreign_file() {
    let fixture = Fixture::new();
    let path = fixture.dir.path().join("plain.csv");
    std::fs::write(&path, "a,b\n1,x\n").unwrap();

    assert!(matches!(
        fixture.reader(&Identity::from(path)),
        Err(UObjectError::Open(OpenError::MissingHeader(_)))
    ));
}

#[test]
fn inconsistent_records_leave_container_writable() {
    let fixture = Fixture::new();
    let mut container = fixture.writer();

    let bad = records(json!([{"a": 1, "b": "x"}, {"a": 2}]));
    assert!(matches!(
        container.from_key_mapping(&bad),
        Err(UObjectError::SchemaMismatch(_))
    ));
    assert!(!container.is_finalized());
    assert_eq!(fixture.storage_method(container.identity()), b"INCOMPLETE");

    container.from_key_mapping(&payload()).unwrap();
    assert_eq!(fixture.storage_method(container.identity()), b"tabular");
}

#[test]
fn integer_beyond_i64_is_rejected() {
    let fixture = Fixture::new();
    let mut container = fixture.writer();

    let oversized = records(json!([{"a": 1}, {"a": u64::MAX}]));
    assert!(matches!(
        container.from_key_mapping(&oversized),
        Err(UObjectError::SchemaMismatch(_))
    ));
    assert_eq!(fixture.storage_method(container.identity()), b"INCOMPLETE");
}

#[test]
fn non_finite_float_has_no_key_mapping() {
    let fixture = Fixture::new();
    let schema = Schema::new(vec![Field::new("f", FieldType::Float)]).unwrap();
    let table = Table::from_rows(
        schema,
        vec![vec![Scalar::Float(1.5)], vec![Scalar::Float(f64::NAN)]],
    )
    .unwrap();

    let mut container = fixture.writer();
    container.from_native_tabular(&table).unwrap();
    let identity = container.identity().clone();
    container.transition_to_read().unwrap();

    assert!(matches!(
        container.to_key_mapping(),
        Err(UObjectError::SchemaMismatch(_))
    ));

    let mut other = fixture.reader(&identity).unwrap();
    let read = other.to_native_tabular().unwrap();
    assert!(matches!(read.rows()[1][0], Scalar::Float(f) if f.is_nan()));
}

#[test]
fn from_delimited_text() {
    let fixture = Fixture::new();
    let source = fixture.dir.path().join("in.csv");
    std::fs::write(&source, "a,b\n1,x\n2,y\n").unwrap();

    let mut container = fixture.writer();
    container.from_delimited_text(&source).unwrap();
    container.transition_to_read().unwrap();

    assert_eq!(container.to_key_mapping().unwrap(), payload());
}

#[test]
fn from_missing_delimited_text() {
    let fixture = Fixture::new();
    let mut container = fixture.writer();

    assert!(matches!(
        container.from_delimited_text(fixture.dir.path().join("missing.csv")),
        Err(UObjectError::Io(_))
    ));
    assert!(!container.is_finalized());
    container.from_key_mapping(&payload()).unwrap();
}

#[test]
fn from_relational_is_not_implemented() {
    let fixture = Fixture::new();
    let mut container = fixture.writer();

    assert!(matches!(
        container.from_relational("postgresql://localhost/db", &BTreeMap::new(), "SELECT 1"),
        Err(UObjectError::NotImplemented(_))
    ));
    assert!(!container.is_finalized());
    container.from_key_mapping(&payload()).unwrap();
}

#[test]
fn relational_write_reads_back_unsupported() {
    let fixture = Fixture::new();
    let mut container = fixture.writer();
    container
        .from_relational_reference(&relational_source())
        .unwrap();
    assert_eq!(fixture.storage_method(container.identity()), b"relational");

    let identity = container.identity().clone();
    container.transition_to_read().unwrap();
    match container.to_native_tabular() {
        Err(UObjectError::UnsupportedStorage(tag)) => assert_eq!(tag, "relational"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(matches!(
        container.to_native_tabular(),
        Err(UObjectError::Poisoned)
    ));

    let mut reader = fixture.reader(&identity).unwrap();
    assert!(matches!(
        reader.to_key_mapping(),
        Err(UObjectError::UnsupportedStorage(_))
    ));

    let persisted = ContainerReader::open(&identity).unwrap();
    assert_eq!(
        uobject::backend::RELATIONAL.describe(&persisted).unwrap(),
        relational_source()
    );
}

#[test]
fn to_relational_is_unsupported() {
    let fixture = Fixture::new();
    let mut container = fixture.written();

    assert!(matches!(
        container.to_relational("postgresql://localhost/db", &BTreeMap::new()),
        Err(UObjectError::NotInReadPhase)
    ));

    container.transition_to_read().unwrap();
    assert!(matches!(
        container.to_relational("postgresql://localhost/db", &BTreeMap::new()),
        Err(UObjectError::UnsupportedStorage(_))
    ));
    assert!(matches!(
        container.to_native_tabular(),
        Err(UObjectError::Poisoned)
    ));

    let mut other = fixture.reader(container.identity()).unwrap();
    assert_eq!(other.to_key_mapping().unwrap(), payload());
}

#[test]
fn failed_encoder_poisons_container() {
    let fixture = Fixture::new();
    let mut container = fixture.writer();

    let result = container.write(|_| Err(UObjectError::SchemaMismatch("encoder".to_string())));
    assert!(matches!(result, Err(UObjectError::SchemaMismatch(_))));
    assert!(matches!(
        container.from_key_mapping(&payload()),
        Err(UObjectError::Poisoned)
    ));
    assert!(matches!(
        container.transition_to_read(),
        Err(UObjectError::Poisoned)
    ));
    assert!(matches!(
        fixture.reader(container.identity()),
        Err(UObjectError::NotFinalized)
    ));
}

#[test]
fn encoder_must_choose_a_storage_method() {
    let fixture = Fixture::new();
    let mut container = fixture.writer();

    assert!(matches!(
        container.write(|_| Ok(StorageMethod::Incomplete)),
        Err(UObjectError::UnsupportedStorage(_))
    ));
    assert_eq!(fixture.storage_method(container.identity()), b"INCOMPLETE");
}

#[test]
fn compressed_payload() {
    let fixture = Fixture::new();
    let config = fixture
        .config
        .clone()
        .with_compression(uobject::Compression::Xz);

    let mut container = UObject::create_with_config(Phase::Write, None, config).unwrap();
    container.from_key_mapping(&payload()).unwrap();

    let persisted = ContainerReader::open(container.identity()).unwrap();
    assert_eq!(
        persisted.section("tabular").unwrap().compression(),
        uobject::Compression::Xz
    );

    let mut reader = fixture.reader(container.identity()).unwrap();
    assert_eq!(reader.to_key_mapping().unwrap(), payload());
}

#[test]
fn dropped_writer_stays_incomplete() {
    let fixture = Fixture::new();
    let identity = fixture.writer().identity().clone();

    assert_eq!(fixture.storage_method(&identity), b"INCOMPLETE");
    assert!(matches!(
        fixture.reader(&identity),
        Err(UObjectError::NotFinalized)
    ));
}
