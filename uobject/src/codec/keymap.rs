use serde_json::{Map, Number, Value};

use crate::{
    error::{Result, UObjectError},
    table::{Field, FieldType, Scalar, Schema, Table},
};

/// One record: field name to value, in insertion order.
pub type KeyMap = Map<String, Value>;

fn scalar(key: &str, value: &Value) -> Result<Scalar> {
    match value {
        Value::Bool(b) => Ok(Scalar::Bool(*b)),
        Value::String(s) => Ok(Scalar::Str(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Scalar::Int(i)),
            None if n.is_f64() => n
                .as_f64()
                .map(Scalar::Float)
                .ok_or_else(|| UObjectError::mismatch(format!("field `{}` is not a float", key))),
            None => Err(UObjectError::mismatch(format!(
                "field `{}`: integer {} does not fit i64",
                key, n
            ))),
        },
        Value::Null => Err(UObjectError::mismatch(format!("field `{}` is null", key))),
        Value::Array(_) | Value::Object(_) => Err(UObjectError::mismatch(format!(
            "field `{}` is not a scalar",
            key
        ))),
    }
}

fn value(key: &str, scalar: &Scalar) -> Result<Value> {
    Ok(match scalar {
        Scalar::Int(i) => Value::from(*i),
        Scalar::Float(f) => Number::from_f64(*f).map(Value::Number).ok_or_else(|| {
            UObjectError::mismatch(format!("field `{}`: {} has no JSON number", key, f))
        })?,
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Str(s) => Value::String(s.clone()),
    })
}

/// Builds the canonical table from a sequence of records.
///
/// The first record fixes the field order and types. Every later record must carry
/// exactly the same keys with values of the same type. Integers outside `i64` are rejected.
pub fn decode(records: &[KeyMap]) -> Result<Table> {
    let (first, rest) = match records.split_first() {
        Some(split) => split,
        None => return Ok(Table::default()),
    };

    let first_row = first
        .iter()
        .map(|(key, value)| scalar(key, value))
        .collect::<Result<Vec<_>>>()?;
    let schema = Schema::new(
        first
            .keys()
            .zip(first_row.iter())
            .map(|(key, value)| Field::new(key.as_str(), value.field_type()))
            .collect(),
    )?;

    let mut rows = Vec::with_capacity(records.len());
    rows.push(first_row);

    for (index, record) in rest.iter().enumerate() {
        let index = index + 1;
        if record.len() != schema.len() {
            return Err(UObjectError::mismatch(format!(
                "record {} has {} fields, expected {}",
                index,
                record.len(),
                schema.len()
            )));
        }

        let row = schema
            .fields()
            .iter()
            .map(|field| {
                let value = record.get(&field.name).ok_or_else(|| {
                    UObjectError::mismatch(format!(
                        "record {} is missing field `{}`",
                        index, field.name
                    ))
                })?;
                match (field.ty, scalar(&field.name, value)?) {
                    (ty, value) if ty == value.field_type() => Ok(value),
                    (ty, value) => Err(UObjectError::mismatch(format!(
                        "record {}: field `{}` is {}, got {}",
                        index,
                        field.name,
                        ty,
                        value.field_type()
                    ))),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    Table::from_rows(schema, rows)
}

/// One record per row, keys in field order. Fails on NaN and infinite floats.
pub fn encode(table: &Table) -> Result<Vec<KeyMap>> {
    let names = table.schema().names().collect::<Vec<_>>();
    table
        .rows()
        .iter()
        .map(|row| {
            names
                .iter()
                .zip(row.iter())
                .map(|(name, scalar)| Ok((name.to_string(), value(name, scalar)?)))
                .collect::<Result<KeyMap>>()
        })
        .collect()
}
