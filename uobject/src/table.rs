//! The canonical tabular representation every other representation converts through.

use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, UObjectError};

pub mod constants {
    pub const FIELD_INT: u8 = 0x00;
    pub const FIELD_FLOAT: u8 = 0x01;
    pub const FIELD_BOOL: u8 = 0x02;
    pub const FIELD_STR: u8 = 0x03;
}

use self::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Str,
}

impl FieldType {
    pub const fn id(self) -> u8 {
        match self {
            FieldType::Int => FIELD_INT,
            FieldType::Float => FIELD_FLOAT,
            FieldType::Bool => FIELD_BOOL,
            FieldType::Str => FIELD_STR,
        }
    }

    pub const fn from_id(id: u8) -> Option<FieldType> {
        match id {
            FIELD_INT => Some(FieldType::Int),
            FIELD_FLOAT => Some(FieldType::Float),
            FIELD_BOOL => Some(FieldType::Bool),
            FIELD_STR => Some(FieldType::Str),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Str => "str",
        };
        f.write_str(s)
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Scalar {
    #[inline(always)]
    pub fn field_type(&self) -> FieldType {
        match self {
            Scalar::Int(_) => FieldType::Int,
            Scalar::Float(_) => FieldType::Float,
            Scalar::Bool(_) => FieldType::Bool,
            Scalar::Str(_) => FieldType::Str,
        }
    }
}

/// The generic formatter used when rendering values as text.
///
/// Floats always keep a fractional part or an exponent so they read back as floats.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{:?}", v),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
}

impl Field {
    pub fn new<S: Into<String>>(name: S, ty: FieldType) -> Field {
        Field {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered field list. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Result<Schema> {
        let mut seen = HashSet::with_capacity(fields.len());
        if let Some(dup) = fields.iter().find(|f| !seen.insert(f.name.as_str())) {
            return Err(UObjectError::mismatch(format!(
                "duplicate field `{}`",
                dup.name
            )));
        }
        Ok(Schema { fields })
    }

    #[inline(always)]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// A sequence of uniformly-typed records. Row and field order are significant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    schema: Schema,
    rows: Vec<Vec<Scalar>>,
}

impl Table {
    pub fn new(schema: Schema) -> Table {
        Table {
            schema,
            rows: vec![],
        }
    }

    pub fn from_rows(schema: Schema, rows: Vec<Vec<Scalar>>) -> Result<Table> {
        let mut table = Table::new(schema);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Scalar>) -> Result<()> {
        let index = self.rows.len();

        if row.len() != self.schema.len() {
            return Err(UObjectError::mismatch(format!(
                "row {} has {} values, expected {}",
                index,
                row.len(),
                self.schema.len()
            )));
        }

        for (field, value) in self.schema.fields.iter().zip(row.iter()) {
            if value.field_type() != field.ty {
                return Err(UObjectError::mismatch(format!(
                    "row {}: field `{}` is {}, got {}",
                    index,
                    field.name,
                    field.ty,
                    value.field_type()
                )));
            }
        }

        self.rows.push(row);
        Ok(())
    }

    #[inline(always)]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline(always)]
    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    #[inline(always)]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline(always)]
    pub fn num_fields(&self) -> usize {
        self.schema.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Scalar>> {
        let index = self.schema.index_of(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Splits the table into the named columns, in the order given, and the remaining ones.
    pub fn select_columns(&self, names: &[&str]) -> Result<(Table, Table)> {
        let selected = names
            .iter()
            .map(|name| {
                self.schema
                    .index_of(name)
                    .ok_or_else(|| UObjectError::mismatch(format!("no field `{}`", name)))
            })
            .collect::<Result<Vec<_>>>()?;
        let complement = (0..self.schema.len())
            .filter(|i| !selected.contains(i))
            .collect::<Vec<_>>();

        Ok((self.project(&selected)?, self.project(&complement)?))
    }

    /// Places the columns of `other` after the columns of `self`.
    pub fn merge_columns(&self, other: &Table) -> Result<Table> {
        if self.num_rows() != other.num_rows() {
            return Err(UObjectError::mismatch(format!(
                "cannot merge {} rows with {} rows",
                self.num_rows(),
                other.num_rows()
            )));
        }

        let fields = self
            .schema
            .fields
            .iter()
            .chain(other.schema.fields.iter())
            .cloned()
            .collect();
        let schema = Schema::new(fields)?;

        let rows = self
            .rows
            .iter()
            .zip(other.rows.iter())
            .map(|(a, b)| a.iter().chain(b.iter()).cloned().collect())
            .collect();

        Ok(Table { schema, rows })
    }

    fn project(&self, indices: &[usize]) -> Result<Table> {
        let fields = indices
            .iter()
            .map(|&i| self.schema.fields[i].clone())
            .collect();
        let schema = Schema::new(fields)?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Table { schema, rows })
    }
}
