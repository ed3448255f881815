use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};

use crate::{
    error::Result,
    table::{Field, FieldType, Scalar, Schema, Table},
};

/// Options for reading and writing delimited text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedOptions {
    /// The field delimiter, a single byte.
    pub delimiter: u8,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        DelimitedOptions { delimiter: b',' }
    }
}

impl DelimitedOptions {
    pub fn with_delimiter(delimiter: u8) -> DelimitedOptions {
        DelimitedOptions { delimiter }
    }
}

fn quoted_header(table: &Table, delimiter: u8) -> Vec<u8> {
    let mut line = Vec::new();
    for (i, name) in table.schema().names().enumerate() {
        if i > 0 {
            line.push(delimiter);
        }
        line.push(b'"');
        line.extend_from_slice(name.replace('"', "\"\"").as_bytes());
        line.push(b'"');
    }
    line.push(b'\n');
    line
}

/// Writes `table` as delimited text: a quoted header line, then one line per row.
pub fn write<W: Write>(table: &Table, mut writer: W, options: &DelimitedOptions) -> Result<()> {
    writer.write_all(&quoted_header(table, options.delimiter))?;

    if table.schema().is_empty() {
        writer.flush()?;
        return Ok(());
    }

    let mut csv = WriterBuilder::new()
        .delimiter(options.delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(writer);

    for row in table.rows() {
        csv.write_record(row.iter().map(|value| value.to_string()))?;
    }
    csv.flush()?;

    Ok(())
}

/// Writes `table` to a new or truncated file at `path` and returns the path.
pub fn write_path<P: AsRef<Path>>(
    table: &Table,
    path: P,
    options: &DelimitedOptions,
) -> Result<PathBuf> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write(table, BufWriter::new(file), options)?;

    tracing::debug!(path = ?path, rows = table.num_rows(), "wrote delimited text");
    Ok(path.to_path_buf())
}

fn is_float(value: &str) -> bool {
    value.bytes().any(|b| b.is_ascii_digit()) && value.parse::<f64>().is_ok()
}

fn is_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
}

fn infer(records: &[StringRecord], column: usize) -> FieldType {
    let mut values = records.iter().filter_map(|r| r.get(column));

    if records.is_empty() {
        FieldType::Str
    } else if values.clone().all(|v| v.parse::<i64>().is_ok()) {
        FieldType::Int
    } else if values.clone().all(is_float) {
        FieldType::Float
    } else if values.all(is_bool) {
        FieldType::Bool
    } else {
        FieldType::Str
    }
}

fn parse(value: &str, ty: FieldType) -> Scalar {
    match ty {
        FieldType::Int => value.parse().map(Scalar::Int).unwrap_or_else(|_| value.into()),
        FieldType::Float => value
            .parse()
            .map(Scalar::Float)
            .unwrap_or_else(|_| value.into()),
        FieldType::Bool => Scalar::Bool(value.eq_ignore_ascii_case("true")),
        FieldType::Str => value.into(),
    }
}

/// Reads delimited text with a header line, inferring one type per column.
pub fn read<R: Read>(reader: R, options: &DelimitedOptions) -> Result<Table> {
    let mut csv = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let names = csv
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let records = csv.records().collect::<std::result::Result<Vec<_>, _>>()?;

    let fields = names
        .into_iter()
        .enumerate()
        .map(|(column, name)| Field::new(name, infer(&records, column)))
        .collect();
    let schema = Schema::new(fields)?;

    let rows = records
        .iter()
        .map(|record| {
            schema
                .fields()
                .iter()
                .zip(record.iter())
                .map(|(field, value)| parse(value, field.ty))
                .collect()
        })
        .collect();

    Table::from_rows(schema, rows)
}

/// Reads delimited text from the file at `path`.
pub fn read_path<P: AsRef<Path>>(path: P, options: &DelimitedOptions) -> Result<Table> {
    let path = path.as_ref();
    let table = read(BufReader::new(File::open(path)?), options)?;

    tracing::debug!(
        path = ?path,
        rows = table.num_rows(),
        fields = table.num_fields(),
        "read delimited text"
    );
    Ok(table)
}
