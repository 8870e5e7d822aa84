//! Serialising tables and publishing them locally and to the object store
//!
//! Each format is encoded once; the same bytes are written to
//! `{data_dir}/{subject}/{file}` and uploaded to `{prefix}/{subject}/{file}`.
//! The two writes are independent: a failed upload does not undo the local
//! file, and every outcome is reported back in a [`SinkReport`].

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use parquet::basic::{Compression, ConvertedType, LogicalType, Repetition, Type as PhysicalType};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field as ParquetField;
use parquet::schema::types::Type;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::pipeline::Artifact;
use crate::store::{BlobStore, Store};
use crate::table::{ColumnType, Field, Schema, Table, Value};
use crate::{DataError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Csv,
    /// Compact array of records
    Json,
    /// Array of records indented with four spaces
    JsonPretty,
    Parquet,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json | Format::JsonPretty => "json",
            Format::Parquet => "parquet",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Csv => "text/csv",
            Format::Json | Format::JsonPretty => "application/json",
            Format::Parquet => "application/vnd.apache.parquet",
        }
    }

    /// Guess the format of an object key from its extension.
    pub fn from_key(key: &str) -> Option<Format> {
        match key.rsplit('.').next()? {
            "csv" => Some(Format::Csv),
            "json" => Some(Format::Json),
            "parquet" => Some(Format::Parquet),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::JsonPretty => write!(f, "json (indented)"),
            other => write!(f, "{}", other.extension()),
        }
    }
}

pub fn encode(table: &Table, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Csv => encode_csv(table),
        Format::Json => Ok(serde_json::to_vec(&table.to_json_records())?),
        Format::JsonPretty => to_pretty_json(&table.to_json_records()),
        Format::Parquet => encode_parquet(table),
    }
}

/// Decode an artifact. CSV cells come back as text and JSON columns get
/// inferred types; callers conform the result to the schema they expect.
pub fn decode(bytes: Bytes, format: Format) -> Result<Table> {
    match format {
        Format::Csv => decode_csv(&bytes),
        Format::Json | Format::JsonPretty => decode_json(&bytes),
        Format::Parquet => decode_parquet(bytes),
    }
}

/// JSON with four-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

fn encode_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.schema().names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Value::render))?;
    }
    writer
        .into_inner()
        .map_err(|e| DataError::Io(e.into_error()))
}

fn decode_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let schema = Schema::new(
        headers
            .iter()
            .map(|h| Field::new(h.as_str(), ColumnType::Text))
            .collect(),
    );

    let mut table = Table::new(schema);
    for record in reader.records() {
        let record = record?;
        let row = (0..headers.len())
            .map(|i| match record.get(i) {
                Some(cell) if !cell.is_empty() => Value::Text(cell.to_string()),
                _ => Value::Null,
            })
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

type JsonObject = serde_json::Map<String, serde_json::Value>;

fn decode_json(bytes: &[u8]) -> Result<Table> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_start();

    // Older artifacts were written one record per line.
    let objects: Vec<JsonObject> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        let mut objects = Vec::new();
        for line in trimmed.lines().filter(|l| !l.trim().is_empty()) {
            objects.push(serde_json::from_str::<JsonObject>(line)?);
        }
        objects
    };

    let mut names: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for object in &objects {
        for key in object.keys() {
            if seen.insert(key.clone()) {
                names.push(key.clone());
            }
        }
    }

    let schema = Schema::new(
        names
            .iter()
            .map(|name| {
                let kind = infer_kind(objects.iter().filter_map(|o| o.get(name)));
                Field::new(name.as_str(), kind)
            })
            .collect(),
    );

    let mut table = Table::new(schema.clone());
    for object in &objects {
        let row = schema
            .fields()
            .iter()
            .map(|field| {
                object
                    .get(&field.name)
                    .and_then(|v| Value::from_json(v, field.kind))
                    .unwrap_or(Value::Null)
            })
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a serde_json::Value>) -> ColumnType {
    let mut kind: Option<ColumnType> = None;
    for value in values {
        let this = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::Bool(_) => ColumnType::Bool,
            serde_json::Value::Number(n) if n.is_i64() => ColumnType::Int,
            serde_json::Value::Number(_) => ColumnType::Float,
            _ => ColumnType::Text,
        };
        kind = Some(match (kind, this) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnType::Int), ColumnType::Float)
            | (Some(ColumnType::Float), ColumnType::Int) => ColumnType::Float,
            _ => ColumnType::Text,
        });
    }
    kind.unwrap_or(ColumnType::Text)
}

fn parquet_schema(schema: &Schema) -> Result<Arc<Type>> {
    let fields = schema
        .fields()
        .iter()
        .map(|field| {
            let builder = match field.kind {
                ColumnType::Int => Type::primitive_type_builder(&field.name, PhysicalType::INT64),
                ColumnType::Float => {
                    Type::primitive_type_builder(&field.name, PhysicalType::DOUBLE)
                }
                ColumnType::Bool => {
                    Type::primitive_type_builder(&field.name, PhysicalType::BOOLEAN)
                }
                ColumnType::Text => {
                    Type::primitive_type_builder(&field.name, PhysicalType::BYTE_ARRAY)
                        .with_converted_type(ConvertedType::UTF8)
                }
            };
            Ok(Arc::new(builder.with_repetition(Repetition::OPTIONAL).build()?))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Arc::new(
        Type::group_type_builder("schema")
            .with_fields(fields)
            .build()?,
    ))
}

fn encode_parquet(table: &Table) -> Result<Vec<u8>> {
    let schema = parquet_schema(table.schema())?;
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build(),
    );

    let mut buffer = Vec::new();
    let mut writer = SerializedFileWriter::new(&mut buffer, schema, props)?;
    let mut row_group = writer.next_row_group()?;
    let mut idx = 0;

    while let Some(mut column) = row_group.next_column()? {
        let field = &table.schema().fields()[idx];
        let cells = table.rows().iter().map(|row| &row[idx]);
        let mut def_levels = Vec::with_capacity(table.len());

        match field.kind {
            ColumnType::Int => {
                let mut values = Vec::new();
                for cell in cells {
                    push_present(&mut values, &mut def_levels, cell.as_i64());
                }
                column
                    .typed::<Int64Type>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            ColumnType::Float => {
                let mut values = Vec::new();
                for cell in cells {
                    push_present(&mut values, &mut def_levels, cell.as_f64());
                }
                column
                    .typed::<DoubleType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            ColumnType::Bool => {
                let mut values = Vec::new();
                for cell in cells {
                    push_present(&mut values, &mut def_levels, cell.as_bool());
                }
                column
                    .typed::<BoolType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            ColumnType::Text => {
                let mut values = Vec::new();
                for cell in cells {
                    let text = match cell {
                        Value::Null => None,
                        other => Some(ByteArray::from(other.render().as_str())),
                    };
                    push_present(&mut values, &mut def_levels, text);
                }
                column
                    .typed::<ByteArrayType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
        }

        column.close()?;
        idx += 1;
    }

    row_group.close()?;
    writer.close()?;
    Ok(buffer)
}

fn push_present<T>(values: &mut Vec<T>, def_levels: &mut Vec<i16>, value: Option<T>) {
    match value {
        Some(v) => {
            values.push(v);
            def_levels.push(1);
        }
        None => def_levels.push(0),
    }
}

fn column_kind(column: &Type) -> ColumnType {
    if !column.is_primitive() {
        return ColumnType::Text;
    }

    let info = column.get_basic_info();
    match info.logical_type() {
        Some(LogicalType::Date | LogicalType::Time { .. } | LogicalType::Timestamp { .. }) => {
            return ColumnType::Text
        }
        Some(LogicalType::Decimal { .. }) => return ColumnType::Float,
        _ => {}
    }
    match info.converted_type() {
        ConvertedType::DATE
        | ConvertedType::TIME_MILLIS
        | ConvertedType::TIME_MICROS
        | ConvertedType::TIMESTAMP_MILLIS
        | ConvertedType::TIMESTAMP_MICROS => return ColumnType::Text,
        ConvertedType::DECIMAL => return ColumnType::Float,
        _ => {}
    }

    match column.get_physical_type() {
        PhysicalType::BOOLEAN => ColumnType::Bool,
        PhysicalType::INT32 | PhysicalType::INT64 => ColumnType::Int,
        PhysicalType::FLOAT | PhysicalType::DOUBLE => ColumnType::Float,
        _ => ColumnType::Text,
    }
}

fn field_value(field: &ParquetField) -> Value {
    match field {
        ParquetField::Null => Value::Null,
        ParquetField::Bool(b) => Value::Bool(*b),
        ParquetField::Byte(i) => Value::Int(i64::from(*i)),
        ParquetField::Short(i) => Value::Int(i64::from(*i)),
        ParquetField::Int(i) => Value::Int(i64::from(*i)),
        ParquetField::Long(i) => Value::Int(*i),
        ParquetField::UByte(i) => Value::Int(i64::from(*i)),
        ParquetField::UShort(i) => Value::Int(i64::from(*i)),
        ParquetField::UInt(i) => Value::Int(i64::from(*i)),
        ParquetField::ULong(i) => i64::try_from(*i)
            .map(Value::Int)
            .unwrap_or(Value::Float(*i as f64)),
        ParquetField::Float(f) => Value::Float(f64::from(*f)),
        ParquetField::Double(f) => Value::Float(*f),
        ParquetField::Str(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

fn decode_parquet(bytes: Bytes) -> Result<Table> {
    let reader = SerializedFileReader::new(bytes)?;
    let root = reader.metadata().file_metadata().schema_descr().root_schema_ptr();
    let schema = Schema::new(
        root.get_fields()
            .iter()
            .map(|column| Field::new(column.name(), column_kind(column)))
            .collect(),
    );

    let mut table = Table::new(schema.clone());
    for row in reader.get_row_iter(None)? {
        let row = row?;
        let cells = row
            .get_column_iter()
            .zip(schema.fields())
            .map(|((_, value), field)| {
                let raw = field_value(value);
                raw.cast(field.kind).unwrap_or(raw)
            })
            .collect();
        table.push_row(cells)?;
    }
    Ok(table)
}

/// Outcome of writing one encoded artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkEntry {
    pub format: Format,
    pub local_path: PathBuf,
    pub key: String,
    pub bytes: usize,
    pub local_error: Option<String>,
    pub remote_error: Option<String>,
}

impl SinkEntry {
    pub fn is_complete(&self) -> bool {
        self.local_error.is_none() && self.remote_error.is_none()
    }

    pub fn written_anywhere(&self) -> bool {
        self.local_error.is_none() || self.remote_error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkReport {
    pub entries: Vec<SinkEntry>,
}

impl SinkReport {
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(SinkEntry::is_complete)
    }

    /// True when at least one copy of every format landed somewhere.
    pub fn any_written(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(SinkEntry::written_anywhere)
    }

    pub fn failures(&self) -> Vec<String> {
        let mut out = Vec::new();
        for entry in &self.entries {
            if let Some(e) = &entry.local_error {
                out.push(format!("{}: {}", entry.local_path.display(), e));
            }
            if let Some(e) = &entry.remote_error {
                out.push(format!("{}: {}", entry.key, e));
            }
        }
        out
    }

    pub fn extend(&mut self, other: SinkReport) {
        self.entries.extend(other.entries);
    }
}

/// Writes artifacts to the data directory and the configured store.
#[derive(Clone, Copy)]
pub struct Sink<'a> {
    config: &'a RunConfig,
    store: &'a Store,
}

impl<'a> Sink<'a> {
    pub fn new(config: &'a RunConfig, store: &'a Store) -> Self {
        Self { config, store }
    }

    /// Encode `table` in every format of `artifact` and write each copy.
    pub async fn publish(&self, table: &Table, artifact: &Artifact) -> SinkReport {
        let mut report = SinkReport::default();
        for &format in artifact.formats {
            let file_name = artifact.file_name(format);
            let entry = match encode(table, format) {
                Ok(bytes) => self.write(artifact.subject, &file_name, format, bytes).await,
                Err(e) => self.encode_failed(artifact.subject, &file_name, format, e),
            };
            report.entries.push(entry);
        }
        report
    }

    /// Publish a JSON document (not a table) as indented JSON.
    pub async fn publish_document<T: Serialize>(
        &self,
        value: &T,
        artifact: &Artifact,
    ) -> SinkReport {
        let file_name = artifact.file_name(Format::JsonPretty);
        let entry = match to_pretty_json(value) {
            Ok(bytes) => {
                self.write(artifact.subject, &file_name, Format::JsonPretty, bytes)
                    .await
            }
            Err(e) => self.encode_failed(artifact.subject, &file_name, Format::JsonPretty, e),
        };
        SinkReport {
            entries: vec![entry],
        }
    }

    async fn write(
        &self,
        subject: &str,
        file_name: &str,
        format: Format,
        bytes: Vec<u8>,
    ) -> SinkEntry {
        let local_path = self.config.local_path(subject, file_name);
        let key = self.config.object_key(subject, file_name);
        let size = bytes.len();
        let body = Bytes::from(bytes);

        let local_error = write_local(&local_path, &body).err().map(|e| {
            error!(path = %local_path.display(), error = %e, "local write failed");
            e.to_string()
        });

        let remote_error = self
            .store
            .put(&key, body, format.content_type())
            .await
            .err()
            .map(|e| {
                error!(key = %key, error = %e, "upload failed");
                e.to_string()
            });

        if local_error.is_none() && remote_error.is_none() {
            info!(key = %key, bytes = size, "published {}", format);
        }

        SinkEntry {
            format,
            local_path,
            key,
            bytes: size,
            local_error,
            remote_error,
        }
    }

    fn encode_failed(
        &self,
        subject: &str,
        file_name: &str,
        format: Format,
        e: DataError,
    ) -> SinkEntry {
        warn!(file_name, error = %e, "could not encode {}", format);
        let reason = format!("encode failed: {}", e);
        SinkEntry {
            format,
            local_path: self.config.local_path(subject, file_name),
            key: self.config.object_key(subject, file_name),
            bytes: 0,
            local_error: Some(reason.clone()),
            remote_error: Some(reason),
        }
    }
}

fn write_local(path: &std::path::Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, body)?;
    Ok(())
}
