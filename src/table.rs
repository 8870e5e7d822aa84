//! Tabular records with an explicit, typed schema.
//!
//! Every source declares the columns it produces through [`Record`]; the
//! record structs are validated against that schema once, when they become
//! a [`Table`]. Archives decoded from CSV/JSON/Parquet are brought into the
//! same shape with [`Table::conform`], which turns "column missing" into a
//! logged decision instead of a silent skip.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Number};
use tracing::warn;

use crate::error::{DataError, Result};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Bool,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Bool => "bool",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub kind: ColumnType,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Shorthand for the static schemas declared by record types.
    pub fn of(columns: &[(&str, ColumnType)]) -> Self {
        Self::new(
            columns
                .iter()
                .map(|(name, kind)| Field::new(*name, *kind))
                .collect(),
        )
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert to `kind`. `None` means the value cannot represent that type.
    pub fn cast(&self, kind: ColumnType) -> Option<Value> {
        match (self, kind) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Int(i), ColumnType::Int) => Some(Value::Int(*i)),
            (Value::Int(i), ColumnType::Float) => Some(Value::Float(*i as f64)),
            (Value::Int(i), ColumnType::Text) => Some(Value::Text(i.to_string())),
            (Value::Int(i), ColumnType::Bool) => match i {
                0 => Some(Value::Bool(false)),
                1 => Some(Value::Bool(true)),
                _ => None,
            },
            (Value::Float(f), ColumnType::Int) => {
                if f.is_finite() && f.fract() == 0.0 {
                    Some(Value::Int(*f as i64))
                } else {
                    None
                }
            }
            (Value::Float(f), ColumnType::Float) => Some(Value::Float(*f)),
            (Value::Float(f), ColumnType::Text) => Some(Value::Text(f.to_string())),
            (Value::Float(_), ColumnType::Bool) => None,
            (Value::Text(s), _) => Value::parse_as(s, kind),
            (Value::Bool(b), ColumnType::Bool) => Some(Value::Bool(*b)),
            (Value::Bool(b), ColumnType::Text) => Some(Value::Text(b.to_string())),
            (Value::Bool(b), ColumnType::Int) => Some(Value::Int(i64::from(*b))),
            (Value::Bool(_), ColumnType::Float) => None,
        }
    }

    /// Parse text as `kind`; empty text is null.
    pub fn parse_as(text: &str, kind: ColumnType) -> Option<Value> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Some(Value::Null);
        }
        match kind {
            ColumnType::Text => Some(Value::Text(text.to_string())),
            ColumnType::Int => {
                let cleaned = trimmed.replace(',', "");
                cleaned
                    .parse::<i64>()
                    .ok()
                    .map(Value::Int)
                    .or_else(|| Value::Float(cleaned.parse::<f64>().ok()?).cast(kind))
            }
            ColumnType::Float => trimmed
                .replace(',', "")
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float),
            ColumnType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }

    pub fn from_json(value: &serde_json::Value, kind: ColumnType) -> Option<Value> {
        let raw = match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64()?),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            _ => Value::Text(value.to_string()),
        };
        raw.cast(kind)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
        }
    }

    /// Text form used in CSV cells.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn key_part(&self) -> KeyPart {
        match self {
            Value::Null => KeyPart::Null,
            Value::Int(i) => KeyPart::Int(*i),
            Value::Float(f) => KeyPart::Float(f.to_bits()),
            Value::Text(s) => KeyPart::Text(s.clone()),
            Value::Bool(b) => KeyPart::Bool(*b),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Null => 3,
        }
    }

    /// Total order used for sorting: numbers numerically, text
    /// lexicographically, nulls after everything else.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (a @ (Value::Int(_) | Value::Float(_)), b @ (Value::Int(_) | Value::Float(_))) => {
                let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                a.total_cmp(&b)
            }
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Hashable projection of a cell, used for natural keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Int(i64),
    Float(u64),
    Text(String),
    Bool(bool),
}

/// A serializable record type with a declared schema.
pub trait Record: Serialize {
    fn schema() -> Schema;
}

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        let mut table = Self::new(schema);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Validate records against their declared schema and collect them.
    pub fn from_records<T: Record>(records: &[T]) -> Result<Self> {
        let schema = T::schema();
        let mut rows = Vec::with_capacity(records.len());

        for (idx, record) in records.iter().enumerate() {
            let json = serde_json::to_value(record)?;
            let object = json
                .as_object()
                .ok_or_else(|| DataError::schema(format!("record {} is not an object", idx)))?;

            let row = schema
                .fields()
                .iter()
                .map(|field| {
                    let raw = object.get(&field.name).ok_or_else(|| {
                        DataError::schema(format!(
                            "record {} has no '{}' column",
                            idx, field.name
                        ))
                    })?;
                    Value::from_json(raw, field.kind).ok_or_else(|| {
                        DataError::schema(format!(
                            "record {} column '{}' is not {}: {}",
                            idx, field.name, field.kind, raw
                        ))
                    })
                })
                .collect::<Result<Row>>()?;
            rows.push(row);
        }

        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(DataError::schema(format!(
                "row has {} cells, schema has {} columns",
                row.len(),
                self.schema.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn column_values(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.schema.index_of(column)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Hashable natural key of one row.
    pub fn key_of(&self, row: &[Value], key_columns: &[usize]) -> Vec<KeyPart> {
        key_columns.iter().map(|&i| row[i].key_part()).collect()
    }

    /// Resolve column names to indexes, failing on unknown names.
    pub fn indexes_of(&self, columns: &[&str]) -> Result<Vec<usize>> {
        columns
            .iter()
            .map(|name| {
                self.schema
                    .index_of(name)
                    .ok_or_else(|| DataError::schema(format!("unknown column '{}'", name)))
            })
            .collect()
    }

    /// Reshape to `target`: cast cells, null-fill missing columns, drop extras.
    pub fn conform(self, target: &Schema) -> Table {
        let mapping: Vec<Option<usize>> = target
            .fields()
            .iter()
            .map(|field| {
                let idx = self.schema.index_of(&field.name);
                if idx.is_none() && !self.rows.is_empty() {
                    warn!(column = %field.name, "column missing from source table, filling with nulls");
                }
                idx
            })
            .collect();

        let mut failed_casts: HashSet<&str> = HashSet::new();
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let conformed = target
                .fields()
                .iter()
                .zip(&mapping)
                .map(|(field, source)| match source {
                    Some(i) => row[*i].cast(field.kind).unwrap_or_else(|| {
                        failed_casts.insert(field.name.as_str());
                        Value::Null
                    }),
                    None => Value::Null,
                })
                .collect();
            rows.push(conformed);
        }

        for column in failed_casts {
            warn!(column, "values could not be cast to the target type, set to null");
        }

        Table {
            schema: target.clone(),
            rows,
        }
    }

    /// Stable sort on one column; nulls always sort last.
    pub fn sort_by(&mut self, column: &str, descending: bool) -> Result<()> {
        self.sort_by_columns(&[column], descending)
    }

    /// Stable lexicographic sort on several columns.
    pub fn sort_by_columns(&mut self, columns: &[&str], descending: bool) -> Result<()> {
        let idxs = self.indexes_of(columns)?;
        self.rows.sort_by(|a, b| {
            for &i in &idxs {
                let ord = match (a[i].is_null(), b[i].is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) if descending => b[i].compare(&a[i]),
                    (false, false) => a[i].compare(&b[i]),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(())
    }

    /// Keep rows whose `column` value satisfies `predicate`.
    pub fn filter<F>(self, column: &str, predicate: F) -> Result<Table>
    where
        F: Fn(&Value) -> bool,
    {
        let idx = self.indexes_of(&[column])?[0];
        let Table { schema, rows } = self;
        Ok(Table {
            schema,
            rows: rows.into_iter().filter(|r| predicate(&r[idx])).collect(),
        })
    }

    pub fn to_json_records(&self) -> Vec<Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.schema
                    .fields()
                    .iter()
                    .zip(row)
                    .map(|(field, value)| (field.name.clone(), value.to_json()))
                    .collect()
            })
            .collect()
    }

    /// Read the rows back as typed records.
    pub fn to_records<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.to_json_records()
            .into_iter()
            .map(|object| Ok(serde_json::from_value(serde_json::Value::Object(object))?))
            .collect()
    }
}
