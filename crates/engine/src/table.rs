use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;

use crate::error::MergeError;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single typed cell. Empty fields load as `Null`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    /// Canonical text form: what the cell looks like in a delimited file.
    /// `Null` renders as the empty string, the null marker on disk.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

// Cells act as join keys, so equality must be total: floats compare by bit
// pattern and nulls equal each other (null keys group together, as in the
// tool this replaces). Values of different types never compare equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Bool(v) => v.hash(state),
            Value::Str(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
        }
    }
}

// ---------------------------------------------------------------------------
// Column + Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Ordered named columns, positionally aligned into rows.
///
/// Invariants: names are unique and every column has the same length.
/// Tables are value-like; pipeline stages return new tables rather than
/// mutating their inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, MergeError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(MergeError::DuplicateColumn(col.name.clone()));
            }
        }
        if let Some(first) = columns.first() {
            let rows = first.values.len();
            for col in &columns[1..] {
                if col.values.len() != rows {
                    return Err(MergeError::RaggedColumns {
                        column: col.name.clone(),
                        expected: rows,
                        actual: col.values.len(),
                    });
                }
            }
        }
        Ok(Table { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Names from `wanted` that are absent from this table, in order.
    pub fn missing_columns(&self, wanted: &[String]) -> Vec<String> {
        wanted
            .iter()
            .filter(|name| !self.has_column(name))
            .cloned()
            .collect()
    }

    /// Replace the named column's values, or append a new column.
    pub fn with_column(mut self, name: &str, values: Vec<Value>) -> Result<Self, MergeError> {
        if !self.columns.is_empty() && values.len() != self.n_rows() {
            return Err(MergeError::RaggedColumns {
                column: name.to_string(),
                expected: self.n_rows(),
                actual: values.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.values = values,
            None => self.columns.push(Column {
                name: name.to_string(),
                values,
            }),
        }
        Ok(self)
    }

    /// New table keeping only the given row indices, in the given order.
    pub fn filter_rows(&self, keep: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|col| Column {
                name: col.name.clone(),
                values: keep.iter().map(|&row| col.values[row].clone()).collect(),
            })
            .collect();
        Table { columns }
    }

    /// The key cells of one row, for the given column indices.
    pub fn key_tuple(&self, indices: &[usize], row: usize) -> Vec<Value> {
        indices
            .iter()
            .map(|&i| self.columns[i].values[row].clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
