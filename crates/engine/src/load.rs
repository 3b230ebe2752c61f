use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::diagnostics::Diagnostic;
use crate::error::MergeError;
use crate::normalize::{normalize_columns, NormalizeOptions};
use crate::table::{Column, Table, Value};

// ---------------------------------------------------------------------------
// Coercion targets
// ---------------------------------------------------------------------------

/// Coercion target for a loaded column. Dates are requested through the
/// separate parse-dates list, not a dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Int,
    Float,
    Bool,
    Str,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Int => "int",
            DType::Float => "float",
            DType::Bool => "bool",
            DType::Str => "str",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(DType::Int),
            "float" => Ok(DType::Float),
            "bool" => Ok(DType::Bool),
            "str" => Ok(DType::Str),
            _ => Err(MergeError::ConfigValidation(format!(
                "unknown dtype '{s}' (expected int, float, bool, or str)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How to turn CSV text into a normalized, typed table.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Field delimiter; `None` means comma. Callers that sniff pass the
    /// result here.
    pub delimiter: Option<u8>,
    /// Renames applied to original (pre-normalization) header names.
    pub rename: HashMap<String, String>,
    pub normalize: NormalizeOptions,
    /// Post-normalization column name to coercion target.
    pub dtypes: BTreeMap<String, DType>,
    /// Post-normalization columns to parse as dates.
    pub parse_dates: Vec<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse CSV text into a table: rename, normalize names, then apply the
/// requested coercions and date parses.
///
/// Coercion is per-column all-or-nothing: one uncastable value leaves the
/// whole column unchanged and adds a warning. Date parsing is per-value:
/// unparseable cells become null. Neither ever aborts the load; only a
/// structurally broken CSV does.
pub fn load_table(
    csv_text: &str,
    options: &LoadOptions,
) -> Result<(Table, Vec<Diagnostic>), MergeError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter.unwrap_or(b','))
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| MergeError::Csv(e.to_string()))?
        .iter()
        .map(|h| {
            options
                .rename
                .get(h)
                .cloned()
                .unwrap_or_else(|| h.to_string())
        })
        .collect();

    let mut columns: Vec<Column> = headers
        .into_iter()
        .map(|name| Column {
            name,
            values: Vec::new(),
        })
        .collect();

    for record in reader.records() {
        let record = record.map_err(|e| MergeError::Csv(e.to_string()))?;
        for (i, col) in columns.iter_mut().enumerate() {
            let field = record.get(i).unwrap_or("");
            col.values.push(if field.is_empty() {
                Value::Null
            } else {
                Value::Str(field.to_string())
            });
        }
    }

    let table = Table::from_columns(columns)?;
    let mut table = normalize_columns(&table, &options.normalize)?;
    let mut diagnostics = Vec::new();

    for (name, dtype) in &options.dtypes {
        // Hints naming absent columns are skipped, so one dtype map can
        // serve several similar files.
        let Some(col) = table.column(name) else { continue };
        match cast_values(&col.values, *dtype) {
            Ok(values) => table = table.with_column(name, values)?,
            Err(cause) => diagnostics.push(Diagnostic::warning(format!(
                "could not cast column '{name}' to {dtype}: {cause}"
            ))),
        }
    }

    for name in &options.parse_dates {
        let Some(col) = table.column(name) else { continue };
        if col
            .values
            .iter()
            .any(|v| !matches!(v, Value::Str(_) | Value::Null | Value::Date(_)))
        {
            diagnostics.push(Diagnostic::warning(format!(
                "could not parse dates for '{name}': column is not text"
            )));
            continue;
        }
        let mut failed = 0usize;
        let values: Vec<Value> = col
            .values
            .iter()
            .map(|value| match value {
                Value::Str(s) => match parse_date(s) {
                    Some(d) => Value::Date(d),
                    None => {
                        failed += 1;
                        Value::Null
                    }
                },
                other => other.clone(),
            })
            .collect();
        if failed > 0 {
            diagnostics.push(Diagnostic::info(format!(
                "column '{name}': {failed} unparseable date value(s) set to null"
            )));
        }
        table = table.with_column(name, values)?;
    }

    Ok((table, diagnostics))
}

// ---------------------------------------------------------------------------
// Casting
// ---------------------------------------------------------------------------

/// Cast every value or report the first failure. `Null` passes through
/// untyped.
fn cast_values(values: &[Value], dtype: DType) -> Result<Vec<Value>, String> {
    let mut out = Vec::with_capacity(values.len());
    for (row, value) in values.iter().enumerate() {
        match cast_value(value, dtype) {
            Some(v) => out.push(v),
            None => return Err(format!("row {row}: cannot cast '{value}' to {dtype}")),
        }
    }
    Ok(out)
}

fn cast_value(value: &Value, dtype: DType) -> Option<Value> {
    match (value, dtype) {
        (Value::Null, _) => Some(Value::Null),
        (v, DType::Str) => Some(Value::Str(v.to_string())),
        (Value::Int(v), DType::Int) => Some(Value::Int(*v)),
        (Value::Float(v), DType::Int) if v.fract() == 0.0 => Some(Value::Int(*v as i64)),
        (Value::Bool(v), DType::Int) => Some(Value::Int(i64::from(*v))),
        (Value::Str(s), DType::Int) => s.trim().parse::<i64>().ok().map(Value::Int),
        (Value::Int(v), DType::Float) => Some(Value::Float(*v as f64)),
        (Value::Float(v), DType::Float) => Some(Value::Float(*v)),
        (Value::Str(s), DType::Float) => s.trim().parse::<f64>().ok().map(Value::Float),
        (Value::Bool(v), DType::Bool) => Some(Value::Bool(*v)),
        (Value::Str(s), DType::Bool) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Try the supported date formats, then datetime formats (keeping only
/// the date part).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(d);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
