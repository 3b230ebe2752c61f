use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::diagnostics::Diagnostic;
use crate::error::MergeError;
use crate::table::{Table, Value};

/// Which occurrence survives when rows share a key tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepPolicy {
    First,
    Last,
}

impl Default for KeepPolicy {
    fn default() -> Self {
        Self::Last
    }
}

impl KeepPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeepPolicy::First => "first",
            KeepPolicy::Last => "last",
        }
    }
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeepPolicy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(KeepPolicy::First),
            "last" => Ok(KeepPolicy::Last),
            _ => Err(MergeError::ConfigValidation(format!(
                "unknown keep policy '{s}' (expected first or last)"
            ))),
        }
    }
}

/// Collapse rows sharing a key tuple to one row per key, keeping the
/// first or last occurrence by existing row order. Surviving rows keep
/// their original relative order. Removed-row counts come back as an
/// info diagnostic.
pub fn dedupe(
    table: &Table,
    keys: &[String],
    keep: KeepPolicy,
) -> Result<(Table, Vec<Diagnostic>), MergeError> {
    if keys.is_empty() {
        return Err(MergeError::EmptyJoinKeys);
    }
    let missing = table.missing_columns(keys);
    if !missing.is_empty() {
        return Err(MergeError::DedupeKeysMissing { columns: missing });
    }
    let indices: Vec<usize> = keys
        .iter()
        .filter_map(|k| table.column_index(k))
        .collect();

    let mut kept: HashMap<Vec<Value>, usize> = HashMap::new();
    for row in 0..table.n_rows() {
        let key = table.key_tuple(&indices, row);
        match keep {
            KeepPolicy::First => {
                kept.entry(key).or_insert(row);
            }
            KeepPolicy::Last => {
                kept.insert(key, row);
            }
        }
    }

    let mut rows: Vec<usize> = kept.into_values().collect();
    rows.sort_unstable();
    let removed = table.n_rows() - rows.len();

    let mut diagnostics = Vec::new();
    if removed > 0 {
        diagnostics.push(Diagnostic::info(format!(
            "removed {removed} duplicate row(s) on {keys:?}"
        )));
    }
    Ok((table.filter_rows(&rows), diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table(ids: &[i64], vals: &[&str]) -> Table {
        Table::from_columns(vec![
            Column {
                name: "id".into(),
                values: ids.iter().map(|&v| Value::Int(v)).collect(),
            },
            Column {
                name: "v".into(),
                values: vals.iter().map(|&v| Value::Str(v.into())).collect(),
            },
        ])
        .unwrap()
    }

    fn key() -> Vec<String> {
        vec!["id".to_string()]
    }

    #[test]
    fn keep_last_takes_later_row() {
        let (out, diagnostics) = dedupe(&table(&[1, 1], &["x", "y"]), &key(), KeepPolicy::Last).unwrap();
        assert_eq!(out.n_rows(), 1);
        assert_eq!(out.column("v").unwrap().values[0], Value::Str("y".into()));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("removed 1 duplicate"));
    }

    #[test]
    fn keep_first_takes_earlier_row() {
        let (out, _) = dedupe(&table(&[1, 1], &["x", "y"]), &key(), KeepPolicy::First).unwrap();
        assert_eq!(out.column("v").unwrap().values[0], Value::Str("x".into()));
    }

    #[test]
    fn preserves_row_order_of_survivors() {
        let (out, _) = dedupe(
            &table(&[3, 1, 3, 2], &["a", "b", "c", "d"]),
            &key(),
            KeepPolicy::Last,
        )
        .unwrap();
        assert_eq!(
            out.column("id").unwrap().values,
            vec![Value::Int(1), Value::Int(3), Value::Int(2)]
        );
    }

    #[test]
    fn idempotent() {
        let t = table(&[1, 1, 2], &["x", "y", "z"]);
        let (once, _) = dedupe(&t, &key(), KeepPolicy::Last).unwrap();
        let (twice, diagnostics) = dedupe(&once, &key(), KeepPolicy::Last).unwrap();
        assert_eq!(once, twice);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn missing_key_fails_fast() {
        let err = dedupe(&table(&[1], &["x"]), &["nope".to_string()], KeepPolicy::Last).unwrap_err();
        assert!(matches!(err, MergeError::DedupeKeysMissing { .. }));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn empty_keys_rejected() {
        let err = dedupe(&table(&[1], &["x"]), &[], KeepPolicy::Last).unwrap_err();
        assert!(matches!(err, MergeError::EmptyJoinKeys));
    }

    #[test]
    fn no_duplicates_emits_no_diagnostic() {
        let (_, diagnostics) = dedupe(&table(&[1, 2], &["x", "y"]), &key(), KeepPolicy::Last).unwrap();
        assert!(diagnostics.is_empty());
    }
}
