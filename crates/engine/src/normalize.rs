use std::collections::HashMap;

use crate::error::MergeError;
use crate::table::{Column, Table};

/// Column-name cleanup switches. All default to on, so joins are
/// insensitive to casing and stray whitespace between sources.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub trim: bool,
    pub lowercase: bool,
    pub spaces_to_underscores: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            trim: true,
            lowercase: true,
            spaces_to_underscores: true,
        }
    }
}

/// Apply the switches to one name.
pub fn normalize_name(name: &str, options: &NormalizeOptions) -> String {
    let mut out = name.to_string();
    if options.trim {
        out = out.trim().to_string();
    }
    if options.lowercase {
        out = out.to_lowercase();
    }
    if options.spaces_to_underscores {
        out = out.replace(' ', "_");
    }
    out
}

/// Rename every column per the switches. Row data is untouched, and
/// applying this twice is a no-op the second time.
///
/// Two distinct names collapsing to the same normalized name is an
/// error naming both originals, never a silent overwrite.
pub fn normalize_columns(table: &Table, options: &NormalizeOptions) -> Result<Table, MergeError> {
    // normalized name -> original name, for collision reporting
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut columns = Vec::with_capacity(table.n_cols());
    for col in table.columns() {
        let name = normalize_name(&col.name, options);
        if let Some(first) = seen.get(&name) {
            return Err(MergeError::NameCollision {
                first: first.clone(),
                second: col.name.clone(),
                normalized: name,
            });
        }
        seen.insert(name.clone(), col.name.clone());
        columns.push(Column {
            name,
            values: col.values.clone(),
        });
    }
    Table::from_columns(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn table_with(names: &[&str]) -> Table {
        Table::from_columns(
            names
                .iter()
                .map(|n| Column {
                    name: n.to_string(),
                    values: vec![Value::Int(1)],
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn normalizes_case_space_and_whitespace() {
        let table = table_with(&[" Customer Id ", "EMAIL"]);
        let out = normalize_columns(&table, &NormalizeOptions::default()).unwrap();
        let names: Vec<&str> = out.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["customer_id", "email"]);
    }

    #[test]
    fn idempotent() {
        let table = table_with(&[" Customer Id ", "Signup Date"]);
        let options = NormalizeOptions::default();
        let once = normalize_columns(&table, &options).unwrap();
        let twice = normalize_columns(&once, &options).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn switches_are_independent() {
        let options = NormalizeOptions {
            trim: false,
            lowercase: true,
            spaces_to_underscores: false,
        };
        assert_eq!(normalize_name(" A B ", &options), " a b ");
    }

    #[test]
    fn collision_fails_fast() {
        let table = table_with(&["City", "city "]);
        let err = normalize_columns(&table, &NormalizeOptions::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("City"), "{msg}");
        assert!(msg.contains("city "), "{msg}");
        assert!(msg.contains("'city'"), "{msg}");
    }

    #[test]
    fn data_is_untouched() {
        let table = Table::from_columns(vec![Column {
            name: "Amount Due".into(),
            values: vec![Value::Float(1.5), Value::Null],
        }])
        .unwrap();
        let out = normalize_columns(&table, &NormalizeOptions::default()).unwrap();
        assert_eq!(
            out.column("amount_due").unwrap().values,
            vec![Value::Float(1.5), Value::Null]
        );
    }
}
