use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{MergeError, Side};
use crate::table::{Column, Table, Value};

/// Name of the per-row provenance column added when the indicator is
/// requested.
pub const INDICATOR_COLUMN: &str = "_merge";

// ---------------------------------------------------------------------------
// Join type + cardinality
// ---------------------------------------------------------------------------

/// Relational join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Outer => "outer",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinType {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "outer" => Ok(JoinType::Outer),
            _ => Err(MergeError::ConfigValidation(format!(
                "unknown join type '{s}' (expected inner, left, right, or outer)"
            ))),
        }
    }
}

/// Declared key-multiplicity contract, checked against the realized data
/// before any row is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one_to_one",
            Cardinality::OneToMany => "one_to_many",
            Cardinality::ManyToOne => "many_to_one",
            Cardinality::ManyToMany => "many_to_many",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cardinality {
    type Err = MergeError;

    /// Accepts the spelled tokens and the short `1:1` forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_to_one" | "1:1" => Ok(Cardinality::OneToOne),
            "one_to_many" | "1:m" => Ok(Cardinality::OneToMany),
            "many_to_one" | "m:1" => Ok(Cardinality::ManyToOne),
            "many_to_many" | "m:m" => Ok(Cardinality::ManyToMany),
            _ => Err(MergeError::ConfigValidation(format!(
                "unknown cardinality '{s}' (expected one_to_one, one_to_many, many_to_one, or many_to_many)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Which side(s) of the join produced a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Both,
    LeftOnly,
    RightOnly,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Both => "both",
            Provenance::LeftOnly => "left_only",
            Provenance::RightOnly => "right_only",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "both" => Some(Provenance::Both),
            "left_only" => Some(Provenance::LeftOnly),
            "right_only" => Some(Provenance::RightOnly),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Everything the join needs beyond the two tables.
///
/// Defaults: inner join, `_left`/`_right` suffixes, indicator on, no
/// cardinality check. `keys` has no default; the join fails on an empty
/// list.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub keys: Vec<String>,
    pub how: JoinType,
    pub validate: Option<Cardinality>,
    pub suffixes: (String, String),
    pub indicator: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            how: JoinType::Inner,
            validate: None,
            suffixes: ("_left".to_string(), "_right".to_string()),
            indicator: true,
        }
    }
}

impl MergeOptions {
    /// Default options joined on the given keys.
    pub fn on<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Hash-join two tables on a key tuple.
///
/// Key columns are unified and never suffixed; non-key columns present on
/// both sides get the side suffix. Inner and left joins order output by
/// the left table, right joins by the right table, and outer joins append
/// unmatched right rows after the left pass. Fails before any row work if
/// keys are missing or the cardinality contract is violated.
pub fn merge(left: &Table, right: &Table, options: &MergeOptions) -> Result<Table, MergeError> {
    if options.keys.is_empty() {
        return Err(MergeError::EmptyJoinKeys);
    }
    let missing_left = left.missing_columns(&options.keys);
    let missing_right = right.missing_columns(&options.keys);
    if !missing_left.is_empty() || !missing_right.is_empty() {
        return Err(MergeError::JoinKeysMissing {
            left: missing_left,
            right: missing_right,
        });
    }

    let left_key_idx: Vec<usize> = options
        .keys
        .iter()
        .filter_map(|k| left.column_index(k))
        .collect();
    let right_key_idx: Vec<usize> = options
        .keys
        .iter()
        .filter_map(|k| right.column_index(k))
        .collect();

    if let Some(expected) = options.validate {
        check_cardinality(left, &left_key_idx, right, &right_key_idx, expected)?;
    }

    // Index right rows per key tuple, preserving row order within a key.
    let mut right_index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for row in 0..right.n_rows() {
        right_index
            .entry(right.key_tuple(&right_key_idx, row))
            .or_default()
            .push(row);
    }

    // Output rows as (left row, right row) pairs; `None` marks the side
    // that contributed nothing.
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
    match options.how {
        JoinType::Inner | JoinType::Left | JoinType::Outer => {
            let mut right_matched = vec![false; right.n_rows()];
            for lrow in 0..left.n_rows() {
                match right_index.get(&left.key_tuple(&left_key_idx, lrow)) {
                    Some(rrows) => {
                        for &rrow in rrows {
                            right_matched[rrow] = true;
                            pairs.push((Some(lrow), Some(rrow)));
                        }
                    }
                    None => {
                        if options.how != JoinType::Inner {
                            pairs.push((Some(lrow), None));
                        }
                    }
                }
            }
            if options.how == JoinType::Outer {
                for (rrow, matched) in right_matched.iter().enumerate() {
                    if !matched {
                        pairs.push((None, Some(rrow)));
                    }
                }
            }
        }
        JoinType::Right => {
            // Mirror of the left join, ordered by the right table.
            let mut left_index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
            for row in 0..left.n_rows() {
                left_index
                    .entry(left.key_tuple(&left_key_idx, row))
                    .or_default()
                    .push(row);
            }
            for rrow in 0..right.n_rows() {
                match left_index.get(&right.key_tuple(&right_key_idx, rrow)) {
                    Some(lrows) => {
                        for &lrow in lrows {
                            pairs.push((Some(lrow), Some(rrow)));
                        }
                    }
                    None => pairs.push((None, Some(rrow))),
                }
            }
        }
    }

    build_output(left, right, &pairs, options)
}

/// First key tuple that appears more than once, scanning in row order so
/// the reported key is deterministic.
fn first_duplicate_key(table: &Table, key_idx: &[usize]) -> Option<Vec<Value>> {
    let mut seen: HashSet<Vec<Value>> = HashSet::new();
    for row in 0..table.n_rows() {
        let key = table.key_tuple(key_idx, row);
        if !seen.insert(key.clone()) {
            return Some(key);
        }
    }
    None
}

fn check_cardinality(
    left: &Table,
    left_key_idx: &[usize],
    right: &Table,
    right_key_idx: &[usize],
    expected: Cardinality,
) -> Result<(), MergeError> {
    let (check_left, check_right) = match expected {
        Cardinality::OneToOne => (true, true),
        Cardinality::OneToMany => (true, false),
        Cardinality::ManyToOne => (false, true),
        Cardinality::ManyToMany => (false, false),
    };
    if check_left {
        if let Some(key) = first_duplicate_key(left, left_key_idx) {
            return Err(MergeError::Cardinality {
                expected,
                side: Side::Left,
                key: format_key(&key),
            });
        }
    }
    if check_right {
        if let Some(key) = first_duplicate_key(right, right_key_idx) {
            return Err(MergeError::Cardinality {
                expected,
                side: Side::Right,
                key: format_key(&key),
            });
        }
    }
    Ok(())
}

fn format_key(key: &[Value]) -> String {
    let parts: Vec<String> = key.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

fn build_output(
    left: &Table,
    right: &Table,
    pairs: &[(Option<usize>, Option<usize>)],
    options: &MergeOptions,
) -> Result<Table, MergeError> {
    let key_set: HashSet<&str> = options.keys.iter().map(String::as_str).collect();
    let left_names: HashSet<&str> = left.columns().iter().map(|c| c.name.as_str()).collect();
    let right_names: HashSet<&str> = right.columns().iter().map(|c| c.name.as_str()).collect();
    let (left_suffix, right_suffix) = (&options.suffixes.0, &options.suffixes.1);

    let mut columns: Vec<Column> = Vec::with_capacity(left.n_cols() + right.n_cols() + 1);

    // Left columns first, keys staying at their left-side positions.
    for col in left.columns() {
        let is_key = key_set.contains(col.name.as_str());
        let name = if !is_key && right_names.contains(col.name.as_str()) {
            format!("{}{left_suffix}", col.name)
        } else {
            col.name.clone()
        };
        let values: Vec<Value> = if is_key {
            // Unified key: take the side that contributed the row.
            let right_col = right
                .column(&col.name)
                .map(|c| &c.values)
                .unwrap_or(&col.values);
            pairs
                .iter()
                .map(|(l, r)| match (l, r) {
                    (Some(lrow), _) => col.values[*lrow].clone(),
                    (None, Some(rrow)) => right_col[*rrow].clone(),
                    (None, None) => Value::Null,
                })
                .collect()
        } else {
            pairs
                .iter()
                .map(|(l, _)| match l {
                    Some(lrow) => col.values[*lrow].clone(),
                    None => Value::Null,
                })
                .collect()
        };
        columns.push(Column { name, values });
    }

    // Then right non-key columns.
    for col in right.columns() {
        if key_set.contains(col.name.as_str()) {
            continue;
        }
        let name = if left_names.contains(col.name.as_str()) {
            format!("{}{right_suffix}", col.name)
        } else {
            col.name.clone()
        };
        let values: Vec<Value> = pairs
            .iter()
            .map(|(_, r)| match r {
                Some(rrow) => col.values[*rrow].clone(),
                None => Value::Null,
            })
            .collect();
        columns.push(Column { name, values });
    }

    if options.indicator {
        let values: Vec<Value> = pairs
            .iter()
            .map(|(l, r)| {
                let tag = match (l, r) {
                    (Some(_), Some(_)) => Provenance::Both,
                    (Some(_), None) => Provenance::LeftOnly,
                    (None, _) => Provenance::RightOnly,
                };
                Value::Str(tag.as_str().to_string())
            })
            .collect();
        columns.push(Column {
            name: INDICATOR_COLUMN.to_string(),
            values,
        });
    }

    Table::from_columns(columns)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cols: &[(&str, Vec<Value>)]) -> Table {
        Table::from_columns(
            cols.iter()
                .map(|(name, values)| Column {
                    name: name.to_string(),
                    values: values.clone(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn ints(vals: &[i64]) -> Vec<Value> {
        vals.iter().map(|&v| Value::Int(v)).collect()
    }

    fn strs(vals: &[&str]) -> Vec<Value> {
        vals.iter().map(|&v| Value::Str(v.into())).collect()
    }

    fn customers() -> Table {
        table(&[
            ("id", ints(&[1, 2])),
            ("name", strs(&["A", "B"])),
        ])
    }

    fn orders() -> Table {
        table(&[
            ("id", ints(&[2, 3])),
            ("email", strs(&["b@x.com", "c@x.com"])),
        ])
    }

    fn on_id(how: JoinType) -> MergeOptions {
        MergeOptions {
            how,
            ..MergeOptions::on(["id"])
        }
    }

    fn indicator_tags(t: &Table) -> Vec<String> {
        t.column(INDICATOR_COLUMN)
            .unwrap()
            .values
            .iter()
            .map(|v| v.to_string())
            .collect()
    }

    #[test]
    fn inner_join_keeps_only_matches() {
        let out = merge(&customers(), &orders(), &on_id(JoinType::Inner)).unwrap();
        assert_eq!(out.n_rows(), 1);
        assert_eq!(out.column("id").unwrap().values, ints(&[2]));
        assert_eq!(indicator_tags(&out), vec!["both"]);
    }

    #[test]
    fn left_join_keeps_all_left_rows() {
        let out = merge(&customers(), &orders(), &on_id(JoinType::Left)).unwrap();
        assert_eq!(out.n_rows(), 2);
        assert_eq!(out.column("email").unwrap().values[0], Value::Null);
        assert_eq!(indicator_tags(&out), vec!["left_only", "both"]);
    }

    #[test]
    fn right_join_orders_by_right_table() {
        let out = merge(&customers(), &orders(), &on_id(JoinType::Right)).unwrap();
        assert_eq!(out.n_rows(), 2);
        assert_eq!(out.column("id").unwrap().values, ints(&[2, 3]));
        assert_eq!(out.column("name").unwrap().values[1], Value::Null);
        assert_eq!(indicator_tags(&out), vec!["both", "right_only"]);
    }

    #[test]
    fn outer_join_unions_both_sides() {
        let out = merge(&customers(), &orders(), &on_id(JoinType::Outer)).unwrap();
        assert_eq!(out.n_rows(), 3);
        assert_eq!(out.column("id").unwrap().values, ints(&[1, 2, 3]));
        assert_eq!(indicator_tags(&out), vec!["left_only", "both", "right_only"]);
    }

    #[test]
    fn overlapping_columns_get_suffixes() {
        let left = table(&[("id", ints(&[1])), ("city", strs(&["Oslo"]))]);
        let right = table(&[("id", ints(&[1])), ("city", strs(&["Bergen"]))]);
        let out = merge(&left, &right, &on_id(JoinType::Inner)).unwrap();
        let names: Vec<&str> = out.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "city_left", "city_right", "_merge"]);
    }

    #[test]
    fn key_columns_are_never_suffixed() {
        let out = merge(&customers(), &orders(), &on_id(JoinType::Outer)).unwrap();
        assert!(out.has_column("id"));
        assert!(!out.has_column("id_left"));
        assert!(!out.has_column("id_right"));
    }

    #[test]
    fn one_to_many_matches_fan_out() {
        let left = table(&[("id", ints(&[1]))]);
        let right = table(&[("id", ints(&[1, 1])), ("n", ints(&[10, 20]))]);
        let out = merge(&left, &right, &on_id(JoinType::Inner)).unwrap();
        assert_eq!(out.n_rows(), 2);
        assert_eq!(out.column("n").unwrap().values, ints(&[10, 20]));
    }

    #[test]
    fn missing_keys_fail_before_row_work() {
        let left = table(&[("id", ints(&[1]))]);
        let right = table(&[("key", ints(&[1]))]);
        let err = merge(&left, &right, &on_id(JoinType::Inner)).unwrap_err();
        match err {
            MergeError::JoinKeysMissing { left, right } => {
                assert!(left.is_empty());
                assert_eq!(right, vec!["id".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_keys_rejected() {
        let err = merge(&customers(), &orders(), &MergeOptions::default()).unwrap_err();
        assert!(matches!(err, MergeError::EmptyJoinKeys));
    }

    #[test]
    fn one_to_one_rejects_duplicate_right_keys() {
        let left = table(&[("id", ints(&[1, 2]))]);
        let right = table(&[("id", ints(&[1, 1]))]);
        let options = MergeOptions {
            validate: Some(Cardinality::OneToOne),
            ..on_id(JoinType::Inner)
        };
        let err = merge(&left, &right, &options).unwrap_err();
        match err {
            MergeError::Cardinality { side, .. } => assert_eq!(side, Side::Right),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn one_to_many_allows_right_duplicates() {
        let left = table(&[("id", ints(&[1, 2]))]);
        let right = table(&[("id", ints(&[1, 1]))]);
        let options = MergeOptions {
            validate: Some(Cardinality::OneToMany),
            ..on_id(JoinType::Inner)
        };
        assert!(merge(&left, &right, &options).is_ok());
    }

    #[test]
    fn many_to_one_rejects_duplicate_right_keys() {
        let left = table(&[("id", ints(&[1, 1]))]);
        let right = table(&[("id", ints(&[1, 1]))]);
        let options = MergeOptions {
            validate: Some(Cardinality::ManyToOne),
            ..on_id(JoinType::Inner)
        };
        let err = merge(&left, &right, &options).unwrap_err();
        assert!(err.to_string().contains("many_to_one"));
    }

    #[test]
    fn no_indicator_when_not_requested() {
        let options = MergeOptions {
            indicator: false,
            ..on_id(JoinType::Inner)
        };
        let out = merge(&customers(), &orders(), &options).unwrap();
        assert!(!out.has_column(INDICATOR_COLUMN));
    }

    #[test]
    fn multi_key_join() {
        let left = table(&[
            ("a", ints(&[1, 1])),
            ("b", strs(&["x", "y"])),
            ("v", ints(&[10, 20])),
        ]);
        let right = table(&[
            ("a", ints(&[1])),
            ("b", strs(&["y"])),
            ("w", ints(&[99])),
        ]);
        let options = MergeOptions::on(["a", "b"]);
        let out = merge(&left, &right, &options).unwrap();
        assert_eq!(out.n_rows(), 1);
        assert_eq!(out.column("v").unwrap().values, ints(&[20]));
    }

    #[test]
    fn null_keys_match_each_other() {
        let left = table(&[("id", vec![Value::Null]), ("v", ints(&[1]))]);
        let right = table(&[("id", vec![Value::Null]), ("w", ints(&[2]))]);
        let out = merge(&left, &right, &on_id(JoinType::Inner)).unwrap();
        assert_eq!(out.n_rows(), 1);
    }

    #[test]
    fn cardinality_tokens_parse_both_forms() {
        assert_eq!("one_to_one".parse::<Cardinality>().unwrap(), Cardinality::OneToOne);
        assert_eq!("1:1".parse::<Cardinality>().unwrap(), Cardinality::OneToOne);
        assert_eq!("m:1".parse::<Cardinality>().unwrap(), Cardinality::ManyToOne);
        assert!("one-to-one".parse::<Cardinality>().is_err());
    }
}
