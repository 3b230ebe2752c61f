use std::fmt;

use serde::Deserialize;

use crate::error::MergeError;
use crate::table::{Table, Value};

/// How to reconcile a pair of suffixed overlapping columns into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    PreferLeft,
    PreferRight,
    Coalesce,
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::PreferLeft => "prefer_left",
            ConflictStrategy::PreferRight => "prefer_right",
            ConflictStrategy::Coalesce => "coalesce",
        }
    }

    /// Parse a strategy token for `column`, naming both in the error.
    /// `left`/`right` are accepted as shorthands.
    pub fn parse(column: &str, token: &str) -> Result<Self, MergeError> {
        match token {
            "prefer_left" | "left" => Ok(ConflictStrategy::PreferLeft),
            "prefer_right" | "right" => Ok(ConflictStrategy::PreferRight),
            "coalesce" => Ok(ConflictStrategy::Coalesce),
            _ => Err(MergeError::UnknownStrategy {
                column: column.to_string(),
                strategy: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One base column and its resolution strategy.
#[derive(Debug, Clone)]
pub struct ConflictRule {
    pub column: String,
    pub strategy: ConflictStrategy,
}

impl ConflictRule {
    /// Parse a `column=strategy` pair, the command-line form.
    pub fn parse(input: &str) -> Result<Self, MergeError> {
        let (column, token) = input.split_once('=').ok_or_else(|| {
            MergeError::ConfigValidation(format!(
                "conflict rule '{input}' must look like column=strategy"
            ))
        })?;
        let column = column.trim();
        Ok(ConflictRule {
            column: column.to_string(),
            strategy: ConflictStrategy::parse(column, token.trim())?,
        })
    }
}

/// Derive one `<base>` column per rule whose `<base><left_suffix>` and
/// `<base><right_suffix>` source columns both exist; other rules are
/// skipped, so callers may pass a superset of possible conflicts. The
/// suffixed sources are kept.
///
/// Pure transformation: the input table is never mutated.
pub fn resolve_conflicts(
    table: &Table,
    rules: &[ConflictRule],
    suffixes: (&str, &str),
) -> Result<Table, MergeError> {
    let mut out = table.clone();
    for rule in rules {
        let left_name = format!("{}{}", rule.column, suffixes.0);
        let right_name = format!("{}{}", rule.column, suffixes.1);
        let (Some(left_col), Some(right_col)) = (table.column(&left_name), table.column(&right_name))
        else {
            continue;
        };
        let values: Vec<Value> = left_col
            .values
            .iter()
            .zip(&right_col.values)
            .map(|(l, r)| match rule.strategy {
                ConflictStrategy::PreferLeft => l.clone(),
                ConflictStrategy::PreferRight => r.clone(),
                ConflictStrategy::Coalesce => {
                    if l.is_null() {
                        r.clone()
                    } else {
                        l.clone()
                    }
                }
            })
            .collect();
        out = out.with_column(&rule.column, values)?;
    }
    Ok(out)
}
