use std::fmt;

use crate::merge::Cardinality;

/// Which input table an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum MergeError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad suffixes, empty dedupe keys, etc.).
    ConfigValidation(String),
    /// The join key list is empty.
    EmptyJoinKeys,
    /// Join keys absent from one or both sides, post-normalization.
    JoinKeysMissing {
        left: Vec<String>,
        right: Vec<String>,
    },
    /// Dedupe keys absent from the table.
    DedupeKeysMissing { columns: Vec<String> },
    /// Two distinct column names normalize to the same name.
    NameCollision {
        first: String,
        second: String,
        normalized: String,
    },
    /// Unknown conflict strategy token for a base column.
    UnknownStrategy { column: String, strategy: String },
    /// Realized key multiplicities violate the declared cardinality.
    Cardinality {
        expected: Cardinality,
        side: Side,
        key: String,
    },
    /// Audit requested on a table without the `_merge` indicator column.
    IndicatorMissing,
    /// Duplicate column name when constructing a table.
    DuplicateColumn(String),
    /// Column length disagrees with the table's row count.
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },
    /// Malformed CSV input.
    Csv(String),
    /// IO error (file read/write).
    Io(String),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::EmptyJoinKeys => write!(f, "join keys must not be empty"),
            Self::JoinKeysMissing { left, right } => {
                write!(f, "join keys missing (left: {left:?}, right: {right:?})")
            }
            Self::DedupeKeysMissing { columns } => {
                write!(f, "dedupe keys not found: {columns:?}")
            }
            Self::NameCollision {
                first,
                second,
                normalized,
            } => write!(
                f,
                "columns '{first}' and '{second}' both normalize to '{normalized}'"
            ),
            Self::UnknownStrategy { column, strategy } => write!(
                f,
                "unknown strategy '{strategy}' for column '{column}' (expected prefer_left, prefer_right, or coalesce)"
            ),
            Self::Cardinality {
                expected,
                side,
                key,
            } => write!(
                f,
                "{expected} validation failed: key {key} repeats on the {side} side"
            ),
            Self::IndicatorMissing => {
                write!(f, "no '_merge' column found; run the merge with the indicator enabled")
            }
            Self::DuplicateColumn(name) => write!(f, "duplicate column name '{name}'"),
            Self::RaggedColumns {
                column,
                expected,
                actual,
            } => write!(
                f,
                "column '{column}' has {actual} values, expected {expected}"
            ),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for MergeError {}
