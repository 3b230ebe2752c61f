use serde::Serialize;

use crate::error::MergeError;
use crate::merge::{Provenance, INDICATOR_COLUMN};
use crate::table::{Table, Value};

/// Row-provenance tally for one merge result. Derived, never stored:
/// recompute it whenever the table changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub matched: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub total_rows: usize,
}

/// Partition the `_merge` column into match counts. Values outside the
/// three known tags count toward no bucket.
pub fn audit_counts(table: &Table) -> Result<AuditSummary, MergeError> {
    let col = table
        .column(INDICATOR_COLUMN)
        .ok_or(MergeError::IndicatorMissing)?;
    let mut summary = AuditSummary {
        matched: 0,
        left_only: 0,
        right_only: 0,
        total_rows: table.n_rows(),
    };
    for value in &col.values {
        if let Value::Str(tag) = value {
            match Provenance::parse(tag) {
                Some(Provenance::Both) => summary.matched += 1,
                Some(Provenance::LeftOnly) => summary.left_only += 1,
                Some(Provenance::RightOnly) => summary.right_only += 1,
                None => {}
            }
        }
    }
    Ok(summary)
}

/// Rows from one provenance class, in table order. This is what report
/// writers sample from.
pub fn provenance_rows(table: &Table, tag: Provenance) -> Result<Table, MergeError> {
    let col = table
        .column(INDICATOR_COLUMN)
        .ok_or(MergeError::IndicatorMissing)?;
    let keep: Vec<usize> = col
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| matches!(v, Value::Str(s) if s == tag.as_str()))
        .map(|(i, _)| i)
        .collect();
    Ok(table.filter_rows(&keep))
}
