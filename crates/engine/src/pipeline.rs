use serde::Serialize;

use crate::audit::{audit_counts, AuditSummary};
use crate::config::JobConfig;
use crate::dedupe::dedupe;
use crate::diagnostics::Diagnostic;
use crate::error::MergeError;
use crate::load::load_table;
use crate::merge::merge;
use crate::resolve::resolve_conflicts;
use crate::table::Table;

/// Version and timestamp attached to every run.
#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
}

/// Final table plus everything needed to explain it.
#[derive(Debug)]
pub struct JobOutcome {
    pub table: Table,
    pub summary: AuditSummary,
    pub diagnostics: Vec<Diagnostic>,
    pub meta: RunMeta,
}

/// Run a whole job over pre-read CSV text:
/// load both sides, optionally dedupe each, merge with the indicator on,
/// optionally resolve conflicts, then audit.
///
/// Component failures propagate unchanged; only load-time coercion and
/// date-parse problems are downgraded, and those arrive as diagnostics.
pub fn run(config: &JobConfig, left_csv: &str, right_csv: &str) -> Result<JobOutcome, MergeError> {
    config.validate()?;
    let mut diagnostics = Vec::new();

    let (mut left, d) = load_table(left_csv, &config.left.load_options())?;
    diagnostics.extend(d);
    let (mut right, d) = load_table(right_csv, &config.right.load_options())?;
    diagnostics.extend(d);

    if let Some(dd) = &config.left.dedupe {
        let (t, d) = dedupe(&left, &dd.keys, dd.keep)?;
        left = t;
        diagnostics.extend(d);
    }
    if let Some(dd) = &config.right.dedupe {
        let (t, d) = dedupe(&right, &dd.keys, dd.keep)?;
        right = t;
        diagnostics.extend(d);
    }

    let merged = merge(&left, &right, &config.merge_options())?;

    let rules = config.conflict_rules();
    let resolved = if rules.is_empty() {
        merged
    } else {
        resolve_conflicts(
            &merged,
            &rules,
            (&config.merge.suffixes.0, &config.merge.suffixes.1),
        )?
    };

    let summary = audit_counts(&resolved)?;

    Ok(JobOutcome {
        table: resolved,
        summary,
        diagnostics,
        meta: RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
    })
}
