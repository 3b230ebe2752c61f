// Plain-text audit report: counts plus small samples of the rows that
// failed to match.

use collate_engine::audit::AuditSummary;
use collate_engine::table::Table;

/// How many left-only/right-only rows a report shows per section.
pub const SAMPLE_SIZE: usize = 5;

/// Render the full report from the summary and the two provenance
/// subsets.
pub fn render_report(
    summary: &AuditSummary,
    left_only: &Table,
    right_only: &Table,
    sample_size: usize,
) -> String {
    let mut lines = Vec::new();
    lines.push("=== Merge Audit Report ===".to_string());
    lines.push(format!("Total rows in merged output: {}", summary.total_rows));
    lines.push(format!("Matched on both sides      : {}", summary.matched));
    lines.push(format!("Left-only rows             : {}", summary.left_only));
    lines.push(format!("Right-only rows            : {}", summary.right_only));
    lines.push(String::new());
    lines.extend(sample_section(left_only, "Examples of LEFT-ONLY rows", sample_size));
    lines.push(String::new());
    lines.extend(sample_section(right_only, "Examples of RIGHT-ONLY rows", sample_size));
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn sample_section(table: &Table, title: &str, sample_size: usize) -> Vec<String> {
    if table.n_rows() == 0 {
        return vec![format!("{title}: (none)")];
    }
    vec![
        format!("{title} (showing up to {sample_size}):"),
        render_table(table, sample_size),
    ]
}

/// Width-padded text table of the first `limit` rows, right-aligned the
/// way the report reads best for numeric data.
pub fn render_table(table: &Table, limit: usize) -> String {
    let rows = table.n_rows().min(limit);
    let mut widths: Vec<usize> = table.columns().iter().map(|c| c.name.len()).collect();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(rows);
    for row in 0..rows {
        let rendered: Vec<String> = table
            .columns()
            .iter()
            .map(|c| c.values[row].to_string())
            .collect();
        for (width, cell) in widths.iter_mut().zip(&rendered) {
            *width = (*width).max(cell.len());
        }
        cells.push(rendered);
    }

    let mut lines = Vec::with_capacity(rows + 1);
    lines.push(
        table
            .columns()
            .iter()
            .zip(widths.iter().copied())
            .map(|(c, width)| format!("{:>width$}", c.name))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for rendered in cells {
        lines.push(
            rendered
                .iter()
                .zip(widths.iter().copied())
                .map(|(cell, width)| format!("{cell:>width$}"))
                .collect::<Vec<_>>()
                .join("  "),
        );
    }
    lines.join("\n")
}
