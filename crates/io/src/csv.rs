// CSV import/export for the merge pipeline

use std::io::Read;
use std::path::Path;

use collate_engine::diagnostics::Diagnostic;
use collate_engine::error::MergeError;
use collate_engine::load::{load_table, LoadOptions};
use collate_engine::table::Table;

/// Read a file and convert to UTF-8 if needed (handles Windows-1252,
/// common for Excel-exported CSVs).
pub fn read_file_as_utf8(path: &Path) -> Result<String, MergeError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| MergeError::Io(format!("cannot read {}: {e}", path.display())))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| MergeError::Io(format!("cannot read {}: {e}", path.display())))?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across
/// the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per
/// line. The delimiter producing the most consistent field count
/// (>1 field) wins; higher field counts break ties.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Load one side of a merge: read the file, sniff the delimiter unless
/// the options pin one, then hand the text to the engine loader.
pub fn read_table(path: &Path, options: &LoadOptions) -> Result<(Table, Vec<Diagnostic>), MergeError> {
    let content = read_file_as_utf8(path)?;
    let mut options = options.clone();
    if options.delimiter.is_none() {
        options.delimiter = Some(sniff_delimiter(&content));
    }
    load_table(&content, &options)
}

/// Serialize a table to delimited text. `Null` becomes an empty field,
/// so nulls survive a round trip.
pub fn write_string(table: &Table, delimiter: u8) -> Result<String, MergeError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer
        .write_record(table.columns().iter().map(|c| c.name.as_str()))
        .map_err(|e| MergeError::Csv(e.to_string()))?;
    for row in 0..table.n_rows() {
        writer
            .write_record(table.columns().iter().map(|c| c.values[row].to_string()))
            .map_err(|e| MergeError::Csv(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| MergeError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| MergeError::Csv(e.to_string()))
}

/// Write a table to disk in delimited form.
pub fn write_csv(table: &Table, path: &Path, delimiter: u8) -> Result<(), MergeError> {
    let content = write_string(table, delimiter)?;
    std::fs::write(path, content)
        .map_err(|e| MergeError::Io(format!("cannot write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use collate_engine::table::Value;

    #[test]
    fn sniff_comma() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
    }

    #[test]
    fn sniff_semicolon() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n1;2;3\n"), b';');
    }

    #[test]
    fn sniff_tab() {
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), b'\t');
    }

    #[test]
    fn sniff_defaults_to_comma_for_single_column() {
        assert_eq!(sniff_delimiter("header\nvalue\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn read_table_sniffs_when_no_delimiter_configured() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "id;name\n1;Ada\n").unwrap();
        let (table, _) = read_table(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.column("name").unwrap().values[0], Value::Str("Ada".into()));
    }

    #[test]
    fn missing_file_is_a_clear_io_error() {
        let err = read_table(Path::new("/no/such/file.csv"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, MergeError::Io(_)));
        assert!(err.to_string().contains("/no/such/file.csv"));
    }

    #[test]
    fn windows_1252_falls_back_cleanly() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // "café" with a Windows-1252 e-acute (0xE9), invalid as UTF-8
        file.write_all(b"name\ncaf\xe9\n").unwrap();
        let content = read_file_as_utf8(file.path()).unwrap();
        assert!(content.contains("café"));
    }

    #[test]
    fn nulls_survive_a_round_trip() {
        let csv_text = "id,city\n1,\n2,Oslo\n";
        let (table, _) = load_table(csv_text, &LoadOptions::default()).unwrap();
        assert_eq!(table.column("city").unwrap().values[0], Value::Null);
        let written = write_string(&table, b',').unwrap();
        assert_eq!(written, csv_text);
    }

    #[test]
    fn write_csv_then_read_back() {
        let (table, _) = load_table("id,v\n1,a\n2,\n", &LoadOptions::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&table, &path, b',').unwrap();
        let (back, _) = read_table(&path, &LoadOptions::default()).unwrap();
        assert_eq!(back, table);
    }
}
