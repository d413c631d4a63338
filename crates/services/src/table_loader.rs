//! CSV/TSV loader for the file upload path.
//!
//! Every cell is kept as a string, exactly as written; type inference is the
//! engine's job. Rows shorter than the header simply lack the trailing keys.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use shared::dataset::{Dataset, DatasetSource, Row};

/// Files above this size are rejected before parsing (10 MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Load a CSV (or `.tsv`) file as a dataset named after the file.
pub fn load_csv(path: &Path) -> Result<Dataset> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("cannot read {}", path.display()))?
        .len();
    if size > MAX_FILE_SIZE {
        bail!(
            "{} is too large ({} bytes); the limit is {} MB",
            path.display(),
            size,
            MAX_FILE_SIZE / (1024 * 1024)
        );
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let delimiter = if path.extension().map(|e| e == "tsv").unwrap_or(false) {
        b'\t'
    } else {
        b','
    };

    let reader = BufReader::new(File::open(path)?);
    let dataset = read_table(&name, reader, delimiter)?;
    tracing::info!(dataset_id = %name, rows = dataset.row_count(), "file loaded");
    Ok(dataset)
}

/// Load CSV text that is already in memory.
pub fn load_csv_str(name: &str, content: &str) -> Result<Dataset> {
    read_table(name, content.as_bytes(), b',')
}

fn read_table<R: Read>(name: &str, reader: R, delimiter: u8) -> Result<Dataset> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .with_context(|| format!("{name}: missing header row"))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result.with_context(|| format!("{name}: malformed record"))?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), Value::String(v.to_string())))
            .collect();
        rows.push(row);
    }

    Ok(Dataset::new(name, name, DatasetSource::File, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_load_keeps_strings_and_header_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "city,amt,note").unwrap();
        writeln!(file, "X,10,").unwrap();
        writeln!(file, "Y,20,late").unwrap();

        let ds = load_csv(&path).unwrap();
        assert_eq!(ds.id(), "sales.csv");
        assert_eq!(ds.name(), "sales.csv");
        assert_eq!(ds.source(), DatasetSource::File);
        assert_eq!(ds.columns(), &["city", "amt", "note"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.rows()[0]["amt"], json!("10"));
        assert_eq!(ds.rows()[0]["note"], json!(""));
    }

    #[test]
    fn test_tsv_and_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tsv");
        std::fs::write(&path, "a\tb\n1\t2\n3\n").unwrap();

        let ds = load_csv(&path).unwrap();
        assert_eq!(ds.rows()[0]["b"], json!("2"));
        assert!(ds.rows()[1].get("b").is_none());
    }

    #[test]
    fn test_header_only_file_has_no_columns() {
        let ds = load_csv_str("empty.csv", "a,b\n").unwrap();
        assert_eq!(ds.row_count(), 0);
        assert!(ds.columns().is_empty());
    }

    #[test]
    fn test_oversized_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(MAX_FILE_SIZE + 1).unwrap();

        let err = load_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_csv(Path::new("/nonexistent/data.csv")).is_err());
    }
}
