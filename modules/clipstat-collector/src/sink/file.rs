use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use clipstat_common::Table;

use crate::traits::ResultSink;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes tables as CSV files under one output directory.
pub struct CsvSink {
    output_dir: PathBuf,
    bom: bool,
}

impl CsvSink {
    /// `bom` prefixes each file with a UTF-8 byte-order mark so spreadsheet
    /// apps open non-ASCII headers and names correctly.
    pub fn new(output_dir: impl Into<PathBuf>, bom: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            bom,
        }
    }
}

#[async_trait]
impl ResultSink for CsvSink {
    async fn save(&self, table: &Table, destination: &str) -> Result<String> {
        if table.is_empty() {
            return Ok(String::new());
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;

        let path = self.output_dir.join(destination);
        let bytes = encode(table, self.bom)?;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), rows = table.len(), "Data saved");
        Ok(path.display().to_string())
    }
}

fn encode(table: &Table, bom: bool) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if bom {
        buf.extend_from_slice(UTF8_BOM);
    }

    let mut writer = csv::WriterBuilder::new().flexible(false).from_writer(buf);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.into_inner().context("Failed to flush CSV buffer")
}

/// Load a CSV written by [`CsvSink`] (or any headered CSV) back into a table.
/// A leading byte-order mark is ignored.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(body);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed row in {}", path.display()))?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }
    Ok(Table::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["STT".into(), "Người Đăng".into()],
            vec![
                vec!["1".into(), "Phương, \"Abby\"".into()],
                vec!["2".into(), "Trần Thị Ngọc".into()],
            ],
        )
    }

    #[test]
    fn bom_is_written_only_when_asked() {
        assert!(encode(&table(), true).unwrap().starts_with(UTF8_BOM));
        assert!(!encode(&table(), false).unwrap().starts_with(UTF8_BOM));
    }

    #[tokio::test]
    async fn empty_table_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let sink = CsvSink::new(&out, true);

        let location = sink
            .save(&Table::new(vec!["a".into()], vec![]), "x.csv")
            .await
            .unwrap();

        assert_eq!(location, "");
        assert!(!out.exists(), "no directory or file should be created");
    }

    #[tokio::test]
    async fn round_trips_rows_and_non_ascii_text() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("nested/out"), true);

        let location = sink.save(&table(), "formatted.csv").await.unwrap();
        assert!(Path::new(&location).exists());

        let back = read_csv(&location).unwrap();
        assert_eq!(back, table());
    }
}
