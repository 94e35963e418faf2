use crate::database::models::AnalysisRow;
use crate::utils::pad_stock_code;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// CSV file holding analysis rows of every synced instrument
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn has_rows(&self) -> bool {
        fs::metadata(&self.path).map(|m| m.len() > 0).unwrap_or(false)
    }

    /// All stored rows; a store that does not exist yet is empty
    pub fn read_all(&self) -> Result<Vec<AnalysisRow>> {
        if !self.has_rows() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut rows = Vec::new();
        for row in reader.deserialize::<AnalysisRow>() {
            let mut row: AnalysisRow =
                row.with_context(|| format!("Malformed row in {}", self.path.display()))?;
            row.stock_code = pad_stock_code(&row.stock_code);
            rows.push(row);
        }

        debug!(path = %self.path.display(), rows = rows.len(), "Read CSV store");
        Ok(rows)
    }

    /// Replace the store contents
    pub fn write_all(&self, rows: &[AnalysisRow]) -> Result<()> {
        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;

        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Add rows at the end, writing the header only for a new file
    pub fn append(&self, rows: &[AnalysisRow]) -> Result<()> {
        let has_header = self.has_rows();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {} for append", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(!has_header)
            .from_writer(file);

        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Append the rows not stored yet and return them
    pub fn sync(&self, rows: &[AnalysisRow]) -> Result<Vec<AnalysisRow>> {
        let existing = self.read_all()?;
        let new_rows = extract_unique_rows(rows, &existing);

        if !new_rows.is_empty() {
            self.append(&new_rows)?;
        }

        info!(
            path = %self.path.display(),
            offered = rows.len(),
            appended = new_rows.len(),
            "CSV store synced"
        );

        Ok(new_rows)
    }
}

/// Rows of `new` whose (stock_code, Date) key is in neither `existing` nor
/// an earlier row of `new`
pub fn extract_unique_rows(new: &[AnalysisRow], existing: &[AnalysisRow]) -> Vec<AnalysisRow> {
    let mut seen: HashSet<(String, String)> = existing.iter().map(AnalysisRow::key).collect();

    new.iter()
        .filter(|row| seen.insert(row.key()))
        .cloned()
        .collect()
}
