//! Aggregation of worker results and table export.

use crate::error::{HarvestError, HarvestResult};
use crate::record::{Record, COLUMNS};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::info;

/// Writes a set of records as a table.
pub trait TableWriter: Send + Sync {
    /// Write `rows` to `destination` with the given column order and one
    /// header row, creating parent directories as needed.
    fn write(&self, rows: &[Record], columns: &[&str], destination: &Path) -> HarvestResult<()>;
}

/// UTF-8 CSV output via the `csv` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableWriter;

impl TableWriter for CsvTableWriter {
    fn write(&self, rows: &[Record], columns: &[&str], destination: &Path) -> HarvestResult<()> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| HarvestError::Output {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut writer = csv::Writer::from_path(destination)?;
        writer.write_record(columns)?;
        for row in rows {
            writer.write_record(columns.iter().map(|c| row.get(c).unwrap_or("")))?;
        }
        writer.flush().map_err(|source| HarvestError::Output {
            path: destination.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

/// Drains the result channel and hands the records to a [`TableWriter`].
pub struct Aggregator<'a> {
    writer: &'a dyn TableWriter,
}

impl<'a> Aggregator<'a> {
    pub fn new(writer: &'a dyn TableWriter) -> Self {
        Self { writer }
    }

    /// Take everything currently in the channel without waiting.
    ///
    /// Only call this after the dispatcher's join barrier has released: at
    /// that point every published record is already in the channel.
    pub fn drain(results: &mut mpsc::UnboundedReceiver<Record>) -> Vec<Record> {
        let mut rows = Vec::new();
        while let Ok(record) = results.try_recv() {
            rows.push(record);
        }
        rows
    }

    /// Drain `results` and write them to `destination` in [`COLUMNS`] order.
    pub fn export(
        &self,
        results: &mut mpsc::UnboundedReceiver<Record>,
        destination: &Path,
    ) -> HarvestResult<Vec<Record>> {
        let rows = Self::drain(results);
        self.writer.write(&rows, &COLUMNS, destination)?;
        info!("wrote {} rows to {}", rows.len(), destination.display());
        Ok(rows)
    }
}
