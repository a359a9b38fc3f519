//! Completed-session history.
//!
//! Finished runner sessions are appended to a JSONL log with file locking,
//! and periodically rolled up into a CSV archive. Rollup fsyncs the CSV
//! before renaming the log, so a crash can duplicate but never lose records.

use crate::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One completed (or abandoned) guided session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub steps_total: u32,
    pub steps_completed: u32,
}

/// Session sink trait for persisting records
pub trait SessionSink {
    fn append(&mut self, record: &SessionRecord) -> Result<()>;
}

/// JSONL-based session sink with file locking
pub struct JsonlLog {
    path: PathBuf,
}

impl JsonlLog {
    /// Create a new JSONL log for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SessionSink for JsonlLog {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended session {} to history log", record.id);
        Ok(())
    }
}

/// Read all session records from a history log
///
/// Unparseable lines are warned about and skipped, never fatal.
pub fn read_records(path: &Path) -> Result<Vec<SessionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse session at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} sessions from history log", records.len());
    Ok(records)
}

// ============================================================================
// CSV Rollup
// ============================================================================

/// A row in the CSV archive
#[derive(Debug, Serialize)]
struct CsvRow {
    id: String,
    started_at: String,
    completed_at: Option<String>,
    steps_total: u32,
    steps_completed: u32,
}

impl From<&SessionRecord> for CsvRow {
    fn from(record: &SessionRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            started_at: record.started_at.to_rfc3339(),
            completed_at: record.completed_at.map(|t| t.to_rfc3339()),
            steps_total: record.steps_total,
            steps_completed: record.steps_completed,
        }
    }
}

/// Roll up logged sessions into CSV and archive the log atomically
///
/// The CSV is fsynced before the log is renamed to `.processed`, which is
/// kept around for manual recovery rather than deleted.
pub fn log_to_csv_and_archive(log_path: &Path, csv_path: &Path) -> Result<usize> {
    let records = read_records(log_path)?;

    if records.is_empty() {
        tracing::info!("No sessions in history log to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Headers only when the archive is new
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for record in &records {
        writer.serialize(CsvRow::from(record))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} sessions to CSV archive", records.len());

    let processed_path = log_path.with_extension("jsonl.processed");
    std::fs::rename(log_path, &processed_path)?;

    tracing::info!("Archived history log to {:?}", processed_path);

    Ok(records.len())
}

/// Remove processed history logs from the given directory
pub fn cleanup_processed_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(extension) = path.extension() {
            if extension == "processed" {
                std::fs::remove_file(&path)?;
                tracing::debug!("Removed processed history log: {:?}", path);
                count += 1;
            }
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed history logs", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(steps_total: u32) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            steps_total,
            steps_completed: steps_total,
        }
    }

    #[test]
    fn test_append_and_read_single_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("sessions.jsonl");

        let record = create_test_record(12);
        let record_id = record.id;

        let mut log = JsonlLog::new(&log_path);
        log.append(&record).unwrap();

        let records = read_records(&log_path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, record_id);
        assert_eq!(records[0].steps_total, 12);
    }

    #[test]
    fn test_append_multiple_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("sessions.jsonl");

        let mut log = JsonlLog::new(&log_path);
        for i in 0..5 {
            log.append(&create_test_record(i)).unwrap();
        }

        let records = read_records(&log_path).unwrap();
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn test_read_missing_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let records = read_records(&temp_dir.path().join("nonexistent.jsonl")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("sessions.jsonl");

        let mut log = JsonlLog::new(&log_path);
        log.append(&create_test_record(3)).unwrap();

        let mut contents = std::fs::read_to_string(&log_path).unwrap();
        contents.push_str("{ garbage line }\n");
        std::fs::write(&log_path, contents).unwrap();
        log.append(&create_test_record(4)).unwrap();

        let records = read_records(&log_path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_rollup_creates_csv_and_archives_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("sessions.jsonl");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut log = JsonlLog::new(&log_path);
        for i in 0..3 {
            log.append(&create_test_record(i)).unwrap();
        }

        let count = log_to_csv_and_archive(&log_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        assert!(csv_path.exists());
        assert!(!log_path.exists());
        assert!(log_path.with_extension("jsonl.processed").exists());
    }

    #[test]
    fn test_rollup_appends_to_existing_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("sessions.jsonl");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut log = JsonlLog::new(&log_path);
        log.append(&create_test_record(1)).unwrap();
        assert_eq!(log_to_csv_and_archive(&log_path, &csv_path).unwrap(), 1);

        std::fs::remove_file(log_path.with_extension("jsonl.processed")).unwrap();
        let mut log = JsonlLog::new(&log_path);
        log.append(&create_test_record(2)).unwrap();
        assert_eq!(log_to_csv_and_archive(&log_path, &csv_path).unwrap(), 1);

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
    }

    #[test]
    fn test_empty_log_rolls_up_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("empty.jsonl");
        let csv_path = temp_dir.path().join("sessions.csv");

        File::create(&log_path).unwrap();

        let count = log_to_csv_and_archive(&log_path, &csv_path).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_cleanup_processed_logs() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("s1.jsonl.processed")).unwrap();
        File::create(temp_dir.path().join("s2.jsonl.processed")).unwrap();
        File::create(temp_dir.path().join("keep.jsonl")).unwrap();

        let count = cleanup_processed_logs(temp_dir.path()).unwrap();
        assert_eq!(count, 2);

        assert!(!temp_dir.path().join("s1.jsonl.processed").exists());
        assert!(temp_dir.path().join("keep.jsonl").exists());
    }
}
