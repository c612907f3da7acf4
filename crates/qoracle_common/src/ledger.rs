//! Qoracle Ledger - append-only persistence log of readings.
//!
//! Lives at $XDG_DATA_HOME/qoracle/ledger.jsonl unless configured otherwise.
//! One JSON object per line:
//!
//! ```text
//! {"id":"…","timestamp":"2026-10-18T17:05:23Z","backend":"rules","input":"I feel stuck",
//!  "score":44,"diagnosis":"…","shift":"…","action":"…","mode":"The Stabilizer"}
//! ```
//!
//! Write-only from the oracle's point of view; the CLI reads it back for
//! `qoraclectl history`.

use crate::error::{QoracleError, Result};
use crate::history::HistoryEntry;
use crate::reading::Reading;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// A single ledger line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: Uuid,
    #[serde(with = "rfc3339_seconds")]
    pub timestamp: DateTime<Utc>,
    pub backend: String,
    pub input: String,
    #[serde(flatten)]
    pub reading: Reading,
}

impl LedgerRecord {
    pub fn from_entry(entry: &HistoryEntry, backend: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: entry.timestamp,
            backend: backend.to_string(),
            input: entry.input.clone(),
            reading: Reading::from(&entry.result),
        }
    }

    /// Format as log line
    pub fn to_log_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from log line
    pub fn from_log_line(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }
}

/// Write-only sink for readings
pub trait LedgerSink {
    fn append(&mut self, record: &LedgerRecord) -> Result<()>;
}

// ============================================================================
// JSONL file ledger
// ============================================================================

pub struct JsonlLedger {
    path: PathBuf,
}

impl JsonlLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn ensure_dir(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Most recent `limit` records, oldest first. Malformed lines are skipped.
    pub fn read_recent(&self, limit: usize) -> Result<Vec<LedgerRecord>> {
        if !self.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(|e| {
            QoracleError::Ledger(format!("cannot open {}: {}", self.path.display(), e))
        })?;

        let mut recent = VecDeque::with_capacity(limit.min(1024));
        let mut skipped = 0usize;
        for raw in BufReader::new(file).split(b'\n') {
            let Ok(line) = String::from_utf8(raw?) else {
                skipped += 1;
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match LedgerRecord::from_log_line(&line) {
                Some(record) => {
                    if recent.len() == limit {
                        recent.pop_front();
                    }
                    if limit > 0 {
                        recent.push_back(record);
                    }
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, path = %self.path.display(), "skipped malformed ledger lines");
        }

        Ok(recent.into_iter().collect())
    }
}

impl LedgerSink for JsonlLedger {
    fn append(&mut self, record: &LedgerRecord) -> Result<()> {
        self.ensure_dir().map_err(|e| {
            QoracleError::Ledger(format!("cannot create directory for {}: {}", self.path.display(), e))
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                QoracleError::Ledger(format!("cannot open {}: {}", self.path.display(), e))
            })?;

        writeln!(file, "{}", record.to_log_line()?)?;
        Ok(())
    }
}

// ============================================================================
// In-memory ledger
// ============================================================================

/// Collects records in memory; handy for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryLedger {
    pub records: Vec<LedgerRecord>,
}

impl LedgerSink for MemoryLedger {
    fn append(&mut self, record: &LedgerRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

mod rfc3339_seconds {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resonance::{Category, ClassificationResult};

    fn entry(input: &str) -> HistoryEntry {
        HistoryEntry::new(
            input,
            ClassificationResult {
                category: Category::Distress,
                score: 44,
                diagnosis: "High internal friction detected.".to_string(),
                shift: "Observe.".to_string(),
                action: "Slow down.".to_string(),
                matched_keywords: vec!["stuck".to_string()],
            },
        )
    }

    #[test]
    fn test_log_line_shape() {
        let record = LedgerRecord::from_entry(&entry("I feel stuck"), "rules");
        let line = record.to_log_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["mode"], "The Stabilizer");
        assert_eq!(value["score"], 44);
        assert_eq!(value["backend"], "rules");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = JsonlLedger::new(dir.path().join("deep").join("ledger.jsonl"));

        for input in ["one", "two", "three"] {
            ledger
                .append(&LedgerRecord::from_entry(&entry(input), "rules"))
                .unwrap();
        }

        let all = ledger.read_recent(10).unwrap();
        let inputs: Vec<&str> = all.iter().map(|r| r.input.as_str()).collect();
        assert_eq!(inputs, vec!["one", "two", "three"]);

        let last_two = ledger.read_recent(2).unwrap();
        assert_eq!(last_two[0].input, "two");
        assert_eq!(last_two[1].input, "three");
        assert_eq!(last_two[1].reading.mode, "The Stabilizer");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let mut ledger = JsonlLedger::new(&path);
        ledger
            .append(&LedgerRecord::from_entry(&entry("kept"), "llm"))
            .unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(file).unwrap();

        let records = ledger.read_recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].backend, "llm");
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let mut ledger = JsonlLedger::new(&path);
        ledger
            .append(&LedgerRecord::from_entry(&entry("before"), "rules"))
            .unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"\xff\xfe garbage\n").unwrap();
        drop(file);

        ledger
            .append(&LedgerRecord::from_entry(&entry("after"), "rules"))
            .unwrap();

        let records = ledger.read_recent(10).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].input, "before");
        assert_eq!(records[1].input, "after");
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlLedger::new(dir.path().join("absent.jsonl"));
        assert!(ledger.read_recent(5).unwrap().is_empty());
    }

    #[test]
    fn test_memory_ledger() {
        let mut ledger = MemoryLedger::default();
        ledger
            .append(&LedgerRecord::from_entry(&entry("x"), "rules"))
            .unwrap();
        assert_eq!(ledger.records.len(), 1);
    }
}
