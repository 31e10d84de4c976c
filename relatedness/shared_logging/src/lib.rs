#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! JSON-lines log sinks shared by the feature extraction crates.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Per-record detail.
    Debug,
    /// Lifecycle events.
    Info,
    /// Degraded feature values.
    Warn,
    /// Failures surfaced to the caller.
    Error,
}

/// One structured log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Emitting module.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Dotted event name, e.g. `features.batch.start`.
    pub message: String,
    /// Structured fields.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            metadata: Map::new(),
        }
    }

    /// Adds a single metadata field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Merges the entries of a JSON object; other values are ignored.
    #[must_use]
    pub fn with_metadata(mut self, metadata: &Value) -> Self {
        if let Some(obj) = metadata.as_object() {
            for (key, value) in obj {
                self.metadata.insert(key.clone(), value.clone());
            }
        }
        self
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    /// Persists a record.
    fn write(&self, record: &LogRecord) -> Result<()>;
}

/// Append-only JSON-lines file sink.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonFileSink {
    /// Opens (or creates) the log file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for JsonFileSink {
    fn write(&self, record: &LogRecord) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory sink, mostly for asserting on emitted events.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything written so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records whose message matches `message`.
    #[must_use]
    pub fn matching(&self, message: &str) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.message == message)
            .cloned()
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: &LogRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Returns true when `level` passes the `threshold`.
#[must_use]
pub fn enabled(level: LogLevel, threshold: LogLevel) -> bool {
    level >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = tempdir().unwrap();
        let sink = JsonFileSink::open(dir.path().join("logs/features.log")).unwrap();
        sink.write(&LogRecord::new("features", LogLevel::Info, "features.batch.start"))
            .unwrap();
        sink.write(
            &LogRecord::new("features", LogLevel::Warn, "features.record.missing")
                .with_field("record_id", "42"),
        )
        .unwrap();
        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"record_id\":\"42\""));
        assert!(lines[1].contains("\"level\":\"WARN\""));
    }

    #[test]
    fn memory_sink_filters_by_message() {
        let sink = MemorySink::new();
        let record = LogRecord::new("features", LogLevel::Debug, "a")
            .with_metadata(&json!({ "rows": 3, "ignored": null }));
        sink.write(&record).unwrap();
        sink.write(&LogRecord::new("features", LogLevel::Debug, "b"))
            .unwrap();
        let found = sink.matching("a");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata["rows"], json!(3));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(enabled(LogLevel::Warn, LogLevel::Info));
        assert!(!enabled(LogLevel::Debug, LogLevel::Info));
    }
}
