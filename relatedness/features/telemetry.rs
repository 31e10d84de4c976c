use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_logging::{enabled, JsonFileSink, LogLevel, LogRecord, LogSink};

/// Builder for feature extraction telemetry.
pub struct FeatureTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    sinks: Vec<Arc<dyn LogSink>>,
    min_level: LogLevel,
}

impl FeatureTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            sinks: Vec::new(),
            min_level: LogLevel::Info,
        }
    }

    /// Writes JSON lines to `path`.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Adds an extra sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Drops records below `level`.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<FeatureTelemetry> {
        let mut sinks = self.sinks;
        if let Some(path) = self.log_path {
            sinks.push(Arc::new(JsonFileSink::open(path)?));
        }
        Ok(FeatureTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                sinks,
                min_level: self.min_level,
            }),
        })
    }
}

/// Telemetry handle shared by the assembler and runtime.
#[derive(Clone)]
pub struct FeatureTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for FeatureTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureTelemetry")
            .field("module", &self.inner.module)
            .field("sinks", &self.inner.sinks.len())
            .field("min_level", &self.inner.min_level)
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    sinks: Vec<Arc<dyn LogSink>>,
    min_level: LogLevel,
}

impl FeatureTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> FeatureTelemetryBuilder {
        FeatureTelemetryBuilder::new(module)
    }

    /// Logs structured metadata to every sink.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if !enabled(level, self.inner.min_level) {
            return Ok(());
        }
        let record = LogRecord::new(&self.inner.module, level, message).with_metadata(&metadata);
        for sink in &self.inner.sinks {
            sink.write(&record)?;
        }
        Ok(())
    }
}

/// Logs through an optional handle, ignoring sink failures.
pub(crate) fn emit(
    telemetry: Option<&FeatureTelemetry>,
    level: LogLevel,
    message: &str,
    metadata: Value,
) {
    if let Some(tel) = telemetry {
        let _ = tel.log(level, message, metadata);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_logging::MemorySink;
    use tempfile::tempdir;

    #[test]
    fn telemetry_writes_file_and_memory_sinks() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("features.log");
        let memory = Arc::new(MemorySink::new());
        let telemetry = FeatureTelemetry::builder("features")
            .log_path(&path)
            .sink(memory.clone())
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Info, "features.batch.start", json!({ "records": 3 }))
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("features.batch.start"));
        assert_eq!(memory.snapshot().len(), 1);
    }

    #[test]
    fn records_below_threshold_are_dropped() {
        let memory = Arc::new(MemorySink::new());
        let telemetry = FeatureTelemetry::builder("features")
            .sink(memory.clone())
            .min_level(LogLevel::Warn)
            .build()
            .unwrap();
        telemetry
            .log(LogLevel::Debug, "features.row", json!({}))
            .unwrap();
        telemetry
            .log(LogLevel::Warn, "features.record.missing", json!({}))
            .unwrap();
        assert_eq!(memory.snapshot().len(), 1);
    }
}
