use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use uuid::Uuid;

use crate::assembler::{FeatureRow, FeatureSchema};

/// Append-only JSON-lines store of assembled feature rows.
#[derive(Debug)]
pub struct FeatureStore {
    path: Option<PathBuf>,
    writer: Option<Mutex<fs::File>>,
}

impl FeatureStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating feature store dir {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening feature store {}", path.display()))?;
        Ok(Self {
            path: Some(path),
            writer: Some(Mutex::new(file)),
        })
    }

    /// A store that drops everything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            path: None,
            writer: None,
        }
    }

    /// Writes a batch header naming the columns, then one line per row.
    ///
    /// Missing values are written as `null`.
    pub fn persist_rows(
        &self,
        batch_id: &Uuid,
        schema: &FeatureSchema,
        rows: &[FeatureRow],
    ) -> Result<()> {
        if let Some(writer) = &self.writer {
            let mut guard = writer.lock();
            let header = json!({
                "batch_id": batch_id,
                "ts": Utc::now(),
                "columns": schema.columns(),
                "rows": rows.len(),
            });
            serde_json::to_writer(&mut *guard, &header)?;
            guard.write_all(b"\n")?;
            for row in rows {
                let record = json!({
                    "batch_id": batch_id,
                    "id": row.record_id,
                    "values": row.values,
                    "missing": row.missing,
                });
                serde_json::to_writer(&mut *guard, &record)?;
                guard.write_all(b"\n")?;
            }
            guard.flush()?;
        }
        Ok(())
    }

    /// Returns the configured path, if enabled.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::FeatureId;
    use serde_json::Value;
    use tempfile::tempdir;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("out/features.jsonl");
        let store = FeatureStore::open(&store_path).unwrap();
        let schema =
            FeatureSchema::from_features(&[FeatureId::WordOverlap, FeatureId::ComplexityDelta])
                .unwrap();
        let rows = vec![FeatureRow {
            record_id: "12".into(),
            values: vec![0.5, f64::NAN],
            missing: vec![FeatureId::ComplexityDelta],
        }];
        let batch_id = Uuid::new_v4();
        store.persist_rows(&batch_id, &schema, &rows).unwrap();
        let content = fs::read_to_string(store_path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["columns"][1], "complexity_delta");
        assert_eq!(lines[1]["id"], "12");
        assert!(lines[1]["values"][1].is_null());
        assert_eq!(lines[1]["missing"][0], "complexity_delta");
    }

    #[test]
    fn disabled_store_is_noop() {
        let store = FeatureStore::disabled();
        let schema = FeatureSchema::from_features(&[FeatureId::WordOverlap]).unwrap();
        store.persist_rows(&Uuid::new_v4(), &schema, &[]).unwrap();
        assert!(store.path().is_none());
    }
}
