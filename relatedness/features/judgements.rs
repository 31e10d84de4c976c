use std::{collections::HashMap, fs, path::Path};

use crate::error::JudgementError;

/// Verdict labels in column order.
pub const JUDGEMENT_LABELS: [&str; 3] = ["CONTRADICTION", "ENTAILMENT", "NEUTRAL"];

/// One-hot `[contradiction, entailment, neutral]`.
pub type Judgement = [f64; 3];

/// Record id to one-hot verdict of an external entailment classifier.
#[derive(Debug, Clone, Default)]
pub struct JudgementTable {
    entries: HashMap<String, Judgement>,
}

impl JudgementTable {
    /// Parses `<id> ... <LABEL>` lines. Labels are matched case-sensitively.
    pub fn parse(text: &str) -> Result<Self, JudgementError> {
        let mut entries: HashMap<String, Judgement> = HashMap::new();
        for (idx, line) in text.lines().enumerate() {
            let mut words = line.split_whitespace();
            let Some(id) = words.next() else {
                continue;
            };
            let label = words.last().unwrap_or(id);
            let column = label_index(label).ok_or_else(|| JudgementError::UnknownLabel {
                line: idx + 1,
                label: label.to_string(),
            })?;
            entries.entry(id.to_string()).or_default()[column] = 1.0;
        }
        Ok(Self { entries })
    }

    /// Reads and parses a results file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JudgementError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// The verdict for `id`, or a fresh all-zero vector when absent.
    #[must_use]
    pub fn lookup_or_default(&self, id: &str) -> Judgement {
        self.entries.get(id).copied().unwrap_or_default()
    }

    /// Number of judged records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn label_index(label: &str) -> Option<usize> {
    JUDGEMENT_LABELS.iter().position(|known| *known == label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn maps_last_token_to_one_hot() {
        let table = JudgementTable::parse("id42 foo bar ENTAILMENT\n\nid7 CONTRADICTION\n").unwrap();
        assert_eq!(table.lookup_or_default("id42"), [0.0, 1.0, 0.0]);
        assert_eq!(table.lookup_or_default("id7"), [1.0, 0.0, 0.0]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn unknown_ids_get_fresh_zero_vector() {
        let table = JudgementTable::parse("1 x NEUTRAL").unwrap();
        let mut first = table.lookup_or_default("missing");
        first[0] = 1.0;
        assert_eq!(table.lookup_or_default("missing"), [0.0, 0.0, 0.0]);
        assert_eq!(table.lookup_or_default("1"), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn labels_are_case_sensitive() {
        let err = JudgementTable::parse("1 ok\n2 x entailment\n").unwrap_err();
        assert!(matches!(err, JudgementError::UnknownLabel { line: 1, .. }));
        let err = JudgementTable::parse("2 x entailment\n").unwrap_err();
        assert!(matches!(err, JudgementError::UnknownLabel { line: 1, ref label } if label == "entailment"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.raw");
        fs::write(&path, "9 a b NEUTRAL\n").unwrap();
        assert_eq!(
            JudgementTable::load(&path).unwrap().lookup_or_default("9"),
            [0.0, 0.0, 1.0]
        );
    }
}
