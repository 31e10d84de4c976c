use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Formal semantic model for one sentence or for the union of a pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelArtifact {
    lines: Vec<String>,
}

impl ModelArtifact {
    /// Wraps already split lines.
    #[must_use]
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Splits a text blob into lines.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// All lines in order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// First line, which carries the domain of the model.
    #[must_use]
    pub fn header(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }
}

/// Borrowed premise/hypothesis/union models.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelTriple<'a> {
    /// Premise (t) model.
    pub premise: Option<&'a ModelArtifact>,
    /// Hypothesis (h) model.
    pub hypothesis: Option<&'a ModelArtifact>,
    /// Union (th) model.
    pub union: Option<&'a ModelArtifact>,
}

/// One paraphrase substitution attempt for a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplacementCandidate {
    /// Substituted premise tokens.
    pub premise: Vec<String>,
    /// Substituted hypothesis tokens.
    pub hypothesis: Vec<String>,
    /// Model of the substituted premise.
    #[serde(default)]
    pub premise_model: Option<ModelArtifact>,
    /// Model of the substituted hypothesis.
    #[serde(default)]
    pub hypothesis_model: Option<ModelArtifact>,
    /// Model of the substituted union.
    #[serde(default)]
    pub union_model: Option<ModelArtifact>,
}

impl ReplacementCandidate {
    /// Models of this substitution.
    #[must_use]
    pub fn models(&self) -> ModelTriple<'_> {
        ModelTriple {
            premise: self.premise_model.as_ref(),
            hypothesis: self.hypothesis_model.as_ref(),
            union: self.union_model.as_ref(),
        }
    }
}

/// Raw six-field output of the external theorem prover.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProverOutput {
    /// Verdict token, e.g. `contradiction.`.
    pub verdict: String,
    /// Domain novelty score text.
    pub domain_novelty: String,
    /// Relation novelty score text.
    pub relation_novelty: String,
    /// WordNet novelty score text.
    pub wordnet_novelty: String,
    /// Model novelty score text.
    pub model_novelty: String,
    /// Word overlap score text.
    pub word_overlap: String,
}

/// Complexity values computed ahead of time for both sentences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityPair {
    /// Premise complexity.
    pub premise: f64,
    /// Hypothesis complexity.
    pub hypothesis: f64,
}

/// One benchmark row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    /// Pair identifier.
    pub id: String,
    /// Gold relatedness score.
    #[serde(default)]
    pub relatedness: f64,
    /// Premise tokens as written.
    pub premise: Vec<String>,
    /// Hypothesis tokens as written.
    pub hypothesis: Vec<String>,
    /// Premise tokens after normalization.
    #[serde(default)]
    pub premise_normalized: Vec<String>,
    /// Hypothesis tokens after normalization.
    #[serde(default)]
    pub hypothesis_normalized: Vec<String>,
    /// Premise model, if one was found.
    #[serde(default)]
    pub premise_model: Option<ModelArtifact>,
    /// Hypothesis model, if one was found.
    #[serde(default)]
    pub hypothesis_model: Option<ModelArtifact>,
    /// Union model, if one was found.
    #[serde(default)]
    pub union_model: Option<ModelArtifact>,
    /// Precomputed DRS complexity.
    #[serde(default)]
    pub complexity: Option<ComplexityPair>,
    /// Paraphrase substitutions.
    #[serde(default)]
    pub replacements: Vec<ReplacementCandidate>,
    /// Theorem prover output.
    #[serde(default)]
    pub prover: Option<ProverOutput>,
    /// Predicted label line from the entailment system.
    #[serde(default)]
    pub prediction: Option<String>,
}

impl Record {
    /// Minimal record with only id and raw tokens.
    #[must_use]
    pub fn new(id: impl Into<String>, premise: &[&str], hypothesis: &[&str]) -> Self {
        let premise: Vec<String> = premise.iter().map(|s| (*s).to_string()).collect();
        let hypothesis: Vec<String> = hypothesis.iter().map(|s| (*s).to_string()).collect();
        Self {
            id: id.into(),
            premise_normalized: premise.iter().map(|t| t.to_lowercase()).collect(),
            hypothesis_normalized: hypothesis.iter().map(|t| t.to_lowercase()).collect(),
            premise,
            hypothesis,
            ..Self::default()
        }
    }

    /// Models of the original pair.
    #[must_use]
    pub fn models(&self) -> ModelTriple<'_> {
        ModelTriple {
            premise: self.premise_model.as_ref(),
            hypothesis: self.hypothesis_model.as_ref(),
            union: self.union_model.as_ref(),
        }
    }
}

/// Reads one JSON record per line, skipping blank lines.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    data.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid record", path.display(), idx + 1))
        })
        .collect()
}
