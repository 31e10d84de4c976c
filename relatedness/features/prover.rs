use serde::{Deserialize, Serialize};

use crate::{error::FeatureError, record::ProverOutput};

/// Verdict labels emitted by the prover and the entailment predictor.
///
/// Ids are fixed; labels outside the known set share the `Unrecognized` id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictLabel {
    /// `contradiction`
    Contradiction,
    /// `entailment`
    Entailment,
    /// `neutral`
    Neutral,
    /// `informative`
    Informative,
    /// Anything else, including an absent label.
    Unrecognized,
}

impl VerdictLabel {
    /// Labels with their own id.
    pub const KNOWN: [Self; 4] = [
        Self::Contradiction,
        Self::Entailment,
        Self::Neutral,
        Self::Informative,
    ];

    /// Case-insensitive match against the known labels.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim().to_lowercase();
        Self::KNOWN
            .into_iter()
            .find(|label| label.as_str() == text)
            .unwrap_or(Self::Unrecognized)
    }

    /// Lowercase label text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contradiction => "contradiction",
            Self::Entailment => "entailment",
            Self::Neutral => "neutral",
            Self::Informative => "informative",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Stable numeric id used as the feature value.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Contradiction => 0,
            Self::Entailment => 1,
            Self::Neutral => 2,
            Self::Informative => 3,
            Self::Unrecognized => 4,
        }
    }
}

/// Parsed prover output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProverFeatures {
    /// Prover verdict.
    pub verdict: VerdictLabel,
    /// Domain novelty.
    pub domain_novelty: f64,
    /// Relation novelty.
    pub relation_novelty: f64,
    /// WordNet novelty.
    pub wordnet_novelty: f64,
    /// Model novelty.
    pub model_novelty: f64,
    /// Word overlap reported by the prover.
    pub word_overlap: f64,
}

impl ProverFeatures {
    /// Values used when a record has no prover output.
    pub const MISSING: Self = Self {
        verdict: VerdictLabel::Unrecognized,
        domain_novelty: 0.0,
        relation_novelty: 0.0,
        wordnet_novelty: 0.0,
        model_novelty: 0.0,
        word_overlap: 0.0,
    };

    /// Parses the six fields; numeric fields must hold a number after trimming.
    pub fn parse(record_id: &str, output: &ProverOutput) -> Result<Self, FeatureError> {
        let score = |field: &'static str, value: &str| {
            parse_score(value).ok_or_else(|| FeatureError::MalformedProverField {
                record_id: record_id.to_string(),
                field,
                value: value.to_string(),
            })
        };
        Ok(Self {
            verdict: VerdictLabel::parse(leading_token(&output.verdict)),
            domain_novelty: score("domain_novelty", &output.domain_novelty)?,
            relation_novelty: score("relation_novelty", &output.relation_novelty)?,
            wordnet_novelty: score("wordnet_novelty", &output.wordnet_novelty)?,
            model_novelty: score("model_novelty", &output.model_novelty)?,
            word_overlap: score("word_overlap", &output.word_overlap)?,
        })
    }
}

/// First whitespace token with one trailing ASCII punctuation character removed.
#[must_use]
pub fn leading_token(field: &str) -> &str {
    let token = field.split_whitespace().next().unwrap_or_default();
    token
        .strip_suffix(|c: char| c.is_ascii_punctuation())
        .unwrap_or(token)
}

/// Numeric value of a prover field, e.g. `"0.42. (domain novelty)"` → `0.42`.
#[must_use]
pub fn parse_score(field: &str) -> Option<f64> {
    leading_token(field).parse().ok()
}

/// Label of the predictor's output line; absent → `Unrecognized`.
#[must_use]
pub fn predicted_label(prediction: Option<&str>) -> VerdictLabel {
    prediction.map_or(VerdictLabel::Unrecognized, VerdictLabel::parse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> ProverOutput {
        ProverOutput {
            verdict: "contradiction. (prover)".into(),
            domain_novelty: "0.25, domain".into(),
            relation_novelty: "0.5.".into(),
            wordnet_novelty: "1".into(),
            model_novelty: "0.75;".into(),
            word_overlap: "0.6,".into(),
        }
    }

    #[test]
    fn trims_trailing_punctuation_before_parsing() {
        let features = ProverFeatures::parse("7", &output()).unwrap();
        assert_eq!(features.verdict, VerdictLabel::Contradiction);
        assert_eq!(features.domain_novelty, 0.25);
        assert_eq!(features.relation_novelty, 0.5);
        assert_eq!(features.wordnet_novelty, 1.0);
        assert_eq!(features.model_novelty, 0.75);
        assert_eq!(features.word_overlap, 0.6);
    }

    #[test]
    fn malformed_number_names_field() {
        let mut bad = output();
        bad.model_novelty = "n/a".into();
        let err = ProverFeatures::parse("7", &bad).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::MalformedProverField { field: "model_novelty", .. }
        ));
    }

    #[test]
    fn label_ids_are_fixed() {
        assert_eq!(VerdictLabel::parse("ENTAILMENT ").id(), 1);
        assert_eq!(predicted_label(Some("Neutral\n")).id(), 2);
        assert_eq!(VerdictLabel::parse("informative").id(), 3);
        assert_eq!(predicted_label(Some("maybe")), VerdictLabel::Unrecognized);
        assert_eq!(predicted_label(None).id(), 4);
    }
}
