//! Instance and relation overlap derived from first-order model files.
//!
//! A model's header line lists its domain (`model([d1,d2,d3], ...)`); every
//! binary relation sits on its own line tagged `f(2,`.

use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;

use crate::record::{ModelArtifact, ModelTriple, ReplacementCandidate};

/// Substring marking a binary relation line.
pub const RELATION_MARKER: &str = "f(2";

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bd\d+\b").expect("entity pattern is valid"))
}

/// Distinct domain entities named on the header line; 0 for an absent model.
#[must_use]
pub fn instance_count(model: Option<&ModelArtifact>) -> usize {
    model
        .and_then(ModelArtifact::header)
        .map_or(0, |header| {
            entity_pattern()
                .find_iter(header)
                .map(|m| m.as_str())
                .collect::<HashSet<_>>()
                .len()
        })
}

/// Lines carrying a binary relation; 0 for an absent model.
///
/// Identical relations repeated on one line count once.
#[must_use]
pub fn relation_count(model: Option<&ModelArtifact>) -> usize {
    model.map_or(0, |model| {
        model
            .lines()
            .iter()
            .filter(|line| line.contains(RELATION_MARKER))
            .count()
    })
}

/// `1 - (kth - kt) / kh`, or 0 when any count is 0.
///
/// Asymmetric by construction: it measures how much of the hypothesis is
/// new relative to the premise.
#[must_use]
pub fn overlap_ratio(kt: usize, kh: usize, kth: usize) -> f64 {
    if kt == 0 || kh == 0 || kth == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let (kt, kh, kth) = (kt as f64, kh as f64, kth as f64);
    1.0 - (kth - kt) / kh
}

fn ratio_with(models: ModelTriple<'_>, count: fn(Option<&ModelArtifact>) -> usize) -> f64 {
    overlap_ratio(
        count(models.premise),
        count(models.hypothesis),
        count(models.union),
    )
}

fn best_ratio(
    models: ModelTriple<'_>,
    replacements: &[ReplacementCandidate],
    count: fn(Option<&ModelArtifact>) -> usize,
) -> f64 {
    replacements
        .iter()
        .map(|candidate| ratio_with(candidate.models(), count))
        .fold(ratio_with(models, count), f64::max)
}

/// Instance overlap of the original models.
#[must_use]
pub fn instance_overlap(models: ModelTriple<'_>) -> f64 {
    ratio_with(models, instance_count)
}

/// Relation overlap of the original models.
#[must_use]
pub fn relation_overlap(models: ModelTriple<'_>) -> f64 {
    ratio_with(models, relation_count)
}

/// Best instance overlap over the original models and every substitution.
#[must_use]
pub fn paraphrase_instance_overlap(models: ModelTriple<'_>, replacements: &[ReplacementCandidate]) -> f64 {
    best_ratio(models, replacements, instance_count)
}

/// Best relation overlap over the original models and every substitution.
#[must_use]
pub fn paraphrase_relation_overlap(models: ModelTriple<'_>, replacements: &[ReplacementCandidate]) -> f64 {
    best_ratio(models, replacements, relation_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(text: &str) -> ModelArtifact {
        ModelArtifact::from_text(text)
    }

    #[test]
    fn counts_entities_on_header_only() {
        let m = model("model([d1,d2,d3],\n[f(1,n_man,[d1]),\nf(2,r_agent,[(d2,d1)])])");
        assert_eq!(instance_count(Some(&m)), 3);
        assert_eq!(instance_count(Some(&model("model([d1,d1],[])"))), 1);
        assert_eq!(instance_count(None), 0);
        assert_eq!(instance_count(Some(&ModelArtifact::default())), 0);
    }

    #[test]
    fn counts_relation_lines() {
        let m = model("model([d1,d2],\n[f(2,r_agent,[(d2,d1)]),\nf(2,r_theme,[(d2,d1)]),\nf(1,n_dog,[d1])])");
        assert_eq!(relation_count(Some(&m)), 2);
        assert_eq!(relation_count(None), 0);
    }

    #[test]
    fn ratio_is_zero_when_any_count_is_zero() {
        assert_eq!(overlap_ratio(0, 5, 3), 0.0);
        assert_eq!(overlap_ratio(4, 0, 3), 0.0);
        assert_eq!(overlap_ratio(4, 6, 0), 0.0);
    }

    #[test]
    fn ratio_formula() {
        assert!((overlap_ratio(4, 6, 5) - (1.0 - 1.0 / 6.0)).abs() < 1e-12);
        assert!((overlap_ratio(4, 6, 5) - 0.833_333_333_333).abs() < 1e-9);
    }

    #[test]
    fn missing_models_are_neutral() {
        let t = model("model([d1,d2],[])");
        let triple = ModelTriple {
            premise: Some(&t),
            hypothesis: None,
            union: Some(&t),
        };
        assert_eq!(instance_overlap(triple), 0.0);
        assert_eq!(relation_overlap(ModelTriple::default()), 0.0);
    }

    #[test]
    fn paraphrase_variant_keeps_maximum() {
        let t = model("model([d1,d2],[])");
        let h = model("model([d1,d2],[])");
        let th = model("model([d1,d2,d3,d4],[])");
        let original = ModelTriple {
            premise: Some(&t),
            hypothesis: Some(&h),
            union: Some(&th),
        };
        assert_eq!(instance_overlap(original), 0.0);
        let candidate = ReplacementCandidate {
            premise_model: Some(t.clone()),
            hypothesis_model: Some(h.clone()),
            union_model: Some(model("model([d1,d2,d3],[])")),
            ..ReplacementCandidate::default()
        };
        let useless = ReplacementCandidate::default();
        let best = paraphrase_instance_overlap(original, &[useless, candidate]);
        assert!((best - 0.5).abs() < 1e-12);
        assert!(best >= instance_overlap(original));
        assert_eq!(paraphrase_relation_overlap(original, &[]), relation_overlap(original));
    }
}
