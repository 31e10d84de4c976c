use ndarray::ArrayView1;

use crate::distributional::{aggregate::sentence_vector, grams::GramSettings, vocab::EmbeddingModel};

/// Distance reported when either sentence vector has zero norm.
pub const ZERO_VECTOR_DISTANCE: f64 = 1.0;

/// `1 - cos(a, b)`, clamped to `[0, 2]`; [`ZERO_VECTOR_DISTANCE`] if a norm is zero.
#[must_use]
pub fn cosine_distance(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return ZERO_VECTOR_DISTANCE;
    }
    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 2.0)
}

/// Cosine distance between the aggregated vectors of two sentences.
#[must_use]
pub fn sentence_distance(
    sentence_a: &[String],
    sentence_b: &[String],
    model: &EmbeddingModel,
    grams: GramSettings,
) -> f64 {
    let a = sentence_vector(sentence_a, model, grams);
    let b = sentence_vector(sentence_b, model, grams);
    cosine_distance(a.view(), b.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn identical_direction_is_zero_distance() {
        let a = array![1.0_f32, 2.0];
        let b = array![2.0_f32, 4.0];
        assert!(cosine_distance(a.view(), b.view()).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_and_opposite_vectors() {
        let a = array![1.0_f32, 0.0];
        let b = array![0.0_f32, 3.0];
        let c = array![-1.0_f32, 0.0];
        assert!((cosine_distance(a.view(), b.view()) - 1.0).abs() < 1e-9);
        assert!((cosine_distance(a.view(), c.view()) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_vectors_use_fallback() {
        let zero = array![0.0_f32, 0.0];
        let other = array![1.0_f32, 1.0];
        assert_eq!(cosine_distance(zero.view(), zero.view()), ZERO_VECTOR_DISTANCE);
        assert_eq!(cosine_distance(zero.view(), other.view()), ZERO_VECTOR_DISTANCE);
    }

    #[test]
    fn sentences_without_known_tokens_do_not_produce_nan() {
        let model = EmbeddingModel::from_entries(2, vec![("dog".into(), vec![1.0, 0.0])]).unwrap();
        let a = vec!["cat".to_string()];
        let b = vec!["bird".to_string()];
        let distance = sentence_distance(&a, &b, &model, GramSettings::default());
        assert_eq!(distance, ZERO_VECTOR_DISTANCE);
    }
}
