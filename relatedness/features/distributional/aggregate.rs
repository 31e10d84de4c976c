use ndarray::Array1;

use crate::distributional::{
    grams::{bigrams, trigrams, GramSettings},
    vocab::EmbeddingModel,
};

/// Sums the vectors of every known unigram, bigram, and trigram of `tokens`.
///
/// Unknown entries contribute nothing, so a sentence with no known entries
/// yields the zero vector of the model's width.
#[must_use]
pub fn sentence_vector(tokens: &[String], model: &EmbeddingModel, grams: GramSettings) -> Array1<f32> {
    let mut sum = Array1::<f32>::zeros(model.dim());
    let multi_word = bigrams(tokens, model.vocab(), grams.bigrams)
        .into_iter()
        .chain(trigrams(tokens, model.vocab(), grams.trigrams))
        .flatten();
    for entry in tokens.iter().cloned().chain(multi_word) {
        if let Some(row) = model.lookup(&entry) {
            sum += &row;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> EmbeddingModel {
        EmbeddingModel::from_entries(
            2,
            vec![
                ("man".into(), vec![1.0, 0.0]),
                ("plays".into(), vec![0.0, 1.0]),
                ("man_plays".into(), vec![2.0, 2.0]),
            ],
        )
        .unwrap()
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    #[test]
    fn sums_unigrams_and_known_grams() {
        let vector = sentence_vector(&tokens(&["a", "man", "plays"]), &model(), GramSettings::default());
        assert_eq!(vector.to_vec(), vec![3.0, 3.0]);
    }

    #[test]
    fn grams_can_be_disabled() {
        let settings = GramSettings {
            bigrams: false,
            trigrams: false,
        };
        let vector = sentence_vector(&tokens(&["man", "plays"]), &model(), settings);
        assert_eq!(vector.to_vec(), vec![1.0, 1.0]);
    }

    #[test]
    fn unknown_sentence_is_zero_vector_of_model_width() {
        let vector = sentence_vector(&tokens(&["the", "cat"]), &model(), GramSettings::default());
        assert_eq!(vector.len(), 2);
        assert!(vector.iter().all(|v| *v == 0.0));
        assert_eq!(sentence_vector(&[], &model(), GramSettings::default()).len(), 2);
    }
}
