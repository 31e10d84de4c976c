use std::collections::HashSet;

use crate::{
    overlap::jaccard,
    taxonomy::ontology::{LexicalOntology, PartOfSpeech, Synset},
};

/// Noun senses consulted per token by [`synset_overlap`].
pub const OVERLAP_SENSES: usize = 5;

/// Value of [`synset_distance`] when no token has a positive similarity.
pub const NO_SIMILAR_TOKENS_DISTANCE: f64 = 0.0;

/// Jaccard overlap of the lemma names reachable from the first noun senses of each sentence.
#[must_use]
pub fn synset_overlap(
    sentence_a: &[String],
    sentence_b: &[String],
    ontology: &dyn LexicalOntology,
) -> f64 {
    let a = sentence_lemmas(sentence_a, ontology);
    let b = sentence_lemmas(sentence_b, ontology);
    jaccard(&a, &b)
}

fn sentence_lemmas<'o>(sentence: &[String], ontology: &'o dyn LexicalOntology) -> HashSet<&'o str> {
    sentence
        .iter()
        .flat_map(|word| {
            (1..=OVERLAP_SENSES).filter_map(move |sense| {
                ontology.synset(word, PartOfSpeech::Noun, sense).found()
            })
        })
        .flat_map(|synset| synset.lemmas.iter().map(String::as_str))
        .collect()
}

/// Mean over tokens of `sentence_a` of the best primary-sense path similarity to `sentence_b`.
///
/// Only tokens with a positive best similarity count in the denominator.
/// Returns [`NO_SIMILAR_TOKENS_DISTANCE`] when there are none.
#[must_use]
pub fn synset_distance(
    sentence_a: &[String],
    sentence_b: &[String],
    ontology: &dyn LexicalOntology,
) -> f64 {
    let targets: Vec<&Synset> = sentence_b
        .iter()
        .filter_map(|word| primary_sense(word, ontology))
        .collect();
    let best: Vec<f64> = sentence_a
        .iter()
        .map(|word| {
            primary_sense(word, ontology).map_or(0.0, |source| {
                targets
                    .iter()
                    .filter_map(|target| ontology.path_similarity(source, target))
                    .fold(0.0, f64::max)
            })
        })
        .collect();
    let positive = best.iter().filter(|score| **score > 0.0).count();
    if positive == 0 {
        return NO_SIMILAR_TOKENS_DISTANCE;
    }
    #[allow(clippy::cast_precision_loss)]
    let positive = positive as f64;
    best.iter().sum::<f64>() / positive
}

fn primary_sense<'o>(word: &str, ontology: &'o dyn LexicalOntology) -> Option<&'o Synset> {
    ontology.synset(word, PartOfSpeech::Noun, 1).found()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ontology::tests::sample;

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn overlap_collects_lemmas_of_all_senses() {
        let onto = sample();
        // dog -> {dog, domestic_dog, frank, hotdog}; frank -> {frank, dog, hotdog}
        let score = synset_overlap(&tokens("dog"), &tokens("frank"), &onto);
        assert!((score - 3.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_or_unknown_sentences_score_zero() {
        let onto = sample();
        assert_eq!(synset_overlap(&tokens("cat"), &tokens("ball"), &onto), 0.0);
        assert_eq!(synset_overlap(&tokens("the of"), &tokens("xyz"), &onto), 0.0);
    }

    #[test]
    fn distance_averages_positive_maxima_only() {
        let onto = sample();
        // dog: max(dog->cat 1/3, dog->ball 1/5) = 1/3; "runs" is unknown and excluded.
        let score = synset_distance(&tokens("dog runs"), &tokens("cat ball"), &onto);
        assert!((score - 1.0 / 3.0).abs() < 1e-12);
        let both = synset_distance(&tokens("dog cat"), &tokens("cat"), &onto);
        assert!((both - (1.0 / 3.0 + 1.0) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn distance_without_similar_tokens_uses_fallback() {
        let onto = sample();
        let score = synset_distance(&tokens("runs fast"), &tokens("cat"), &onto);
        assert_eq!(score, NO_SIMILAR_TOKENS_DISTANCE);
        assert_eq!(synset_distance(&[], &[], &onto), NO_SIMILAR_TOKENS_DISTANCE);
    }
}
