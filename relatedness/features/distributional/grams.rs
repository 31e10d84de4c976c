use serde::{Deserialize, Serialize};

use crate::distributional::vocab::VocabularyIndex;

/// Separator used by the skip-gram model for multi-word entries.
pub const GRAM_SEPARATOR: &str = "_";

/// Which multi-word grams contribute to sentence vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GramSettings {
    /// Include `w1_w2` entries.
    #[serde(default = "default_true")]
    pub bigrams: bool,
    /// Include `w1_w2_w3` entries.
    #[serde(default = "default_true")]
    pub trigrams: bool,
}

impl Default for GramSettings {
    fn default() -> Self {
        Self {
            bigrams: true,
            trigrams: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Adjacent token pairs; `None` where the pair is not in the vocabulary.
#[must_use]
pub fn bigrams(tokens: &[String], vocab: &VocabularyIndex, enabled: bool) -> Vec<Option<String>> {
    if enabled {
        ngrams(tokens, 2, vocab)
    } else {
        Vec::new()
    }
}

/// Adjacent token triples; `None` where the triple is not in the vocabulary.
#[must_use]
pub fn trigrams(tokens: &[String], vocab: &VocabularyIndex, enabled: bool) -> Vec<Option<String>> {
    if enabled {
        ngrams(tokens, 3, vocab)
    } else {
        Vec::new()
    }
}

fn ngrams(tokens: &[String], n: usize, vocab: &VocabularyIndex) -> Vec<Option<String>> {
    tokens
        .windows(n)
        .map(|window| {
            let gram = window.join(GRAM_SEPARATOR);
            vocab.contains(&gram).then_some(gram)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    fn vocab() -> VocabularyIndex {
        VocabularyIndex::from_tokens(["a", "man", "a_man", "man_is_playing"].map(String::from))
            .unwrap()
    }

    #[test]
    fn bigrams_mark_unknown_pairs() {
        let grams = bigrams(&tokens(&["a", "man", "is"]), &vocab(), true);
        assert_eq!(grams, vec![Some("a_man".to_string()), None]);
    }

    #[test]
    fn trigrams_have_len_minus_two_entries() {
        let grams = trigrams(&tokens(&["a", "man", "is", "playing"]), &vocab(), true);
        assert_eq!(grams, vec![None, Some("man_is_playing".to_string())]);
    }

    #[test]
    fn disabled_or_short_input_is_empty() {
        assert!(bigrams(&tokens(&["a", "man"]), &vocab(), false).is_empty());
        assert!(trigrams(&tokens(&["a", "man"]), &vocab(), true).is_empty());
        assert!(bigrams(&[], &vocab(), true).is_empty());
    }
}
