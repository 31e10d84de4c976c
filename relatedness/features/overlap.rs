use std::collections::{HashMap, HashSet};

use crate::record::{Record, ReplacementCandidate};

/// Words ignored by the overlap scorers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopList {
    words: HashSet<String>,
}

impl StopList {
    /// Stop list from explicit words.
    #[must_use]
    pub fn new(words: impl IntoIterator<Item = String>) -> Self {
        Self {
            words: words.into_iter().collect(),
        }
    }

    /// Adds the `top` most frequent raw tokens of `records`.
    ///
    /// Ties are broken alphabetically so the result is deterministic.
    #[must_use]
    pub fn with_most_frequent(mut self, records: &[Record], top: usize) -> Self {
        if top == 0 {
            return self;
        }
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in records {
            for token in record.premise.iter().chain(&record.hypothesis) {
                *counts.entry(token.as_str()).or_default() += 1;
            }
        }
        let mut ranked: Vec<_> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        self.words
            .extend(ranked.into_iter().take(top).map(|(word, _)| word.to_string()));
        self
    }

    /// Whether `word` is a stop word.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Number of stop words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when nothing is filtered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn content_words<'a>(&self, tokens: &'a [String]) -> HashSet<&'a str> {
        tokens
            .iter()
            .map(String::as_str)
            .filter(|token| !self.contains(token))
            .collect()
    }
}

/// Jaccard overlap of the non-stop word sets; 0 when both sets are empty.
#[must_use]
pub fn word_overlap(sentence_a: &[String], sentence_b: &[String], stop_list: &StopList) -> f64 {
    let a = stop_list.content_words(sentence_a);
    let b = stop_list.content_words(sentence_b);
    jaccard(&a, &b)
}

/// Best [`word_overlap`] over the original pair and every paraphrase substitution.
#[must_use]
pub fn paraphrase_word_overlap(
    sentence_a: &[String],
    sentence_b: &[String],
    replacements: &[ReplacementCandidate],
    stop_list: &StopList,
) -> f64 {
    replacements
        .iter()
        .map(|candidate| word_overlap(&candidate.premise, &candidate.hypothesis, stop_list))
        .fold(word_overlap(sentence_a, sentence_b, stop_list), f64::max)
}

/// `|len a - len b| / min(len a, len b)`; 0 when either sentence is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn length_difference(sentence_a: &[String], sentence_b: &[String]) -> f64 {
    let shorter = sentence_a.len().min(sentence_b.len());
    if shorter == 0 {
        return 0.0;
    }
    sentence_a.len().abs_diff(sentence_b.len()) as f64 / shorter as f64
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
