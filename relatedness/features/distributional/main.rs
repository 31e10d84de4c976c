//! Distributional features over a word2vec-style embedding table.

/// Sentence vector aggregation.
pub mod aggregate;
/// Cosine distance between sentence vectors.
pub mod distance;
/// Bigram and trigram extraction.
pub mod grams;
/// Vocabulary index, embedding table, and binary cache.
pub mod vocab;

pub use aggregate::sentence_vector;
pub use distance::{cosine_distance, sentence_distance, ZERO_VECTOR_DISTANCE};
pub use grams::{bigrams, trigrams, GramSettings};
pub use vocab::{CacheOutcome, EmbeddingModel, EmbeddingTable, VocabularyIndex};
