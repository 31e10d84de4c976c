//! Lexical-hierarchy features: synset lemma overlap and path similarity.

/// Ontology trait and the JSON-backed hypernym graph.
pub mod ontology;
/// Synset overlap and distance scorers.
pub mod scorer;

pub use ontology::{InMemoryOntology, LexicalOntology, PartOfSpeech, SenseLookup, Synset};
pub use scorer::{synset_distance, synset_overlap, NO_SIMILAR_TOKENS_DISTANCE, OVERLAP_SENSES};
