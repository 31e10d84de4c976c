#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Sentence-pair relatedness features: one numeric row per premise/hypothesis record.

/// Telemetry handle wrapping the shared JSON log sinks.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Typed errors raised at library seams.
#[path = "../error.rs"]
pub mod error;

/// TOML configuration for the active feature set and resources.
#[path = "../config.rs"]
pub mod config;

/// Record, model artifact, and replacement candidate types.
#[path = "../record.rs"]
pub mod record;

/// Vocabulary, embeddings, grams, and cosine distance.
#[path = "../distributional/main.rs"]
pub mod distributional;

/// Stop-word filtered set overlap and length features.
#[path = "../overlap.rs"]
pub mod overlap;

/// Lexical ontology lookups and synset scorers.
#[path = "../taxonomy/main.rs"]
pub mod taxonomy;

/// Instance and relation overlap from formal model artifacts.
#[path = "../model_diff.rs"]
pub mod model_diff;

/// Remote DRS complexity service client.
#[path = "../complexity.rs"]
pub mod complexity;

/// External entailment judgement table.
#[path = "../judgements.rs"]
pub mod judgements;

/// Prover output parsing and fixed label ids.
#[path = "../prover.rs"]
pub mod prover;

/// Feature ids, schema, and row assembly.
#[path = "../assembler.rs"]
pub mod assembler;

/// JSON-lines persistence of feature rows.
#[path = "../feature_store.rs"]
pub mod feature_store;

/// Runtime building resources from config and extracting feature matrices.
#[path = "../main.rs"]
pub mod runtime;

pub use assembler::{FeatureAssembler, FeatureId, FeatureResources, FeatureRow, FeatureSchema};
pub use complexity::{ComplexityError, ComplexitySource, HttpComplexityService};
pub use config::FeatureConfig;
pub use distributional::{CacheOutcome, EmbeddingModel, EmbeddingTable, VocabularyIndex};
pub use error::FeatureError;
pub use feature_store::FeatureStore;
pub use judgements::JudgementTable;
pub use record::{ModelArtifact, ProverOutput, Record, ReplacementCandidate};
pub use runtime::{FeatureMatrix, FeaturePipeline, FeaturePipelineBuilder};
pub use taxonomy::{InMemoryOntology, LexicalOntology, SenseLookup};
pub use telemetry::{FeatureTelemetry, FeatureTelemetryBuilder};
