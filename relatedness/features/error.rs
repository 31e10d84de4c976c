use std::time::Duration;

use thiserror::Error;

/// Errors raised while configuring or assembling feature rows.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The same feature id appears twice in the active list.
    #[error("feature '{0}' listed more than once")]
    DuplicateFeature(&'static str),
    /// No features are active.
    #[error("feature list is empty")]
    EmptyFeatureList,
    /// An active feature needs a resource that was not provided.
    #[error("feature '{feature}' requires the {resource}, which is not configured")]
    MissingResource {
        /// Feature id.
        feature: &'static str,
        /// Missing resource description.
        resource: &'static str,
    },
    /// Assembled row width differs from the schema width.
    #[error("schema mismatch: {expected} columns declared, {actual} assembled")]
    SchemaMismatch {
        /// Columns in the schema.
        expected: usize,
        /// Values produced by the assembler.
        actual: usize,
    },
    /// Externally supplied column names disagree with the feature list.
    #[error("column {position}: feature list yields '{expected}', configuration names '{configured}'")]
    ColumnNameMismatch {
        /// Zero-based column index.
        position: usize,
        /// Name derived from the feature list.
        expected: String,
        /// Name found in the configuration.
        configured: String,
    },
    /// A prover numeric field could not be parsed.
    #[error("record {record_id}: malformed prover field '{field}': {value:?}")]
    MalformedProverField {
        /// Record identifier.
        record_id: String,
        /// Field name.
        field: &'static str,
        /// Raw field text.
        value: String,
    },
    /// Embedding load or cache failure.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    /// Judgement file failure.
    #[error(transparent)]
    Judgement(#[from] JudgementError),
    /// Ontology file failure.
    #[error("ontology: {0}")]
    Ontology(String),
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading embeddings or their binary cache.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Header line missing or not `<count> <dim>`.
    #[error("invalid embedding header: {0:?}")]
    InvalidHeader(String),
    /// A vector line had the wrong width or a non-numeric component.
    #[error("line {line}: {reason}")]
    InvalidVector {
        /// One-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
    /// The same token was listed twice.
    #[error("token {0:?} appears more than once")]
    DuplicateToken(String),
    /// Cache file is not ours or from another format version.
    #[error("embedding cache {0} has an unknown header")]
    CacheHeader(String),
    /// Cache payload could not be encoded or decoded.
    #[error("embedding cache codec: {0}")]
    CacheCodec(#[from] bincode::Error),
    /// Vocabulary and table sizes disagree.
    #[error("vocabulary has {vocab} entries but table has {rows} rows")]
    ShapeMismatch {
        /// Vocabulary size.
        vocab: usize,
        /// Table rows.
        rows: usize,
    },
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading the external judgement file.
#[derive(Debug, Error)]
pub enum JudgementError {
    /// The last token is not one of the three verdict labels.
    #[error("line {line}: unknown judgement label {label:?}")]
    UnknownLabel {
        /// One-based line number.
        line: usize,
        /// Offending token.
        label: String,
    },
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the remote complexity service. Distinct from missing data.
#[derive(Debug, Error)]
pub enum ComplexityError {
    /// Connection refused, DNS failure, or non-success status.
    #[error("complexity service unavailable: {0}")]
    Unavailable(String),
    /// No response within the configured timeout.
    #[error("complexity service timed out after {0:?}")]
    Timeout(Duration),
    /// Response body did not contain a DRS.
    #[error("malformed complexity response: {0}")]
    MalformedResponse(String),
    /// Service disabled in configuration.
    #[error("complexity service disabled")]
    Disabled,
}
