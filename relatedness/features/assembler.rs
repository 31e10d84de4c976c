//! Column contract and row assembly.
//!
//! The ordered [`FeatureId`] list is the single source of column semantics:
//! the schema is derived from it and every row is produced by walking it.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    complexity::{complexity_delta, precomputed_delta, ComplexityError, ComplexitySource},
    distributional::{sentence_distance, EmbeddingModel, GramSettings},
    error::FeatureError,
    judgements::{JudgementTable, JUDGEMENT_LABELS},
    model_diff::{
        instance_overlap, paraphrase_instance_overlap, paraphrase_relation_overlap,
        relation_overlap,
    },
    overlap::{length_difference, paraphrase_word_overlap, word_overlap, StopList},
    prover::{predicted_label, ProverFeatures, VerdictLabel},
    record::{ComplexityPair, Record},
    taxonomy::{synset_distance, synset_overlap, LexicalOntology},
    telemetry::{emit, FeatureTelemetry},
};

/// Value written for a feature that could not be computed.
pub const MISSING_VALUE: f64 = f64::NAN;

/// Every feature the assembler knows, in the order they are documented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureId {
    /// Cosine distance of aggregated sentence embeddings.
    EmbeddingDistance,
    /// Stop-word filtered Jaccard overlap.
    WordOverlap,
    /// Best word overlap over paraphrase substitutions.
    ParaphraseWordOverlap,
    /// Jaccard overlap of synset lemmas.
    SynsetOverlap,
    /// Mean best path similarity of primary senses.
    SynsetDistance,
    /// Relative sentence length difference.
    LengthDifference,
    /// Prover verdict id.
    ProverVerdict,
    /// Prover domain novelty.
    DomainNovelty,
    /// Prover relation novelty.
    RelationNovelty,
    /// Prover WordNet novelty.
    WordnetNovelty,
    /// Prover model novelty.
    ModelNovelty,
    /// Word overlap reported by the prover.
    ProverWordOverlap,
    /// Entailment predictor label id.
    PredictedLabel,
    /// Model-diff instance overlap.
    InstanceOverlap,
    /// Model-diff relation overlap.
    RelationOverlap,
    /// Best instance overlap over paraphrase substitutions.
    ParaphraseInstanceOverlap,
    /// Best relation overlap over paraphrase substitutions.
    ParaphraseRelationOverlap,
    /// Absolute DRS complexity difference.
    ComplexityDelta,
    /// One-hot external entailment judgement (three columns).
    EntailmentJudgement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Embeddings,
    Ontology,
    Judgements,
}

impl Resource {
    const fn describe(self) -> &'static str {
        match self {
            Self::Embeddings => "embedding table",
            Self::Ontology => "lexical ontology",
            Self::Judgements => "judgement table",
        }
    }
}

impl FeatureId {
    /// All features in documentation order.
    pub const ALL: [Self; 19] = [
        Self::EmbeddingDistance,
        Self::WordOverlap,
        Self::ParaphraseWordOverlap,
        Self::SynsetOverlap,
        Self::SynsetDistance,
        Self::LengthDifference,
        Self::ProverVerdict,
        Self::DomainNovelty,
        Self::RelationNovelty,
        Self::WordnetNovelty,
        Self::ModelNovelty,
        Self::ProverWordOverlap,
        Self::PredictedLabel,
        Self::InstanceOverlap,
        Self::RelationOverlap,
        Self::ParaphraseInstanceOverlap,
        Self::ParaphraseRelationOverlap,
        Self::ComplexityDelta,
        Self::EntailmentJudgement,
    ];

    /// Configuration name, also the column name of single-column features.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EmbeddingDistance => "embedding_distance",
            Self::WordOverlap => "word_overlap",
            Self::ParaphraseWordOverlap => "paraphrase_word_overlap",
            Self::SynsetOverlap => "synset_overlap",
            Self::SynsetDistance => "synset_distance",
            Self::LengthDifference => "length_difference",
            Self::ProverVerdict => "prover_verdict",
            Self::DomainNovelty => "domain_novelty",
            Self::RelationNovelty => "relation_novelty",
            Self::WordnetNovelty => "wordnet_novelty",
            Self::ModelNovelty => "model_novelty",
            Self::ProverWordOverlap => "prover_word_overlap",
            Self::PredictedLabel => "predicted_label",
            Self::InstanceOverlap => "instance_overlap",
            Self::RelationOverlap => "relation_overlap",
            Self::ParaphraseInstanceOverlap => "paraphrase_instance_overlap",
            Self::ParaphraseRelationOverlap => "paraphrase_relation_overlap",
            Self::ComplexityDelta => "complexity_delta",
            Self::EntailmentJudgement => "entailment_judgement",
        }
    }

    /// Columns this feature contributes, in order.
    #[must_use]
    pub fn columns(self) -> Vec<String> {
        match self {
            Self::EntailmentJudgement => JUDGEMENT_LABELS
                .iter()
                .map(|label| format!("{}_{}", self.name(), label.to_lowercase()))
                .collect(),
            _ => vec![self.name().to_string()],
        }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::EntailmentJudgement => JUDGEMENT_LABELS.len(),
            _ => 1,
        }
    }

    const fn required_resource(self) -> Option<Resource> {
        match self {
            Self::EmbeddingDistance => Some(Resource::Embeddings),
            Self::SynsetOverlap | Self::SynsetDistance => Some(Resource::Ontology),
            Self::EntailmentJudgement => Some(Resource::Judgements),
            _ => None,
        }
    }

    const fn needs_prover(self) -> bool {
        matches!(
            self,
            Self::ProverVerdict
                | Self::DomainNovelty
                | Self::RelationNovelty
                | Self::WordnetNovelty
                | Self::ModelNovelty
                | Self::ProverWordOverlap
        )
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered feature list and the column names derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSchema {
    features: Vec<FeatureId>,
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Derives the schema; rejects empty lists and duplicates.
    pub fn from_features(features: &[FeatureId]) -> Result<Self, FeatureError> {
        if features.is_empty() {
            return Err(FeatureError::EmptyFeatureList);
        }
        let mut seen = HashSet::new();
        if let Some(dup) = features.iter().find(|id| !seen.insert(**id)) {
            return Err(FeatureError::DuplicateFeature(dup.name()));
        }
        Ok(Self {
            features: features.to_vec(),
            columns: features.iter().flat_map(|id| id.columns()).collect(),
        })
    }

    /// Active features.
    #[must_use]
    pub fn features(&self) -> &[FeatureId] {
        &self.features
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Checks externally supplied column names against the derived ones.
    pub fn verify_columns(&self, configured: &[String]) -> Result<(), FeatureError> {
        if configured.len() != self.width() {
            return Err(FeatureError::SchemaMismatch {
                expected: self.width(),
                actual: configured.len(),
            });
        }
        match self
            .columns
            .iter()
            .zip(configured)
            .position(|(expected, configured)| expected != configured)
        {
            Some(position) => Err(FeatureError::ColumnNameMismatch {
                position,
                expected: self.columns[position].clone(),
                configured: configured[position].clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Lookup resources shared by every row of a batch.
#[derive(Default)]
pub struct FeatureResources {
    /// Word and gram embeddings.
    pub embeddings: Option<EmbeddingModel>,
    /// Lexical ontology.
    pub ontology: Option<Box<dyn LexicalOntology>>,
    /// External entailment judgements.
    pub judgements: Option<JudgementTable>,
    /// Remote complexity scorer; `None` when disabled.
    pub complexity: Option<Box<dyn ComplexitySource>>,
    /// Words ignored by the overlap scorers.
    pub stop_list: StopList,
    /// Gram toggles for the embedding aggregator.
    pub grams: GramSettings,
}

impl fmt::Debug for FeatureResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureResources")
            .field("embeddings", &self.embeddings.as_ref().map(EmbeddingModel::dim))
            .field("ontology", &self.ontology.is_some())
            .field("judgements", &self.judgements.as_ref().map(JudgementTable::len))
            .field("complexity", &self.complexity.is_some())
            .field("stop_words", &self.stop_list.len())
            .field("grams", &self.grams)
            .finish()
    }
}

impl FeatureResources {
    const fn has(&self, resource: Resource) -> bool {
        match resource {
            Resource::Embeddings => self.embeddings.is_some(),
            Resource::Ontology => self.ontology.is_some(),
            Resource::Judgements => self.judgements.is_some(),
        }
    }
}

/// One assembled row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Record identifier.
    pub record_id: String,
    /// Values in schema column order.
    pub values: Vec<f64>,
    /// Features that fell back to a missing or neutral value.
    pub missing: Vec<FeatureId>,
}

/// Builds rows for a validated feature list.
pub struct FeatureAssembler<'r> {
    schema: FeatureSchema,
    resources: &'r FeatureResources,
    telemetry: Option<FeatureTelemetry>,
}

impl fmt::Debug for FeatureAssembler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureAssembler")
            .field("columns", &self.schema.columns)
            .field("resources", self.resources)
            .finish_non_exhaustive()
    }
}

impl<'r> FeatureAssembler<'r> {
    /// Validates the feature list against `resources` and optional pinned columns.
    ///
    /// Every check runs before any record is processed; a failure here is a
    /// configuration error, not a per-record one.
    pub fn new(
        features: &[FeatureId],
        columns: Option<&[String]>,
        resources: &'r FeatureResources,
    ) -> Result<Self, FeatureError> {
        let schema = FeatureSchema::from_features(features)?;
        for id in schema.features() {
            if let Some(resource) = id.required_resource() {
                if !resources.has(resource) {
                    return Err(FeatureError::MissingResource {
                        feature: id.name(),
                        resource: resource.describe(),
                    });
                }
            }
        }
        if let Some(columns) = columns {
            schema.verify_columns(columns)?;
        }
        let assembler = Self {
            schema,
            resources,
            telemetry: None,
        };
        let probe = Record {
            id: "probe".into(),
            complexity: Some(ComplexityPair {
                premise: 0.0,
                hypothesis: 0.0,
            }),
            ..Record::default()
        };
        assembler.assemble(&probe)?;
        Ok(assembler)
    }

    /// Attaches telemetry for missing-value and batch events.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: FeatureTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// The derived schema.
    #[must_use]
    pub const fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Assembles one row. Only a malformed prover field fails a record.
    pub fn assemble(&self, record: &Record) -> Result<FeatureRow, FeatureError> {
        let mut values = Vec::with_capacity(self.schema.width());
        let mut missing = Vec::new();
        let (premise, hypothesis) = (record.premise.as_slice(), record.hypothesis.as_slice());
        let prover = self.prover_features(record, &mut missing)?;
        for &id in self.schema.features() {
            match id {
                FeatureId::EmbeddingDistance => {
                    let value = self.resources.embeddings.as_ref().map_or(MISSING_VALUE, |model| {
                        sentence_distance(premise, hypothesis, model, self.resources.grams)
                    });
                    values.push(value);
                }
                FeatureId::WordOverlap => {
                    values.push(word_overlap(premise, hypothesis, &self.resources.stop_list));
                }
                FeatureId::ParaphraseWordOverlap => values.push(paraphrase_word_overlap(
                    premise,
                    hypothesis,
                    &record.replacements,
                    &self.resources.stop_list,
                )),
                FeatureId::SynsetOverlap | FeatureId::SynsetDistance => {
                    let value = self.resources.ontology.as_deref().map_or(MISSING_VALUE, |onto| {
                        if id == FeatureId::SynsetOverlap {
                            synset_overlap(premise, hypothesis, onto)
                        } else {
                            synset_distance(premise, hypothesis, onto)
                        }
                    });
                    values.push(value);
                }
                FeatureId::LengthDifference => values.push(length_difference(premise, hypothesis)),
                FeatureId::ProverVerdict => values.push(f64::from(prover.verdict.id())),
                FeatureId::DomainNovelty => values.push(prover.domain_novelty),
                FeatureId::RelationNovelty => values.push(prover.relation_novelty),
                FeatureId::WordnetNovelty => values.push(prover.wordnet_novelty),
                FeatureId::ModelNovelty => values.push(prover.model_novelty),
                FeatureId::ProverWordOverlap => values.push(prover.word_overlap),
                FeatureId::PredictedLabel => {
                    let label = predicted_label(record.prediction.as_deref());
                    if label == VerdictLabel::Unrecognized {
                        self.unrecognized_label(record, id, record.prediction.as_deref());
                    }
                    values.push(f64::from(label.id()));
                }
                FeatureId::InstanceOverlap => values.push(instance_overlap(record.models())),
                FeatureId::RelationOverlap => values.push(relation_overlap(record.models())),
                FeatureId::ParaphraseInstanceOverlap => values.push(paraphrase_instance_overlap(
                    record.models(),
                    &record.replacements,
                )),
                FeatureId::ParaphraseRelationOverlap => values.push(paraphrase_relation_overlap(
                    record.models(),
                    &record.replacements,
                )),
                FeatureId::ComplexityDelta => match self.complexity(record) {
                    Ok(delta) => values.push(delta),
                    Err(err) => {
                        self.complexity_failed(record, &err);
                        missing.push(id);
                        values.push(MISSING_VALUE);
                    }
                },
                FeatureId::EntailmentJudgement => {
                    let judgement = self
                        .resources
                        .judgements
                        .as_ref()
                        .map(|table| table.lookup_or_default(&record.id))
                        .unwrap_or_default();
                    values.extend(judgement);
                }
            }
        }
        if values.len() != self.schema.width() {
            return Err(FeatureError::SchemaMismatch {
                expected: self.schema.width(),
                actual: values.len(),
            });
        }
        Ok(FeatureRow {
            record_id: record.id.clone(),
            values,
            missing,
        })
    }

    /// Assembles every record, stopping at the first record-level error.
    pub fn assemble_batch(&self, records: &[Record]) -> Result<Vec<FeatureRow>, FeatureError> {
        emit(
            self.telemetry.as_ref(),
            LogLevel::Info,
            "features.batch.start",
            json!({ "records": records.len(), "columns": self.schema.width() }),
        );
        let rows = records
            .iter()
            .map(|record| self.assemble(record))
            .collect::<Result<Vec<_>, _>>()?;
        let flagged = rows.iter().filter(|row| !row.missing.is_empty()).count();
        emit(
            self.telemetry.as_ref(),
            LogLevel::Info,
            "features.batch.complete",
            json!({ "rows": rows.len(), "flagged": flagged }),
        );
        Ok(rows)
    }

    fn prover_features(
        &self,
        record: &Record,
        missing: &mut Vec<FeatureId>,
    ) -> Result<ProverFeatures, FeatureError> {
        let active: Vec<FeatureId> = self
            .schema
            .features()
            .iter()
            .copied()
            .filter(|id| id.needs_prover())
            .collect();
        if active.is_empty() {
            return Ok(ProverFeatures::MISSING);
        }
        let Some(output) = &record.prover else {
            emit(
                self.telemetry.as_ref(),
                LogLevel::Debug,
                "features.record.missing",
                json!({ "record": record.id, "source": "prover" }),
            );
            missing.extend(active);
            return Ok(ProverFeatures::MISSING);
        };
        let features = ProverFeatures::parse(&record.id, output)?;
        if features.verdict == VerdictLabel::Unrecognized && active.contains(&FeatureId::ProverVerdict)
        {
            self.unrecognized_label(record, FeatureId::ProverVerdict, Some(&output.verdict));
        }
        Ok(features)
    }

    fn complexity(&self, record: &Record) -> Result<f64, ComplexityError> {
        if let Some(pair) = record.complexity {
            return Ok(precomputed_delta(pair));
        }
        let source = self
            .resources
            .complexity
            .as_deref()
            .ok_or(ComplexityError::Disabled)?;
        complexity_delta(&record.premise, &record.hypothesis, source)
    }

    fn complexity_failed(&self, record: &Record, err: &ComplexityError) {
        let level = if matches!(err, ComplexityError::Disabled) {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        };
        emit(
            self.telemetry.as_ref(),
            level,
            "features.complexity.failed",
            json!({ "record": record.id, "error": err.to_string() }),
        );
    }

    fn unrecognized_label(&self, record: &Record, feature: FeatureId, label: Option<&str>) {
        emit(
            self.telemetry.as_ref(),
            LogLevel::Warn,
            "features.label.unrecognized",
            json!({ "record": record.id, "feature": feature.name(), "label": label }),
        );
    }
}
