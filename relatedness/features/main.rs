use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;
use uuid::Uuid;

use crate::{
    assembler::{FeatureAssembler, FeatureResources, FeatureRow, FeatureSchema},
    complexity::{ComplexitySource, HttpComplexityService},
    config::FeatureConfig,
    distributional::{CacheOutcome, EmbeddingModel},
    feature_store::FeatureStore,
    judgements::JudgementTable,
    overlap::StopList,
    record::Record,
    taxonomy::InMemoryOntology,
    telemetry::{emit, FeatureTelemetry},
};

/// Assembled rows of one batch with their column contract.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureMatrix {
    /// Column names.
    pub columns: Vec<String>,
    /// Record ids in row order.
    pub ids: Vec<String>,
    /// Gold relatedness scores in row order.
    pub targets: Vec<f64>,
    /// Assembled rows.
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    /// Dense `records x columns` view.
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let values: Vec<f64> = self
            .rows
            .iter()
            .flat_map(|row| row.values.iter().copied())
            .collect();
        Array2::from_shape_vec((self.rows.len(), self.columns.len()), values)
            .context("feature rows do not match the column count")
    }

    /// Number of rows carrying at least one missing feature.
    #[must_use]
    pub fn flagged(&self) -> usize {
        self.rows.iter().filter(|row| !row.missing.is_empty()).count()
    }
}

/// Owns the loaded resources and turns record batches into feature matrices.
pub struct FeaturePipeline {
    config: FeatureConfig,
    resources: FeatureResources,
    base_stop_list: StopList,
    stop_list_fitted: bool,
    feature_store: FeatureStore,
    telemetry: Option<FeatureTelemetry>,
}

impl FeaturePipeline {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> FeaturePipelineBuilder {
        FeaturePipelineBuilder::default()
    }

    /// Loads configuration and every configured resource.
    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().config_path(path)?.build()
    }

    /// Schema of the configured feature list.
    pub fn schema(&self) -> Result<FeatureSchema> {
        Ok(FeatureSchema::from_features(&self.config.features)?)
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Stop words currently applied by the overlap scorers.
    #[must_use]
    pub const fn stop_list(&self) -> &StopList {
        &self.resources.stop_list
    }

    /// Fixes the frequency-based stop words from `corpus`.
    ///
    /// Later batches reuse this list, so every batch shares one column meaning.
    pub fn fit_stop_list(&mut self, corpus: &[Record]) {
        let most_frequent = self.config.overlap.most_frequent;
        self.resources.stop_list = self
            .base_stop_list
            .clone()
            .with_most_frequent(corpus, most_frequent);
        self.stop_list_fitted = true;
        emit(
            self.telemetry.as_ref(),
            LogLevel::Info,
            "features.stop_list.fitted",
            json!({
                "corpus": corpus.len(),
                "most_frequent": most_frequent,
                "stop_words": self.resources.stop_list.len(),
            }),
        );
    }

    /// Assembles one row per record and persists them to the feature store.
    ///
    /// Without a prior [`Self::fit_stop_list`], the first batch fixes the frequency stop list.
    pub fn extract(&mut self, records: &[Record]) -> Result<FeatureMatrix> {
        if !self.stop_list_fitted && self.config.overlap.most_frequent > 0 {
            self.fit_stop_list(records);
        }
        let mut assembler = FeatureAssembler::new(
            &self.config.features,
            self.config.columns.as_deref(),
            &self.resources,
        )
        .context("validating feature configuration")?;
        if let Some(tel) = &self.telemetry {
            assembler = assembler.with_telemetry(tel.clone());
        }
        let rows = assembler
            .assemble_batch(records)
            .context("assembling feature rows")?;
        let batch_id = Uuid::new_v4();
        self.feature_store
            .persist_rows(&batch_id, assembler.schema(), &rows)?;
        let matrix = FeatureMatrix {
            columns: assembler.schema().columns().to_vec(),
            ids: records.iter().map(|r| r.id.clone()).collect(),
            targets: records.iter().map(|r| r.relatedness).collect(),
            rows,
        };
        emit(
            self.telemetry.as_ref(),
            LogLevel::Info,
            "features.extract.complete",
            json!({
                "batch_id": batch_id,
                "rows": matrix.rows.len(),
                "flagged": matrix.flagged(),
                "stop_words": self.resources.stop_list.len(),
            }),
        );
        Ok(matrix)
    }
}

/// Builder for [`FeaturePipeline`].
#[derive(Default)]
pub struct FeaturePipelineBuilder {
    config: Option<FeatureConfig>,
    telemetry: Option<FeatureTelemetry>,
    resources: Option<FeatureResources>,
    complexity: Option<Box<dyn ComplexitySource>>,
    feature_store: Option<FeatureStore>,
}

impl FeaturePipelineBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: FeatureConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Loads the configuration from a TOML file.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let config = FeatureConfig::load(path).context("loading feature configuration")?;
        self.config = Some(config);
        Ok(self)
    }

    /// Sets telemetry; otherwise one is built from `[telemetry]` when a log path is set.
    #[must_use]
    pub fn telemetry(mut self, telemetry: FeatureTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Uses prepared resources instead of loading them from the configured paths.
    #[must_use]
    pub fn resources(mut self, resources: FeatureResources) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Overrides the HTTP complexity client.
    #[must_use]
    pub fn complexity_source(mut self, source: Box<dyn ComplexitySource>) -> Self {
        self.complexity = Some(source);
        self
    }

    /// Injects a feature store.
    #[must_use]
    pub fn feature_store(mut self, store: FeatureStore) -> Self {
        self.feature_store = Some(store);
        self
    }

    /// Opens a feature store at the provided path.
    pub fn feature_store_path(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        self.feature_store = Some(FeatureStore::open(path)?);
        Ok(self)
    }

    /// Loads resources and validates the feature list against them.
    pub fn build(self) -> Result<FeaturePipeline> {
        let Some(config) = self.config else {
            bail!("feature pipeline requires a configuration");
        };
        let telemetry = match (self.telemetry, &config.telemetry.log_path) {
            (Some(tel), _) => Some(tel),
            (None, Some(path)) => Some(
                FeatureTelemetry::builder("features")
                    .log_path(path)
                    .build()
                    .with_context(|| format!("opening log {}", path.display()))?,
            ),
            (None, None) => None,
        };
        let mut resources = match self.resources {
            Some(resources) => resources,
            None => load_resources(&config, telemetry.as_ref())?,
        };
        if let Some(source) = self.complexity {
            resources.complexity = Some(source);
        }
        resources.grams = config.grams;
        let base_stop_list = StopList::new(config.overlap.stop_words.iter().cloned());
        resources.stop_list = base_stop_list.clone();
        FeatureAssembler::new(&config.features, config.columns.as_deref(), &resources)
            .context("validating feature configuration")?;
        emit(
            telemetry.as_ref(),
            LogLevel::Info,
            "features.pipeline.ready",
            json!({
                "features": config.features.iter().map(|id| id.name()).collect::<Vec<_>>(),
                "resources": format!("{resources:?}"),
            }),
        );
        Ok(FeaturePipeline {
            config,
            resources,
            base_stop_list,
            stop_list_fitted: false,
            feature_store: self.feature_store.unwrap_or_else(FeatureStore::disabled),
            telemetry,
        })
    }
}

fn load_resources(
    config: &FeatureConfig,
    telemetry: Option<&FeatureTelemetry>,
) -> Result<FeatureResources> {
    let mut resources = FeatureResources::default();
    if let Some(path) = &config.resources.embeddings {
        let model = match &config.resources.embedding_cache {
            Some(cache) => {
                let (model, outcome) = EmbeddingModel::load_with_cache(path, cache)
                    .with_context(|| format!("loading embeddings {}", path.display()))?;
                let (level, message) = match outcome {
                    CacheOutcome::Hit => (LogLevel::Info, "features.embeddings.cache_hit"),
                    CacheOutcome::Miss => (LogLevel::Info, "features.embeddings.cache_miss"),
                    CacheOutcome::Rebuilt => (LogLevel::Warn, "features.embeddings.cache_rebuilt"),
                };
                emit(telemetry, level, message, json!({ "cache": cache.display().to_string() }));
                model
            }
            None => EmbeddingModel::load_word2vec_text(path)
                .with_context(|| format!("loading embeddings {}", path.display()))?,
        };
        emit(
            telemetry,
            LogLevel::Info,
            "features.embeddings.loaded",
            json!({ "tokens": model.vocab().len(), "dim": model.dim() }),
        );
        resources.embeddings = Some(model);
    }
    if let Some(path) = &config.resources.ontology {
        let ontology = InMemoryOntology::load_json(path)
            .with_context(|| format!("loading ontology {}", path.display()))?;
        emit(
            telemetry,
            LogLevel::Info,
            "features.ontology.loaded",
            json!({ "synsets": ontology.len() }),
        );
        resources.ontology = Some(Box::new(ontology));
    }
    if let Some(path) = &config.resources.judgements {
        let table = JudgementTable::load(path)
            .with_context(|| format!("loading judgements {}", path.display()))?;
        emit(
            telemetry,
            LogLevel::Info,
            "features.judgements.loaded",
            json!({ "records": table.len() }),
        );
        resources.judgements = Some(table);
    }
    if config.complexity.enabled {
        let service =
            HttpComplexityService::new(&config.complexity.endpoint, config.complexity.timeout())
                .context("creating complexity client")?;
        emit(
            telemetry,
            LogLevel::Info,
            "features.complexity.enabled",
            json!({ "endpoint": service.endpoint(), "timeout_ms": config.complexity.timeout_ms }),
        );
        resources.complexity = Some(Box::new(service));
    }
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assembler::FeatureId, complexity::tests::LengthSource};
    use shared_logging::MemorySink;
    use std::{fs, sync::Arc};
    use tempfile::tempdir;

    const CONFIG: &str = r#"
features = ["embedding_distance", "word_overlap", "synset_overlap", "entailment_judgement", "complexity_delta"]

[overlap]
stop_words = ["a"]

[resources]
embeddings = "vectors.txt"
embedding_cache = "cache/vectors.bin"
ontology = "ontology.json"
judgements = "results.raw"
"#;

    const ONTOLOGY: &str = r#"[
        {"name": "animal.n.01", "lemmas": ["animal"]},
        {"name": "dog.n.01", "lemmas": ["dog"], "hypernyms": ["animal.n.01"]},
        {"name": "cat.n.01", "lemmas": ["cat"], "hypernyms": ["animal.n.01"]}
    ]"#;

    fn write_fixture(dir: &Path) -> PathBuf {
        fs::write(dir.join("vectors.txt"), "3 2\ndog 1.0 0.0\ncat 0.0 1.0\nruns 1.0 1.0\n").unwrap();
        fs::write(dir.join("ontology.json"), ONTOLOGY).unwrap();
        fs::write(dir.join("results.raw"), "p1 x y ENTAILMENT\n").unwrap();
        let path = dir.join("features.toml");
        fs::write(&path, CONFIG).unwrap();
        path
    }

    fn records() -> Vec<Record> {
        let mut first = Record::new("p1", &["a", "dog", "runs"], &["a", "dog", "runs"]);
        first.relatedness = 4.5;
        let mut second = Record::new("p2", &["a", "cat"], &["a", "dog", "runs"]);
        second.relatedness = 2.0;
        vec![first, second]
    }

    #[test]
    fn loads_resources_from_config_and_extracts() {
        let dir = tempdir().unwrap();
        let config = write_fixture(dir.path());
        let memory = Arc::new(MemorySink::new());
        let telemetry = FeatureTelemetry::builder("features")
            .sink(memory.clone())
            .build()
            .unwrap();
        let mut pipeline = FeaturePipeline::builder()
            .config_path(&config)
            .unwrap()
            .telemetry(telemetry)
            .feature_store_path(dir.path().join("rows.jsonl"))
            .unwrap()
            .build()
            .unwrap();
        assert!(dir.path().join("cache/vectors.bin").exists());
        assert_eq!(memory.matching("features.embeddings.cache_miss").len(), 1);

        let matrix = pipeline.extract(&records()).unwrap();
        assert_eq!(matrix.columns.len(), 7);
        assert_eq!(matrix.ids, vec!["p1", "p2"]);
        assert_eq!(matrix.targets, vec![4.5, 2.0]);
        let first = &matrix.rows[0].values;
        assert!(first[0].abs() < 1e-12);
        assert_eq!(first[1], 1.0);
        assert_eq!(first[2], 1.0);
        assert_eq!(&first[3..6], &[0.0, 1.0, 0.0]);
        // complexity disabled and nothing precomputed
        assert!(first[6].is_nan());
        assert_eq!(matrix.flagged(), 2);
        assert_eq!(matrix.to_array().unwrap().dim(), (2, 7));

        let stored = fs::read_to_string(dir.path().join("rows.jsonl")).unwrap();
        assert_eq!(stored.lines().count(), 3);
    }

    #[test]
    fn second_build_reads_embedding_cache() {
        let dir = tempdir().unwrap();
        let config = write_fixture(dir.path());
        FeaturePipeline::from_config_path(&config).unwrap();
        let memory = Arc::new(MemorySink::new());
        let telemetry = FeatureTelemetry::builder("features")
            .sink(memory.clone())
            .build()
            .unwrap();
        FeaturePipeline::builder()
            .config_path(&config)
            .unwrap()
            .telemetry(telemetry)
            .build()
            .unwrap();
        assert_eq!(memory.matching("features.embeddings.cache_hit").len(), 1);
    }

    #[test]
    fn missing_resource_fails_build() {
        let config =
            FeatureConfig::from_toml_str(r#"features = ["synset_distance"]"#, ".").unwrap();
        let err = FeaturePipeline::builder().config(config).build().err().unwrap();
        assert!(format!("{err:#}").contains("lexical ontology"));
    }

    #[test]
    fn frequent_tokens_join_stop_list() {
        let raw = "features = [\"word_overlap\", \"complexity_delta\"]\n[overlap]\nmost_frequent = 1\n";
        let config = FeatureConfig::from_toml_str(raw, ".").unwrap();
        let mut pipeline = FeaturePipeline::builder()
            .config(config)
            .resources(FeatureResources::default())
            .complexity_source(Box::new(LengthSource))
            .build()
            .unwrap();
        // "a" is the most frequent token and is dropped: {dog, runs} vs {dog, runs}; {cat} vs {dog, runs}
        let matrix = pipeline.extract(&records()).unwrap();
        assert_eq!(matrix.rows[0].values, vec![1.0, 0.0]);
        assert_eq!(matrix.rows[1].values, vec![0.0, 1.0]);
        assert_eq!(
            pipeline.schema().unwrap().features(),
            [FeatureId::WordOverlap, FeatureId::ComplexityDelta]
        );
    }

    fn capitalized_records() -> Vec<Record> {
        vec![
            Record::new("c1", &["A", "man", "runs"], &["A", "dog", "runs"]),
            Record::new("c2", &["A", "cat"], &["A", "bird"]),
        ]
    }

    fn overlap_pipeline(most_frequent: usize) -> FeaturePipeline {
        let raw = format!("features = [\"word_overlap\"]\n[overlap]\nmost_frequent = {most_frequent}\n");
        let config = FeatureConfig::from_toml_str(&raw, ".").unwrap();
        FeaturePipeline::builder()
            .config(config)
            .resources(FeatureResources::default())
            .build()
            .unwrap()
    }

    #[test]
    fn frequent_capitalized_token_is_filtered() {
        let mut pipeline = overlap_pipeline(1);
        let matrix = pipeline.extract(&capitalized_records()).unwrap();
        assert!(pipeline.stop_list().contains("A"));
        assert!((matrix.rows[0].values[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(matrix.rows[1].values[0], 0.0);
    }

    #[test]
    fn stop_list_is_fitted_once() {
        let mut pipeline = overlap_pipeline(1);
        pipeline.fit_stop_list(&capitalized_records());
        // "a" dominates this batch but the fitted list keeps "A".
        let batch = vec![Record::new("l1", &["a", "a", "dog"], &["a", "cat"])];
        let first = pipeline.extract(&batch).unwrap();
        assert!(pipeline.stop_list().contains("A"));
        assert!(!pipeline.stop_list().contains("a"));
        let second = pipeline.extract(&records()).unwrap();
        assert!(!pipeline.stop_list().contains("a"));
        // {a, dog} vs {a, cat}
        assert!((first.rows[0].values[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(second.rows[0].values[0], 1.0);
    }
}
