use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::{assembler::FeatureId, distributional::GramSettings};

/// Default parser endpoint returning a DRS as XML.
pub const DEFAULT_COMPLEXITY_ENDPOINT: &str = "http://127.0.0.1:7777/raw/pipeline?format=xml";

/// Feature extraction configuration loaded from TOML.
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Active features in column order.
    pub features: Vec<FeatureId>,
    /// Column names the downstream consumer expects, if pinned.
    pub columns: Option<Vec<String>>,
    /// Bigram/trigram toggles for the embedding aggregator.
    pub grams: GramSettings,
    /// Stop words for the overlap scorers.
    pub overlap: OverlapSettings,
    /// External resource locations.
    pub resources: ResourcePaths,
    /// Remote complexity service.
    pub complexity: ComplexitySettings,
    /// Log destination.
    pub telemetry: TelemetrySettings,
    source_dir: PathBuf,
}

impl FeatureConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading feature config {}", path.display()))?;
        let source_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_toml_str(&raw, source_dir).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parses a configuration; relative paths resolve against `source_dir`.
    pub fn from_toml_str(raw: &str, source_dir: impl Into<PathBuf>) -> Result<Self> {
        let document: FeatureConfigSerde = toml::from_str(raw)?;
        if document.features.is_empty() {
            bail!("no features configured");
        }
        if document.complexity.enabled && document.complexity.timeout_ms == 0 {
            bail!("complexity.timeout_ms must be positive");
        }
        if document.complexity.enabled && document.complexity.endpoint.trim().is_empty() {
            bail!("complexity.endpoint is empty");
        }
        let mut config = Self {
            features: document.features,
            columns: document.columns,
            grams: document.grams,
            overlap: document.overlap,
            resources: document.resources,
            complexity: document.complexity,
            telemetry: document.telemetry,
            source_dir: source_dir.into(),
        };
        config.resolve_resource_paths();
        Ok(config)
    }

    /// Resolves a path relative to the configuration file.
    #[must_use]
    pub fn resolve_path(&self, candidate: impl AsRef<Path>) -> PathBuf {
        let candidate = candidate.as_ref();
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.source_dir.join(candidate)
        }
    }

    fn resolve_resource_paths(&mut self) {
        let resolved = ResourcePaths {
            embeddings: self.resources.embeddings.as_ref().map(|p| self.resolve_path(p)),
            embedding_cache: self
                .resources
                .embedding_cache
                .as_ref()
                .map(|p| self.resolve_path(p)),
            ontology: self.resources.ontology.as_ref().map(|p| self.resolve_path(p)),
            judgements: self.resources.judgements.as_ref().map(|p| self.resolve_path(p)),
        };
        self.resources = resolved;
        self.telemetry.log_path = self.telemetry.log_path.as_ref().map(|p| self.resolve_path(p));
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeatureConfigSerde {
    #[serde(default)]
    features: Vec<FeatureId>,
    #[serde(default)]
    columns: Option<Vec<String>>,
    #[serde(default)]
    grams: GramSettings,
    #[serde(default)]
    overlap: OverlapSettings,
    #[serde(default)]
    resources: ResourcePaths,
    #[serde(default)]
    complexity: ComplexitySettings,
    #[serde(default)]
    telemetry: TelemetrySettings,
}

/// Stop-word configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverlapSettings {
    /// Explicit stop words.
    #[serde(default)]
    pub stop_words: Vec<String>,
    /// Also ignore this many of the corpus's most frequent tokens.
    #[serde(default)]
    pub most_frequent: usize,
}

/// Locations of the lookup resources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourcePaths {
    /// word2vec text file.
    pub embeddings: Option<PathBuf>,
    /// Binary cache written after the first text load.
    pub embedding_cache: Option<PathBuf>,
    /// JSON synset graph.
    pub ontology: Option<PathBuf>,
    /// Entailment classifier results.
    pub judgements: Option<PathBuf>,
}

/// Remote complexity service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ComplexitySettings {
    /// Whether requests may be sent at all.
    #[serde(default)]
    pub enabled: bool,
    /// POST endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ComplexitySettings {
    /// Timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ComplexitySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetrySettings {
    /// JSON-lines log file; logging is off when unset.
    pub log_path: Option<PathBuf>,
}

fn default_endpoint() -> String {
    DEFAULT_COMPLEXITY_ENDPOINT.to_string()
}

const fn default_timeout_ms() -> u64 {
    5_000
}
