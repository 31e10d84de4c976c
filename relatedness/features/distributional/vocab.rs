use std::{
    fs::{self, File},
    io::{BufRead, BufReader},
    path::Path,
};

use indexmap::IndexSet;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::EmbeddingError;

const CACHE_MAGIC: [u8; 4] = *b"RLEM";
const CACHE_VERSION: u8 = 1;

/// Token (or `_`-joined gram) to dense id. Ids are insertion positions.
#[derive(Debug, Clone, Default)]
pub struct VocabularyIndex {
    tokens: IndexSet<String>,
}

impl VocabularyIndex {
    /// Builds an index, rejecting duplicates so ids stay unique.
    pub fn from_tokens(tokens: impl IntoIterator<Item = String>) -> Result<Self, EmbeddingError> {
        let mut index = IndexSet::new();
        for token in tokens {
            if let (_, false) = index.insert_full(token.clone()) {
                return Err(EmbeddingError::DuplicateToken(token));
            }
        }
        Ok(Self { tokens: index })
    }

    /// Id of `token`, if known.
    #[must_use]
    pub fn id(&self, token: &str) -> Option<usize> {
        self.tokens.get_index_of(token)
    }

    /// Whether `token` is known.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Token stored under `id`.
    #[must_use]
    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get_index(id).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Row-per-id embedding matrix.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    rows: Array2<f32>,
}

impl EmbeddingTable {
    /// Wraps a `(vocab, dim)` matrix.
    #[must_use]
    pub fn new(rows: Array2<f32>) -> Self {
        Self { rows }
    }

    /// Vector width.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.rows.ncols()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    /// True when the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    /// Row for `id`.
    #[must_use]
    pub fn row(&self, id: usize) -> Option<ArrayView1<'_, f32>> {
        (id < self.rows.nrows()).then(|| self.rows.row(id))
    }
}

#[derive(Serialize, Deserialize)]
struct CachePayload {
    tokens: Vec<String>,
    dim: usize,
    values: Vec<f32>,
}

/// How [`EmbeddingModel::load_with_cache`] obtained its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Read from a current cache.
    Hit,
    /// No cache yet; the text was parsed and a cache written.
    Miss,
    /// The cache was unreadable or older than the text; it was rewritten.
    Rebuilt,
}

/// Vocabulary plus embedding table, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct EmbeddingModel {
    vocab: VocabularyIndex,
    table: EmbeddingTable,
}

impl EmbeddingModel {
    /// Pairs a vocabulary with its table.
    pub fn new(vocab: VocabularyIndex, table: EmbeddingTable) -> Result<Self, EmbeddingError> {
        if vocab.len() != table.len() {
            return Err(EmbeddingError::ShapeMismatch {
                vocab: vocab.len(),
                rows: table.len(),
            });
        }
        Ok(Self { vocab, table })
    }

    /// Builds a model from `(token, vector)` pairs of equal width.
    pub fn from_entries(dim: usize, entries: Vec<(String, Vec<f32>)>) -> Result<Self, EmbeddingError> {
        let mut tokens = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len() * dim);
        for (idx, (token, vector)) in entries.into_iter().enumerate() {
            if vector.len() != dim {
                return Err(EmbeddingError::InvalidVector {
                    line: idx + 1,
                    reason: format!("expected {dim} components, found {}", vector.len()),
                });
            }
            tokens.push(token);
            values.extend(vector);
        }
        Self::from_parts(tokens, dim, values)
    }

    fn from_parts(tokens: Vec<String>, dim: usize, values: Vec<f32>) -> Result<Self, EmbeddingError> {
        let rows = tokens.len();
        let found = values.len() / dim.max(1);
        let vocab = VocabularyIndex::from_tokens(tokens)?;
        let matrix = Array2::from_shape_vec((rows, dim), values).map_err(|_| {
            EmbeddingError::ShapeMismatch {
                vocab: rows,
                rows: found,
            }
        })?;
        Self::new(vocab, EmbeddingTable::new(matrix))
    }

    /// Vocabulary.
    #[must_use]
    pub fn vocab(&self) -> &VocabularyIndex {
        &self.vocab
    }

    /// Vector width.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.table.dim()
    }

    /// Vector for `token`, if known.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<ArrayView1<'_, f32>> {
        self.vocab.id(token).and_then(|id| self.table.row(id))
    }

    /// Parses word2vec text output: a `<count> <dim>` header then one vector per line.
    pub fn load_word2vec_text(path: impl AsRef<Path>) -> Result<Self, EmbeddingError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut lines = reader.lines();
        let header = lines.next().transpose()?.unwrap_or_default();
        let (count, dim) = parse_header(&header)?;
        let mut tokens = Vec::with_capacity(count);
        let mut values = Vec::with_capacity(count * dim);
        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 2;
            let mut parts = line.split_whitespace();
            let token = parts.next().unwrap_or_default().to_string();
            let before = values.len();
            for part in parts {
                let value: f32 = part.parse().map_err(|_| EmbeddingError::InvalidVector {
                    line: line_no,
                    reason: format!("non-numeric component {part:?}"),
                })?;
                values.push(value);
            }
            if values.len() - before != dim {
                return Err(EmbeddingError::InvalidVector {
                    line: line_no,
                    reason: format!("expected {dim} components, found {}", values.len() - before),
                });
            }
            tokens.push(token);
        }
        if tokens.len() != count {
            return Err(EmbeddingError::ShapeMismatch {
                vocab: count,
                rows: tokens.len(),
            });
        }
        Self::from_parts(tokens, dim, values)
    }

    /// Writes the binary cache: magic, version, bincode payload.
    pub fn save_cache(&self, path: impl AsRef<Path>) -> Result<(), EmbeddingError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = CachePayload {
            tokens: self.vocab.tokens.iter().cloned().collect(),
            dim: self.dim(),
            values: self.table.rows.iter().copied().collect(),
        };
        let mut data = Vec::with_capacity(5 + payload.values.len() * 4);
        data.extend_from_slice(&CACHE_MAGIC);
        data.push(CACHE_VERSION);
        data.extend(bincode::serialize(&payload)?);
        let temp = path.with_extension("tmp");
        fs::write(&temp, &data)?;
        fs::rename(&temp, path)?;
        Ok(())
    }

    /// Reads a cache written by [`Self::save_cache`].
    pub fn load_cache(path: impl AsRef<Path>) -> Result<Self, EmbeddingError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        if data.len() < 5 || data[..4] != CACHE_MAGIC || data[4] != CACHE_VERSION {
            return Err(EmbeddingError::CacheHeader(path.display().to_string()));
        }
        let payload: CachePayload = bincode::deserialize(&data[5..])?;
        Self::from_parts(payload.tokens, payload.dim, payload.values)
    }

    /// Prefers the cache; otherwise parses the text file and writes the cache.
    ///
    /// A cache older than the text, or one that fails to decode, is rebuilt
    /// from the text. Without the text file a cache error is returned as is.
    pub fn load_with_cache(
        text_path: impl AsRef<Path>,
        cache_path: impl AsRef<Path>,
    ) -> Result<(Self, CacheOutcome), EmbeddingError> {
        let text_path = text_path.as_ref();
        let cache_path = cache_path.as_ref();
        let outcome = if !cache_path.exists() {
            CacheOutcome::Miss
        } else if cache_is_stale(text_path, cache_path) {
            CacheOutcome::Rebuilt
        } else {
            match Self::load_cache(cache_path) {
                Ok(model) => return Ok((model, CacheOutcome::Hit)),
                Err(_) if text_path.exists() => CacheOutcome::Rebuilt,
                Err(err) => return Err(err),
            }
        };
        let model = Self::load_word2vec_text(text_path)?;
        model.save_cache(cache_path)?;
        Ok((model, outcome))
    }
}

fn cache_is_stale(text_path: &Path, cache_path: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();
    matches!(
        (modified(text_path), modified(cache_path)),
        (Some(text), Some(cache)) if text > cache
    )
}

fn parse_header(header: &str) -> Result<(usize, usize), EmbeddingError> {
    let mut parts = header.split_whitespace().map(str::parse::<usize>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(count)), Some(Ok(dim)), None) if dim > 0 => Ok((count, dim)),
        _ => Err(EmbeddingError::InvalidHeader(header.to_string())),
    }
}
