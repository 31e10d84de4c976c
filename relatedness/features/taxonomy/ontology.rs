use std::{
    collections::{HashMap, VecDeque},
    fs,
    path::Path,
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;

/// Word class of a sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PartOfSpeech {
    /// `n`
    #[default]
    #[serde(rename = "n")]
    Noun,
    /// `v`
    #[serde(rename = "v")]
    Verb,
    /// `a`
    #[serde(rename = "a")]
    Adjective,
    /// `r`
    #[serde(rename = "r")]
    Adverb,
}

/// A set of synonymous lemmas with links to more general senses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synset {
    /// Unique name, e.g. `dog.n.01`.
    pub name: String,
    /// Word class.
    #[serde(default)]
    pub pos: PartOfSpeech,
    /// Lemma names in sense order.
    pub lemmas: Vec<String>,
    /// Names of direct hypernyms.
    #[serde(default)]
    pub hypernyms: Vec<String>,
}

/// Result of a sense query. Absent senses are expected, not errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SenseLookup<'a> {
    /// The requested sense exists.
    Found(&'a Synset),
    /// The lemma has no such sense.
    NotFound,
}

impl<'a> SenseLookup<'a> {
    /// Converts into an `Option`.
    #[must_use]
    pub const fn found(self) -> Option<&'a Synset> {
        match self {
            Self::Found(synset) => Some(synset),
            Self::NotFound => None,
        }
    }
}

/// Read-only lexical ontology.
pub trait LexicalOntology: Send + Sync {
    /// The `sense`-th (1-based) sense of `lemma` in word class `pos`.
    fn synset(&self, lemma: &str, pos: PartOfSpeech, sense: usize) -> SenseLookup<'_>;

    /// `1 / (1 + shortest hypernym path)`, or `None` without a common ancestor.
    fn path_similarity(&self, a: &Synset, b: &Synset) -> Option<f64>;
}

/// Hypernym graph held in memory, loadable from a JSON array of synsets.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOntology {
    synsets: IndexMap<String, Synset>,
    senses: HashMap<(String, PartOfSpeech), Vec<usize>>,
}

impl InMemoryOntology {
    /// Builds the graph; a lemma's senses are numbered in input order.
    pub fn from_synsets(synsets: Vec<Synset>) -> Result<Self, FeatureError> {
        let mut by_name = IndexMap::with_capacity(synsets.len());
        for synset in synsets {
            if by_name.contains_key(&synset.name) {
                return Err(FeatureError::Ontology(format!("duplicate synset {}", synset.name)));
            }
            by_name.insert(synset.name.clone(), synset);
        }
        let mut senses: HashMap<(String, PartOfSpeech), Vec<usize>> = HashMap::new();
        for (idx, synset) in by_name.values().enumerate() {
            if let Some(missing) = synset.hypernyms.iter().find(|h| !by_name.contains_key(*h)) {
                return Err(FeatureError::Ontology(format!(
                    "{} names unknown hypernym {missing}",
                    synset.name
                )));
            }
            for lemma in &synset.lemmas {
                senses
                    .entry((lemma.to_lowercase(), synset.pos))
                    .or_default()
                    .push(idx);
            }
        }
        Ok(Self {
            synsets: by_name,
            senses,
        })
    }

    /// Loads a JSON array of [`Synset`]s.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FeatureError> {
        let data = fs::read_to_string(path)?;
        let synsets: Vec<Synset> = serde_json::from_str(&data)?;
        Self::from_synsets(synsets)
    }

    /// Number of synsets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.synsets.len()
    }

    /// True when the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.synsets.is_empty()
    }

    fn hypernym_distances(&self, start: usize) -> HashMap<usize, usize> {
        let mut distances = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let depth = distances[&current];
            let Some((_, synset)) = self.synsets.get_index(current) else {
                continue;
            };
            for hypernym in &synset.hypernyms {
                if let Some(idx) = self.synsets.get_index_of(hypernym) {
                    if !distances.contains_key(&idx) {
                        distances.insert(idx, depth + 1);
                        queue.push_back(idx);
                    }
                }
            }
        }
        distances
    }
}

impl LexicalOntology for InMemoryOntology {
    fn synset(&self, lemma: &str, pos: PartOfSpeech, sense: usize) -> SenseLookup<'_> {
        let key = (lemma.to_lowercase(), pos);
        sense
            .checked_sub(1)
            .and_then(|offset| self.senses.get(&key)?.get(offset))
            .and_then(|idx| self.synsets.get_index(*idx))
            .map_or(SenseLookup::NotFound, |(_, synset)| SenseLookup::Found(synset))
    }

    #[allow(clippy::cast_precision_loss)]
    fn path_similarity(&self, a: &Synset, b: &Synset) -> Option<f64> {
        let a = self.synsets.get_index_of(&a.name)?;
        let b = self.synsets.get_index_of(&b.name)?;
        let from_a = self.hypernym_distances(a);
        let from_b = self.hypernym_distances(b);
        from_a
            .iter()
            .filter_map(|(node, da)| from_b.get(node).map(|db| da + db))
            .min()
            .map(|distance| 1.0 / (distance as f64 + 1.0))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn synset(name: &str, lemmas: &[&str], hypernyms: &[&str]) -> Synset {
        Synset {
            name: name.into(),
            pos: PartOfSpeech::Noun,
            lemmas: lemmas.iter().map(|l| (*l).to_string()).collect(),
            hypernyms: hypernyms.iter().map(|h| (*h).to_string()).collect(),
        }
    }

    /// entity <- animal <- {dog, cat}; entity <- artifact <- ball; dog also names a hotdog.
    pub(crate) fn sample() -> InMemoryOntology {
        InMemoryOntology::from_synsets(vec![
            synset("entity.n.01", &["entity"], &[]),
            synset("animal.n.01", &["animal", "beast"], &["entity.n.01"]),
            synset("dog.n.01", &["dog", "domestic_dog"], &["animal.n.01"]),
            synset("cat.n.01", &["cat", "true_cat"], &["animal.n.01"]),
            synset("artifact.n.01", &["artifact"], &["entity.n.01"]),
            synset("ball.n.01", &["ball"], &["artifact.n.01"]),
            synset("frank.n.02", &["frank", "dog", "hotdog"], &["artifact.n.01"]),
        ])
        .unwrap()
    }

    #[test]
    fn senses_are_numbered_from_one() {
        let onto = sample();
        assert_eq!(
            onto.synset("dog", PartOfSpeech::Noun, 1).found().unwrap().name,
            "dog.n.01"
        );
        assert_eq!(
            onto.synset("Dog", PartOfSpeech::Noun, 2).found().unwrap().name,
            "frank.n.02"
        );
        assert_eq!(onto.synset("dog", PartOfSpeech::Noun, 0), SenseLookup::NotFound);
        assert_eq!(onto.synset("dog", PartOfSpeech::Noun, 3), SenseLookup::NotFound);
        assert_eq!(onto.synset("dog", PartOfSpeech::Verb, 1), SenseLookup::NotFound);
    }

    #[test]
    fn path_similarity_follows_common_hypernym() {
        let onto = sample();
        let dog = onto.synset("dog", PartOfSpeech::Noun, 1).found().unwrap();
        let cat = onto.synset("cat", PartOfSpeech::Noun, 1).found().unwrap();
        let ball = onto.synset("ball", PartOfSpeech::Noun, 1).found().unwrap();
        assert_eq!(onto.path_similarity(dog, dog), Some(1.0));
        assert_eq!(onto.path_similarity(dog, cat), Some(1.0 / 3.0));
        assert_eq!(onto.path_similarity(dog, ball), Some(1.0 / 5.0));
    }

    #[test]
    fn disconnected_senses_have_no_similarity() {
        let onto = InMemoryOntology::from_synsets(vec![
            synset("a.n.01", &["a"], &[]),
            synset("b.n.01", &["b"], &[]),
        ])
        .unwrap();
        let a = onto.synset("a", PartOfSpeech::Noun, 1).found().unwrap();
        let b = onto.synset("b", PartOfSpeech::Noun, 1).found().unwrap();
        assert_eq!(onto.path_similarity(a, b), None);
    }

    #[test]
    fn loads_json_and_rejects_dangling_hypernyms() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ontology.json");
        fs::write(
            &path,
            r#"[{"name":"entity.n.01","lemmas":["entity"]},
                {"name":"dog.n.01","pos":"n","lemmas":["dog"],"hypernyms":["entity.n.01"]}]"#,
        )
        .unwrap();
        assert_eq!(InMemoryOntology::load_json(&path).unwrap().len(), 2);

        let broken = InMemoryOntology::from_synsets(vec![synset("dog.n.01", &["dog"], &["canine.n.02"])]);
        assert!(matches!(broken, Err(FeatureError::Ontology(_))));
    }
}
