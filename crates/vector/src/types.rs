use paperseek_common::{IndexPaths, Record, RelevanceWeights};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Positional document identifier shared by all facet stores and the record store
pub type DocId = usize;

/// One independently indexed metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Title,
    Authors,
    Abstract,
}

impl Facet {
    /// All facets in storage order
    pub const ALL: [Facet; 3] = [Facet::Title, Facet::Authors, Facet::Abstract];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Title => "title",
            Facet::Authors => "authors",
            Facet::Abstract => "abstract",
        }
    }

    /// Fusion weight configured for this facet
    pub fn weight(&self, weights: &RelevanceWeights) -> f32 {
        match self {
            Facet::Title => weights.title,
            Facet::Authors => weights.authors,
            Facet::Abstract => weights.abstract_text,
        }
    }

    /// Text of this facet in a record
    pub fn text<'a>(&self, record: &'a Record) -> &'a str {
        match self {
            Facet::Title => &record.title,
            Facet::Authors => &record.authors,
            Facet::Abstract => &record.abstract_text,
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per facet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetMap<T> {
    pub title: T,
    pub authors: T,
    pub abstract_text: T,
}

impl<T> FacetMap<T> {
    pub fn new(title: T, authors: T, abstract_text: T) -> Self {
        Self {
            title,
            authors,
            abstract_text,
        }
    }

    /// Build by evaluating `f` for each facet in storage order
    pub fn try_from_fn<E>(mut f: impl FnMut(Facet) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            title: f(Facet::Title)?,
            authors: f(Facet::Authors)?,
            abstract_text: f(Facet::Abstract)?,
        })
    }

    pub fn get(&self, facet: Facet) -> &T {
        match facet {
            Facet::Title => &self.title,
            Facet::Authors => &self.authors,
            Facet::Abstract => &self.abstract_text,
        }
    }

    pub fn get_mut(&mut self, facet: Facet) -> &mut T {
        match facet {
            Facet::Title => &mut self.title,
            Facet::Authors => &mut self.authors,
            Facet::Abstract => &mut self.abstract_text,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Facet, &T)> {
        Facet::ALL.into_iter().map(move |facet| (facet, self.get(facet)))
    }
}

/// Embedding vectors for all three facets of one document or query
pub type FacetVectors = FacetMap<Vec<f32>>;

/// Per-facet nearest-neighbor lists
pub type FacetNeighbors = FacetMap<Vec<Neighbor>>;

/// Nearest-neighbor match in one facet store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub doc_id: DocId,

    /// Squared Euclidean distance to the query
    pub distance: f32,
}

impl Neighbor {
    pub fn new(doc_id: DocId, distance: f32) -> Self {
        Self { doc_id, distance }
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Closer first, then lower docId
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Fused document score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
}

/// Search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,

    /// Fused relevance score (higher is better)
    pub score: f32,

    pub record: Record,
}

/// Index statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub dimension: usize,
}

/// Retrieval engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Embedding dimension of every facet store
    pub dimension: usize,

    pub weights: RelevanceWeights,

    /// Minimum neighbors fetched per facet before fusion
    pub lookahead: usize,

    pub paths: IndexPaths,
}

impl EngineConfig {
    pub fn from_app_config(config: &paperseek_common::AppConfig) -> Self {
        Self {
            dimension: config.embedding_dim,
            weights: config.weights,
            lookahead: config.lookahead,
            paths: config.index_paths(),
        }
    }
}
