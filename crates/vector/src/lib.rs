//! PaperSeek Vector Search Engine
//!
//! Exact per-facet nearest-neighbor indexes (title, authors, abstract) kept
//! in lockstep with a record store, and weighted fusion of the three facet
//! rankings into one result list.

mod engine;
mod facet_index;
mod fusion;
mod persist;
mod store;
mod types;

pub use engine::{RetrievalEngine, SharedRetrievalEngine};
pub use facet_index::FacetIndex;
pub use fusion::{score_contribution, FusionRanker};
pub use store::{VectorStore, INDEX_MAGIC, INDEX_VERSION};
pub use types::{
    DocId, EngineConfig, Facet, FacetMap, FacetNeighbors, FacetVectors, IndexStats, Neighbor,
    ScoredDoc, SearchHit,
};
