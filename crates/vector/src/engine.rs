use paperseek_common::{PaperSeekError, Record, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::facet_index::FacetIndex;
use crate::fusion::FusionRanker;
use crate::types::{DocId, EngineConfig, FacetVectors, IndexStats, SearchHit};

/// Multi-facet retrieval engine
pub struct RetrievalEngine {
    config: EngineConfig,
    index: FacetIndex,
    ranker: FusionRanker,
}

impl RetrievalEngine {
    /// Create engine with an empty index
    pub fn new(config: EngineConfig) -> Result<Self> {
        if config.dimension == 0 {
            return Err(PaperSeekError::config("Embedding dimension cannot be 0"));
        }
        let ranker = FusionRanker::new(config.weights)?;
        let index = FacetIndex::new(config.dimension);

        info!(
            "Retrieval engine initialized - dimension: {}, lookahead: {}",
            config.dimension, config.lookahead
        );

        Ok(Self {
            config,
            index,
            ranker,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &FacetIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.index.len(),
            dimension: self.config.dimension,
        }
    }

    /// Add document, returning its docId
    pub fn add(&mut self, record: Record, vectors: &FacetVectors) -> Result<DocId> {
        let doc_id = self.index.add_entry(vectors, record)?;
        debug!("Added docId {} ({} documents)", doc_id, self.index.len());
        Ok(doc_id)
    }

    /// Top `k` records for the query vectors, best first
    pub fn search(&self, query: &FacetVectors, k: usize) -> Result<Vec<SearchHit>> {
        let per_facet_k = k.max(self.config.lookahead);
        let per_facet = self.index.search_facets(query, per_facet_k)?;
        let fused = self.ranker.fuse(&per_facet, k);

        // alignment was checked in search_facets, so every fused docId has a record
        let hits = fused
            .into_iter()
            .map(|scored| {
                let record = self
                    .index
                    .record(scored.doc_id)
                    .ok_or(PaperSeekError::RecordNotFound(scored.doc_id))?;
                Ok(SearchHit {
                    doc_id: scored.doc_id,
                    score: scored.score,
                    record: record.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Search completed - k: {}, per-facet k: {}, results: {}",
            k,
            per_facet_k,
            hits.len()
        );
        Ok(hits)
    }

    /// Save all three facet indexes and the metadata file
    pub fn persist_all(&self) -> Result<()> {
        self.index.persist(&self.config.paths)
    }

    /// Replace in-memory state with the persisted state
    ///
    /// On any failure the current state is kept as it was.
    pub fn restore_all(&mut self) -> Result<()> {
        match FacetIndex::restore(&self.config.paths, self.config.dimension) {
            Ok(index) => {
                self.index = index;
                info!("Restored {} documents", self.index.len());
                Ok(())
            }
            Err(e) => {
                warn!("Restore failed, keeping current state: {}", e);
                Err(e)
            }
        }
    }

    /// Whether all four persisted artifacts exist
    pub fn has_persisted_state(&self) -> bool {
        self.config.paths.all_exist()
    }
}

/// Engine behind a single lock for use from several threads
///
/// Every operation holds the lock for its whole duration, so `add` can never
/// interleave with another call.
#[derive(Clone)]
pub struct SharedRetrievalEngine {
    inner: Arc<Mutex<RetrievalEngine>>,
}

impl SharedRetrievalEngine {
    pub fn new(engine: RetrievalEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn add(&self, record: Record, vectors: &FacetVectors) -> Result<DocId> {
        self.inner.lock().add(record, vectors)
    }

    pub fn search(&self, query: &FacetVectors, k: usize) -> Result<Vec<SearchHit>> {
        self.inner.lock().search(query, k)
    }

    pub fn persist_all(&self) -> Result<()> {
        self.inner.lock().persist_all()
    }

    pub fn restore_all(&self) -> Result<()> {
        self.inner.lock().restore_all()
    }

    pub fn stats(&self) -> IndexStats {
        self.inner.lock().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Facet, FacetMap};
    use paperseek_common::{IndexPaths, RelevanceWeights};
    use std::path::Path;

    fn config(dir: &Path, weights: RelevanceWeights) -> EngineConfig {
        EngineConfig {
            dimension: 4,
            weights,
            lookahead: 10,
            paths: IndexPaths::in_dir(dir),
        }
    }

    fn one_hot(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; 4];
        v[i] = 1.0;
        v
    }

    fn doc(i: usize) -> (Record, FacetVectors) {
        (
            Record::new(format!("Title {}", i), format!("Author {}", i), format!("Abstract {}", i)),
            FacetMap::new(one_hot(i), one_hot((i + 1) % 4), one_hot((i + 2) % 4)),
        )
    }

    fn engine_with_docs(dir: &Path, n: usize, weights: RelevanceWeights) -> RetrievalEngine {
        let mut engine = RetrievalEngine::new(config(dir, weights)).unwrap();
        for i in 0..n {
            let (record, vectors) = doc(i);
            assert_eq!(engine.add(record, &vectors).unwrap(), i);
        }
        engine
    }

    #[test]
    fn test_exact_title_match_ranks_first() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_docs(dir.path(), 3, RelevanceWeights::new(1.0, 0.0, 0.0));

        let query = FacetMap::new(one_hot(2), vec![0.0; 4], vec![0.0; 4]);
        let hits = engine.search(&query, 3).unwrap();

        assert_eq!(hits[0].doc_id, 2);
        assert_eq!(hits[0].record.title, "Title 2");
        assert_eq!(hits[0].score, 1.0);
        // the others sit at squared distance 2
        assert!((hits[1].score - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_index_search() {
        let dir = tempfile::tempdir().unwrap();
        let engine = RetrievalEngine::new(config(dir.path(), RelevanceWeights::default())).unwrap();
        let query = FacetMap::new(one_hot(0), one_hot(1), one_hot(2));
        assert!(engine.search(&query, 5).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_dimension_leaves_no_partial_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with_docs(dir.path(), 2, RelevanceWeights::default());

        let bad = FacetMap::new(one_hot(0), vec![1.0; 5], one_hot(1));
        let err = engine.add(Record::new("x", "y", "z"), &bad).unwrap_err();

        assert!(matches!(err, PaperSeekError::DimensionMismatch { expected: 4, actual: 5 }));
        assert_eq!(engine.len(), 2);
        for facet in Facet::ALL {
            assert_eq!(engine.index().store(facet).len(), 2);
        }
    }

    #[test]
    fn test_search_rejects_extra_vector_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with_docs(dir.path(), 2, RelevanceWeights::new(1.0, 0.0, 0.0));
        for facet in Facet::ALL {
            engine.index.store_mut(facet).insert(&one_hot(3)).unwrap();
        }

        // docId 2 is the best title match but has no record
        let query = FacetMap::new(one_hot(3), one_hot(0), one_hot(1));
        let err = engine.search(&query, 3).unwrap_err();
        assert!(matches!(err, PaperSeekError::Consistency(_)));
        assert!(err.is_state_corruption());
    }

    #[test]
    fn test_search_rejects_misaligned_single_facet() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with_docs(dir.path(), 2, RelevanceWeights::default());
        engine.index.store_mut(Facet::Authors).insert(&one_hot(0)).unwrap();

        let query = FacetMap::new(one_hot(0), one_hot(1), one_hot(2));
        assert!(matches!(
            engine.search(&query, 5),
            Err(PaperSeekError::Consistency(_))
        ));
    }

    #[test]
    fn test_k_larger_than_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_docs(dir.path(), 2, RelevanceWeights::default());
        let query = FacetMap::new(one_hot(0), one_hot(1), one_hot(2));
        assert_eq!(engine.search(&query, 5).unwrap().len(), 2);
    }

    #[test]
    fn test_lookahead_lets_fusion_see_beyond_k() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = RetrievalEngine::new(EngineConfig {
            lookahead: 2,
            ..config(dir.path(), RelevanceWeights::new(0.4, 0.3, 0.3))
        })
        .unwrap();

        // doc 0 wins title alone; doc 1 is second in title but first in
        // authors and abstract, so it must beat doc 0 overall
        engine
            .add(
                Record::new("a", "a", "a"),
                &FacetMap::new(one_hot(0), one_hot(3), one_hot(3)),
            )
            .unwrap();
        engine
            .add(
                Record::new("b", "b", "b"),
                &FacetMap::new(vec![0.9, 0.1, 0.0, 0.0], one_hot(1), one_hot(1)),
            )
            .unwrap();

        let query = FacetMap::new(one_hot(0), one_hot(1), one_hot(1));
        let hits = engine.search(&query, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 1);
    }

    #[test]
    fn test_persist_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_docs(dir.path(), 4, RelevanceWeights::default());
        let query = FacetMap::new(
            vec![0.5, 0.5, 0.0, 0.0],
            one_hot(2),
            vec![0.1, 0.2, 0.3, 0.4],
        );
        let before = engine.search(&query, 4).unwrap();
        engine.persist_all().unwrap();
        assert!(engine.has_persisted_state());

        let mut restored = RetrievalEngine::new(engine.config().clone()).unwrap();
        restored.restore_all().unwrap();

        assert_eq!(restored.len(), 4);
        assert_eq!(restored.search(&query, 4).unwrap(), before);
    }

    #[test]
    fn test_persist_restore_empty() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_docs(dir.path(), 0, RelevanceWeights::default());
        engine.persist_all().unwrap();

        let mut restored = RetrievalEngine::new(engine.config().clone()).unwrap();
        restored.restore_all().unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_failed_restore_keeps_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with_docs(dir.path(), 3, RelevanceWeights::default());
        engine.persist_all().unwrap();

        // metadata from a different state
        let paths = engine.config().paths.clone();
        let stale = vec![Record::new("only", "one", "record")];
        std::fs::write(&paths.metadata, serde_json::to_vec(&stale).unwrap()).unwrap();

        let mut other = engine_with_docs(dir.path(), 1, RelevanceWeights::default());
        let err = other.restore_all().unwrap_err();
        assert!(matches!(err, PaperSeekError::Consistency(_)));
        assert_eq!(other.len(), 1);
        assert_eq!(other.index().record(0).unwrap().title, "Title 0");
    }

    #[test]
    fn test_restore_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine_with_docs(dir.path(), 2, RelevanceWeights::default());
        assert!(!engine.has_persisted_state());
        assert!(matches!(
            engine.restore_all(),
            Err(PaperSeekError::CorruptIndex { .. })
        ));
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_shared_engine_concurrent_adds_stay_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let shared = SharedRetrievalEngine::new(
            RetrievalEngine::new(config(dir.path(), RelevanceWeights::default())).unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let (record, vectors) = doc((t + i) % 4);
                        shared.add(record, &vectors).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.stats().documents, 100);
        let engine = shared.inner.lock();
        engine.index().check_alignment().unwrap();
    }
}
