//! Three facet stores plus the record store, kept length-aligned
//!
//! A document's docId is its position in every container. All mutation goes
//! through [`FacetIndex::add_entry`], which either appends to all four
//! containers or to none of them.

use paperseek_common::{IndexPaths, PaperSeekError, Record, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::persist::write_atomic;
use crate::store::VectorStore;
use crate::types::{DocId, Facet, FacetMap, FacetNeighbors, FacetVectors};

#[derive(Debug, Clone, PartialEq)]
pub struct FacetIndex {
    stores: FacetMap<VectorStore>,
    records: Vec<Record>,
}

impl FacetIndex {
    /// Create empty index
    pub fn new(dimension: usize) -> Self {
        Self {
            stores: FacetMap::new(
                VectorStore::new(dimension),
                VectorStore::new(dimension),
                VectorStore::new(dimension),
            ),
            records: Vec::new(),
        }
    }

    /// Load all four artifacts into a fresh index
    ///
    /// Nothing is returned unless every file loads and the lengths agree.
    pub fn restore(paths: &IndexPaths, dimension: usize) -> Result<Self> {
        let mut index = Self::new(dimension);
        index.load(&paths.title, &paths.authors, &paths.abstract_text)?;
        index.load_metadata(&paths.metadata)?;
        Ok(index)
    }

    pub fn dimension(&self) -> usize {
        self.stores.title.dimension()
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, doc_id: DocId) -> Option<&Record> {
        self.records.get(doc_id)
    }

    pub fn store(&self, facet: Facet) -> &VectorStore {
        self.stores.get(facet)
    }

    /// Direct store access that bypasses alignment, for corrupting state in tests
    #[cfg(test)]
    pub(crate) fn store_mut(&mut self, facet: Facet) -> &mut VectorStore {
        self.stores.get_mut(facet)
    }

    /// Fail when any facet store disagrees with the record store length
    pub fn check_alignment(&self) -> Result<()> {
        for (facet, store) in self.stores.iter() {
            if store.len() != self.records.len() {
                return Err(PaperSeekError::consistency(format!(
                    "{} store holds {} vectors but record store holds {} records",
                    facet,
                    store.len(),
                    self.records.len()
                )));
            }
        }
        Ok(())
    }

    /// Insert one document into all three facet stores and the record store
    pub fn add_entry(&mut self, vectors: &FacetVectors, record: Record) -> Result<DocId> {
        self.check_alignment()?;
        let doc_id = self.records.len();

        for facet in Facet::ALL {
            if let Err(e) = self.stores.get_mut(facet).insert(vectors.get(facet)) {
                debug!("Rolling back partial insert of docId {} ({} failed)", doc_id, facet);
                for facet in Facet::ALL {
                    self.stores.get_mut(facet).truncate(doc_id);
                }
                return Err(e);
            }
        }

        self.records.push(record);
        Ok(doc_id)
    }

    /// Query every facet store independently
    ///
    /// An empty facet store contributes an empty list instead of an error.
    pub fn search_facets(&self, query: &FacetVectors, per_facet_k: usize) -> Result<FacetNeighbors> {
        self.check_alignment()?;

        FacetMap::try_from_fn(|facet| {
            match self.stores.get(facet).query(query.get(facet), per_facet_k) {
                Ok(neighbors) => Ok(neighbors),
                Err(PaperSeekError::EmptyIndex) => {
                    debug!("Facet '{}' is empty, no neighbors", facet);
                    Ok(Vec::new())
                }
                Err(e) => Err(e),
            }
        })
    }

    /// Save the three facet stores
    pub fn save(&self, title_path: &Path, authors_path: &Path, abstract_path: &Path) -> Result<()> {
        self.stores.title.save(title_path)?;
        self.stores.authors.save(authors_path)?;
        self.stores.abstract_text.save(abstract_path)?;
        Ok(())
    }

    /// Load the three facet stores
    ///
    /// All three are read before any is swapped in, and they must agree on
    /// length. The record store is not touched: follow with
    /// [`FacetIndex::load_metadata`] for the matching records.
    pub fn load(&mut self, title_path: &Path, authors_path: &Path, abstract_path: &Path) -> Result<()> {
        let dimension = self.dimension();
        let stores = FacetMap::new(
            VectorStore::open(title_path, dimension)?,
            VectorStore::open(authors_path, dimension)?,
            VectorStore::open(abstract_path, dimension)?,
        );

        let expected = stores.title.len();
        for (facet, store) in stores.iter() {
            if store.len() != expected {
                return Err(PaperSeekError::consistency(format!(
                    "{} index holds {} vectors, title index holds {}",
                    facet,
                    store.len(),
                    expected
                )));
            }
        }

        self.stores = stores;
        Ok(())
    }

    /// Save the record store as a JSON array in docId order
    pub fn save_metadata(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.records)?;
        write_atomic(path, &data)?;
        Ok(())
    }

    /// Load the record store; its length must match the facet stores
    pub fn load_metadata(&mut self, path: &Path) -> Result<()> {
        let data = std::fs::read(path)
            .map_err(|e| PaperSeekError::corrupt_index(path, format!("unreadable: {}", e)))?;
        let records: Vec<Record> = serde_json::from_slice(&data)
            .map_err(|e| PaperSeekError::corrupt_index(path, format!("invalid metadata: {}", e)))?;

        for (facet, store) in self.stores.iter() {
            if store.len() != records.len() {
                return Err(PaperSeekError::consistency(format!(
                    "metadata {} holds {} records but {} index holds {} vectors",
                    path.display(),
                    records.len(),
                    facet,
                    store.len()
                )));
            }
        }

        self.records = records;
        Ok(())
    }

    /// Save all four artifacts
    pub fn persist(&self, paths: &IndexPaths) -> Result<()> {
        self.check_alignment()?;
        self.save(&paths.title, &paths.authors, &paths.abstract_text)?;
        self.save_metadata(&paths.metadata)?;
        info!("Persisted {} documents", self.len());
        Ok(())
    }
}
