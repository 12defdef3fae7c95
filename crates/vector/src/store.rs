//! Exact nearest-neighbor store for one facet
//!
//! Vectors live in a single row-major buffer viewed as an `n x d` matrix;
//! queries compute squared Euclidean distance to every row.

use ndarray::{ArrayView1, ArrayView2, Axis};
use paperseek_common::{PaperSeekError, Result};
use std::collections::BinaryHeap;
use std::path::Path;
use tracing::debug;

use crate::persist::write_atomic;
use crate::types::{DocId, Neighbor};

/// File magic for vector index files
pub const INDEX_MAGIC: [u8; 4] = *b"PSVI";

/// Current vector index format version
pub const INDEX_VERSION: u16 = 1;

// magic + version + dimension + count
const HEADER_LEN: usize = 4 + 2 + 4 + 4;
const CRC_LEN: usize = 4;

/// Flat exact k-NN index over fixed-dimension vectors
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStore {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorStore {
    /// Create empty store
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Open a persisted store
    pub fn open(path: &Path, dimension: usize) -> Result<Self> {
        let mut store = Self::new(dimension);
        store.load(path)?;
        Ok(store)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored vector for `doc_id`
    pub fn get(&self, doc_id: DocId) -> Option<&[f32]> {
        let start = doc_id.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Append vector, returning its docId
    pub fn insert(&mut self, vector: &[f32]) -> Result<DocId> {
        self.check_dimension(vector)?;
        let doc_id = self.len();
        self.data.extend_from_slice(vector);
        Ok(doc_id)
    }

    /// Drop every vector from position `len` onwards
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.dimension);
    }

    /// The `k` closest stored vectors, ascending by distance then docId
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_dimension(vector)?;
        if self.is_empty() {
            return Err(PaperSeekError::EmptyIndex);
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = ArrayView1::from(vector);
        let diff = &self.matrix()? - &query;
        let distances = (&diff * &diff).sum_axis(Axis(1));

        // max-heap holding the k best seen so far; its top is the worst of them
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (doc_id, &distance) in distances.iter().enumerate() {
            let candidate = Neighbor::new(doc_id, distance);
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        let neighbors = heap.into_sorted_vec();
        debug!(
            "Vector query - candidates: {}, returned: {}",
            distances.len(),
            neighbors.len()
        );
        Ok(neighbors)
    }

    /// Persist all vectors in insertion order
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.encode()?;
        write_atomic(path, &bytes)?;
        debug!("Saved {} vectors to {}", self.len(), path.display());
        Ok(())
    }

    /// Replace contents with a persisted store; on error `self` is unchanged
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path)
            .map_err(|e| PaperSeekError::corrupt_index(path, format!("unreadable: {}", e)))?;
        self.data = decode(path, &bytes, self.dimension)?;
        debug!("Loaded {} vectors from {}", self.len(), path.display());
        Ok(())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(PaperSeekError::dimension_mismatch(self.dimension, vector.len()));
        }
        Ok(())
    }

    fn matrix(&self) -> Result<ArrayView2<'_, f32>> {
        ArrayView2::from_shape((self.len(), self.dimension), &self.data)
            .map_err(|e| PaperSeekError::consistency(format!("vector buffer shape: {}", e)))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let dimension = u32::try_from(self.dimension)
            .map_err(|_| PaperSeekError::invalid_input("dimension out of range"))?;
        let count = u32::try_from(self.len())
            .map_err(|_| PaperSeekError::invalid_input("vector count out of range"))?;

        let mut buf = Vec::with_capacity(HEADER_LEN + 2 * CRC_LEN + self.data.len() * 4);
        buf.extend_from_slice(&INDEX_MAGIC);
        buf.extend_from_slice(&INDEX_VERSION.to_le_bytes());
        buf.extend_from_slice(&dimension.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        let header_crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&header_crc.to_le_bytes());

        let payload_start = buf.len();
        for value in &self.data {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        let payload_crc = crc32fast::hash(&buf[payload_start..]);
        buf.extend_from_slice(&payload_crc.to_le_bytes());
        Ok(buf)
    }
}

fn decode(path: &Path, bytes: &[u8], dimension: usize) -> Result<Vec<f32>> {
    let corrupt = |reason: String| PaperSeekError::corrupt_index(path, reason);

    if bytes.len() < HEADER_LEN + 2 * CRC_LEN {
        return Err(corrupt(format!("truncated header ({} bytes)", bytes.len())));
    }

    let (header, rest) = bytes.split_at(HEADER_LEN);
    if header[..4] != INDEX_MAGIC {
        return Err(corrupt(format!("invalid magic {:?}", &header[..4])));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != INDEX_VERSION {
        return Err(corrupt(format!("unsupported version {}", version)));
    }
    let stored_dim = read_u32(&header[6..10]) as usize;
    let count = read_u32(&header[10..14]) as usize;

    let (header_crc, rest) = rest.split_at(CRC_LEN);
    if read_u32(header_crc) != crc32fast::hash(header) {
        return Err(corrupt("header CRC mismatch".to_string()));
    }
    if stored_dim != dimension {
        return Err(corrupt(format!(
            "dimension {} does not match configured {}",
            stored_dim, dimension
        )));
    }

    let payload_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| corrupt("vector count overflow".to_string()))?;
    if rest.len() != payload_len + CRC_LEN {
        return Err(corrupt(format!(
            "expected {} payload bytes for {} vectors, found {}",
            payload_len,
            count,
            rest.len().saturating_sub(CRC_LEN)
        )));
    }

    let (payload, payload_crc) = rest.split_at(payload_len);
    if read_u32(payload_crc) != crc32fast::hash(payload) {
        return Err(corrupt("payload CRC mismatch".to_string()));
    }

    Ok(payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
