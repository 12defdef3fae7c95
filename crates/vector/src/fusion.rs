use paperseek_common::{RelevanceWeights, Result};
use std::collections::BTreeMap;

use crate::types::{DocId, Facet, FacetNeighbors, ScoredDoc};

/// Score contributed by one facet match
///
/// Maps a distance in `[0, inf)` into `(0, weight]`, so closer matches never
/// score lower.
pub fn score_contribution(weight: f32, distance: f32) -> f32 {
    weight * (1.0 / (1.0 + distance))
}

/// Merges per-facet neighbor lists into one weighted ranking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionRanker {
    weights: RelevanceWeights,
}

impl FusionRanker {
    /// Create ranker; weights must be finite and non-negative
    pub fn new(weights: RelevanceWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &RelevanceWeights {
        &self.weights
    }

    /// Top `k` documents by summed facet contributions
    ///
    /// Every document listed by any facet is a candidate, even when that
    /// facet's weight is zero. Ties go to the lower docId.
    pub fn fuse(&self, per_facet: &FacetNeighbors, k: usize) -> Vec<ScoredDoc> {
        let mut totals: BTreeMap<DocId, f32> = BTreeMap::new();

        for facet in Facet::ALL {
            let weight = facet.weight(&self.weights);
            for neighbor in per_facet.get(facet) {
                *totals.entry(neighbor.doc_id).or_insert(0.0) +=
                    score_contribution(weight, neighbor.distance);
            }
        }

        let mut ranked: Vec<ScoredDoc> = totals
            .into_iter()
            .map(|(doc_id, score)| ScoredDoc { doc_id, score })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        ranked.truncate(k);
        ranked
    }
}
