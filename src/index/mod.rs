//! Exact nearest-neighbor search over verse embeddings
//!
//! [`FlatL2Index`] stores every vector in one contiguous buffer and answers
//! queries with a full scan, ranking by squared Euclidean distance. It is
//! built once and never mutated.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

use crate::embeddings::Embedding;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("Embedding dimension must be non-zero")]
    ZeroDimension,

    #[error("Vector {position} has dimension {actual}, expected {expected}")]
    InconsistentDimension {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Query has dimension {actual}, index expects {expected}")]
    QueryDimension { expected: usize, actual: usize },
}

/// A stored vector close to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the vector in the order it was added
    pub position: usize,
    /// Squared L2 distance to the query
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Build an index over `vectors`
    ///
    /// Returns `Ok(None)` when there is nothing to index. Callers treat a
    /// missing index as one that never returns results.
    #[inline]
    pub fn build(vectors: &[Embedding]) -> Result<Option<Self>, IndexError> {
        let Some(first) = vectors.first() else {
            debug!("No embeddings supplied, skipping index build");
            return Ok(None);
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }

        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(IndexError::InconsistentDimension {
                    position,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        debug!(
            "Built flat L2 index with {} vectors of dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Some(Self { dimension, data }))
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The `k` nearest vectors, closest first
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        self.search_where(query, k, |_| true)
    }

    /// The `k` nearest vectors among the positions accepted by `accept`
    ///
    /// Ties are broken by position so results are deterministic.
    #[inline]
    pub fn search_where<F>(
        &self,
        query: &[f32],
        k: usize,
        accept: F,
    ) -> Result<Vec<Neighbor>, IndexError>
    where
        F: Fn(usize) -> bool,
    {
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .filter(|(position, _)| accept(*position))
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();

        neighbors.sort_by(compare_neighbors);
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.position.cmp(&b.position))
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
