use crate::IndexError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub position: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or_default();

        let vectors = vectors
            .into_iter()
            .enumerate()
            .map(|(position, vector)| {
                if vector.len() != dimensions {
                    return Err(IndexError::DimensionMismatch {
                        position,
                        expected: dimensions,
                        got: vector.len(),
                    });
                }
                unit_vector(vector).ok_or(IndexError::DegenerateVector(position))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        Ok(Self {
            dimensions,
            vectors,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.vectors.get(position).map(Vec::as_slice)
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimensions {
            return Err(IndexError::QueryDimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query = unit_vector(query.to_vec()).ok_or(IndexError::DegenerateQuery)?;

        let mut neighbors = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, stored)| Neighbor {
                position,
                score: dot(&query, stored),
            })
            .collect::<Vec<_>>();

        // sort_by is stable, which keeps ties in insertion order
        neighbors.sort_by(|left, right| right.score.total_cmp(&left.score));
        neighbors.truncate(k.min(self.vectors.len()));

        Ok(neighbors)
    }
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

fn unit_vector(mut vector: Vec<f32>) -> Option<Vec<f32>> {
    let norm = l2_norm(&vector);
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    for value in &mut vector {
        *value /= norm;
    }
    Some(vector)
}

fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vectors() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 2.0, 0.0],
            vec![3.0, 3.0, 0.0],
            vec![0.0, 0.0, 0.5],
            vec![1.0, 1.0, 1.0],
        ]
    }

    #[test]
    fn stored_vectors_have_unit_norm() -> Result<(), IndexError> {
        let index = FlatIndex::build(sample_vectors())?;
        for position in 0..index.len() {
            let norm = index.vector(position).map(l2_norm).unwrap_or_default();
            assert!((norm - 1.0).abs() < 1e-5, "position {position} norm {norm}");
        }
        Ok(())
    }

    #[test]
    fn build_rejects_mixed_dimensions() {
        let result = FlatIndex::build(vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]]);
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                position: 1,
                expected: 2,
                got: 3
            })
        ));
    }

    #[test]
    fn build_rejects_zero_vector() {
        let result = FlatIndex::build(vec![vec![1.0, 0.0], vec![0.0, 0.0]]);
        assert!(matches!(result, Err(IndexError::DegenerateVector(1))));
    }

    #[test]
    fn tiny_nonzero_vector_is_kept() -> Result<(), IndexError> {
        let index = FlatIndex::build(vec![vec![1e-7, 0.0, 0.0], vec![0.0, 1.0, 0.0]])?;
        let norm = index.vector(0).map(l2_norm).unwrap_or_default();
        assert!((norm - 1.0).abs() < 1e-5, "norm {norm}");

        let hits = index.search(&[1.0, 0.0, 0.0], 1)?;
        assert_eq!(hits[0].position, 0);
        Ok(())
    }

    #[test]
    fn non_finite_vector_is_rejected() {
        let result = FlatIndex::build(vec![vec![1.0, 0.0], vec![f32::NAN, 1.0]]);
        assert!(matches!(result, Err(IndexError::DegenerateVector(1))));
    }

    #[test]
    fn search_is_ordered_and_bounded() -> Result<(), IndexError> {
        let index = FlatIndex::build(sample_vectors())?;
        let hits = index.search(&[1.0, 0.2, 0.1], 3)?;

        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
        assert_eq!(hits[0].position, 0);
        Ok(())
    }

    #[test]
    fn search_clamps_k_to_stored_count() -> Result<(), IndexError> {
        let index = FlatIndex::build(sample_vectors())?;
        let hits = index.search(&[0.0, 1.0, 0.0], 50)?;
        assert_eq!(hits.len(), index.len());
        Ok(())
    }

    #[test]
    fn ties_keep_insertion_order() -> Result<(), IndexError> {
        let index = FlatIndex::build(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![5.0, 0.0],
        ])?;
        let hits = index.search(&[1.0, 0.0], 3)?;
        let positions: Vec<usize> = hits.iter().map(|hit| hit.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn empty_index_returns_no_hits() -> Result<(), IndexError> {
        let index = FlatIndex::build(Vec::new())?;
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0], 5)?.is_empty());
        Ok(())
    }

    #[test]
    fn stored_vector_finds_itself_first() -> Result<(), IndexError> {
        let index = FlatIndex::build(sample_vectors())?;
        for position in 0..index.len() {
            let query = index.vector(position).map(<[f32]>::to_vec).unwrap_or_default();
            let hits = index.search(&query, 1)?;
            assert_eq!(hits[0].position, position);
            assert!((hits[0].score - 1.0).abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn zero_query_is_rejected() -> Result<(), IndexError> {
        let index = FlatIndex::build(sample_vectors())?;
        assert!(matches!(
            index.search(&[0.0, 0.0, 0.0], 2),
            Err(IndexError::DegenerateQuery)
        ));
        Ok(())
    }
}
