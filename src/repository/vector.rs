//! Cosine ranking over stored embeddings.
//!
//! The similarity engine is reached only through
//! [`NoticeReader::nearest_notices`](crate::repository::NoticeReader) and
//! [`NoticeReader::count_nearest_notices`](crate::repository::NoticeReader);
//! this module is its index-backed implementation.

use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::repository::errors::{RepositoryError, RepositoryResult};

/// Rank candidates by cosine similarity to the query vector, best first,
/// keeping only those at or above the threshold.
///
/// The index reports cosine distance; similarity is `1 - distance`.
/// Candidates whose dimensionality does not match the query are ignored.
pub(crate) fn rank_by_similarity(
    query: &[f32],
    items: &[(i32, Vec<f32>)],
    threshold: f32,
) -> RepositoryResult<Vec<(i32, f32)>> {
    if query.is_empty() || items.is_empty() {
        return Ok(Vec::new());
    }

    let index = Index::new(&IndexOptions {
        dimensions: query.len(),
        metric: MetricKind::Cos,
        quantization: ScalarKind::F32,
        ..Default::default()
    })
    .map_err(index_error)?;

    index.reserve(items.len()).map_err(index_error)?;

    let mut added = 0usize;
    for (id, embedding) in items {
        if embedding.len() != query.len() {
            log::warn!("skipping vector for record {id}: dimension mismatch");
            continue;
        }
        index.add(*id as u64, embedding).map_err(index_error)?;
        added += 1;
    }
    if added == 0 {
        return Ok(Vec::new());
    }

    let neighbors = index.search(query, added).map_err(index_error)?;

    Ok(neighbors
        .keys
        .iter()
        .zip(neighbors.distances.iter())
        .map(|(&key, &distance)| (key as i32, 1.0 - distance))
        .filter(|(_, similarity)| *similarity >= threshold)
        .collect())
}

fn index_error(error: impl ToString) -> RepositoryError {
    RepositoryError::VectorIndex(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::rank_by_similarity;

    #[test]
    fn ranks_best_match_first_and_applies_threshold() {
        let query = vec![1.0_f32, 0.0, 0.0];
        let items = vec![
            (10, vec![0.0_f32, 1.0, 0.0]),
            (20, vec![1.0_f32, 0.0, 0.0]),
            (30, vec![0.9_f32, 0.1, 0.0]),
        ];

        let ranked = rank_by_similarity(&query, &items, 0.5).unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, 20);
        assert_eq!(ranked[1].0, 30);
        assert!(ranked[0].1 > ranked[1].1);
    }

    #[test]
    fn empty_inputs_yield_no_matches() {
        let query = vec![1.0_f32, 0.0];
        assert!(rank_by_similarity(&query, &[], 0.0).unwrap().is_empty());
        assert!(rank_by_similarity(&[], &[(1, vec![1.0, 0.0])], 0.0).unwrap().is_empty());
    }
}
