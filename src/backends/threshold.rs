//! Threshold queries on top of k-NN search.
//!
//! None of the wrapped engines has a range-query primitive. A threshold
//! query therefore over-fetches a fixed number of nearest neighbors and
//! keeps those strictly below the threshold. If more than the over-fetch
//! count of items lie inside the threshold, the result is silently
//! truncated to the nearest ones: this is a bounded approximation, not an
//! exact range search.

use super::traits::{Backend, check_shape};
use crate::Result;
use crate::models::{QueryResult, ThresholdResult};
use ndarray::ArrayView2;

/// Number of neighbors fetched per query vector before filtering.
pub const DEFAULT_THRESHOLD_OVERFETCH: usize = 100;

/// Runs a threshold query against `backend`.
///
/// The over-fetch is clamped to the backend's item count, so small indexes
/// never fail with a capacity error; an empty index yields one empty entry
/// per query vector.
pub(crate) fn threshold_query<B: Backend + ?Sized>(
    backend: &B,
    vectors: ArrayView2<'_, f32>,
    threshold: f32,
    overfetch: usize,
) -> Result<ThresholdResult> {
    check_shape(vectors, backend.dim())?;

    let k = overfetch.min(backend.len());
    if k == 0 {
        return Ok(vec![Vec::new(); vectors.nrows()]);
    }

    let results = backend.query(vectors, k)?;
    Ok(filter_within(&results, threshold, backend.backend_type().as_str()))
}

/// Keeps, per entry, the indices whose distance is strictly below `threshold`.
pub(crate) fn filter_within(
    results: &QueryResult,
    threshold: f32,
    backend: &'static str,
) -> ThresholdResult {
    results
        .iter()
        .map(|neighbors| {
            let within = neighbors.within(threshold);
            if !within.is_empty() && within.len() == neighbors.len() {
                tracing::debug!(
                    backend,
                    fetched = neighbors.len(),
                    threshold,
                    "every fetched neighbor is inside the threshold, result may be truncated"
                );
                metrics::counter!("annex_threshold_saturated_total", "backend" => backend)
                    .increment(1);
            }
            within
        })
        .collect()
}
