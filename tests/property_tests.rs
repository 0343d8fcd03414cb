//! Property-based tests for normalization and threshold filtering.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Non-zero vectors normalize to unit length
//! - Zero vectors stay the origin
//! - `normalize_or_copy` borrows unit-length input and otherwise matches `normalize`
//! - Threshold results only contain indices strictly inside the threshold

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use annex::{
    Backend, FromVectors, MutableGraphArgs, MutableGraphBackend, MutableMetric, normalize,
    normalize_or_copy, normalize_vector,
};
use approx::abs_diff_eq;
use ndarray::{Array1, Array2};
use proptest::prelude::*;

fn vector_strategy(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-100.0f32..100.0, dim)
}

fn batch_strategy() -> impl Strategy<Value = Array2<f32>> {
    (1usize..12, 1usize..16).prop_flat_map(|(rows, dim)| {
        prop::collection::vec(-10.0f32..10.0, rows * dim).prop_map(move |values| {
            Array2::from_shape_vec((rows, dim), values).expect("shape mismatch")
        })
    })
}

fn norm(values: impl IntoIterator<Item = f32>) -> f32 {
    values.into_iter().map(|x| x * x).sum::<f32>().sqrt()
}

proptest! {
    /// Property: a vector with a meaningful norm normalizes to unit length.
    #[test]
    fn prop_normalize_vector_is_unit_length(values in vector_strategy(24)) {
        let vector = Array1::from(values);
        prop_assume!(norm(vector.iter().copied()) > 1e-3);

        let normalized = normalize_vector(vector.view());
        prop_assert!(abs_diff_eq!(norm(normalized.iter().copied()), 1.0, epsilon = 1e-4));
    }

    /// Property: every non-zero row of a batch is unit length after
    /// normalization; zero rows stay zero.
    #[test]
    fn prop_normalize_rows(batch in batch_strategy(), zero_row in 0usize..12) {
        let mut batch = batch;
        let zero_row = zero_row % batch.nrows();
        batch.row_mut(zero_row).fill(0.0);

        let normalized = normalize(batch.view(), None).expect("normalize failed");
        for (row, original) in normalized.rows().into_iter().zip(batch.rows()) {
            if norm(original.iter().copied()) > 1e-3 {
                prop_assert!(abs_diff_eq!(norm(row.iter().copied()), 1.0, epsilon = 1e-4));
            }
        }
        prop_assert!(normalized.row(zero_row).iter().all(|&x| x == 0.0));
    }

    /// Property: normalized data passes through `normalize_or_copy` without a copy.
    #[test]
    fn prop_normalize_or_copy_borrows_unit_rows(batch in batch_strategy()) {
        let unit = normalize(batch.view(), None).expect("normalize failed");
        let view = unit.view();

        let result = normalize_or_copy(view);
        prop_assert!(result.is_view());
        prop_assert_eq!(result.as_ptr(), view.as_ptr());
    }

    /// Property: when a copy is made it equals `normalize` exactly.
    #[test]
    fn prop_normalize_or_copy_matches_normalize(batch in batch_strategy()) {
        let mut batch = batch;
        batch.row_mut(0).fill(3.0);

        let result = normalize_or_copy(batch.view());
        let expected = normalize(batch.view(), None).expect("normalize failed");
        prop_assert!(!result.is_view());
        prop_assert_eq!(result.view(), expected.view());
    }

    /// Property: the zero vector normalizes to itself.
    #[test]
    fn prop_zero_vector_stays_zero(dim in 1usize..64) {
        let zero = Array1::<f32>::zeros(dim);
        prop_assert_eq!(normalize_vector(zero.view()), zero);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: threshold results only contain items strictly closer than
    /// the threshold, and every such item is found when fewer than the
    /// over-fetch count exist.
    #[test]
    fn prop_threshold_is_exact_below_overfetch(
        points in prop::collection::vec(vector_strategy(4), 5..60),
        probe in vector_strategy(4),
        threshold in 1.0f32..20_000.0,
    ) {
        let rows = points.len();
        let vectors = Array2::from_shape_vec((rows, 4), points.concat()).expect("shape mismatch");
        let args = MutableGraphArgs::new(4).with_space(MutableMetric::L2);
        let backend = MutableGraphBackend::from_vectors(vectors.view(), args).expect("build failed");
        let probe = Array1::from(probe);

        let result = backend
            .threshold(probe.view().insert_axis(ndarray::Axis(0)), threshold)
            .expect("threshold failed");

        let distance = |index: usize| norm((&vectors.row(index) - &probe).iter().copied()).powi(2);
        let mut expected: Vec<usize> = (0..rows).filter(|&i| distance(i) < threshold).collect();
        let mut found = result[0].clone();
        prop_assert!(found.iter().all(|&i| distance(i) < threshold * 1.001));

        // Items within float noise of the boundary may land on either side.
        expected.retain(|&i| distance(i) < threshold * 0.999);
        found.sort_unstable();
        prop_assert!(expected.iter().all(|i| found.contains(i)));
    }
}
