//! Unit-length normalization of vectors.
//!
//! Cosine backends compare unit vectors, so both build-time and query-time
//! batches go through [`normalize_or_copy`]. Zero vectors carry no
//! direction and stay the origin: they are never divided, so there is no
//! NaN and no error path.

use crate::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, CowArray, Ix2, Zip};

/// Norms at or below this value are treated as zero.
pub const ZERO_NORM_EPSILON: f32 = 1e-8;

/// Tolerance used by [`normalize_or_copy`] to decide a row is already unit length.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-5;

#[inline]
fn is_zero_norm(norm: f32) -> bool {
    norm <= ZERO_NORM_EPSILON
}

/// Euclidean norm of every row.
#[must_use]
pub fn row_norms(vectors: ArrayView2<'_, f32>) -> Array1<f32> {
    vectors.map_axis(Axis(1), |row| row.dot(&row).sqrt())
}

/// Normalizes a single vector to unit length.
///
/// Returns the zero vector if `vector` has (numerically) zero length.
#[must_use]
pub fn normalize_vector(vector: ArrayView1<'_, f32>) -> Array1<f32> {
    let norm = vector.dot(&vector).sqrt();
    if is_zero_norm(norm) {
        return Array1::zeros(vector.len());
    }
    vector.mapv(|x| x / norm)
}

/// Normalizes every row of `vectors` to unit length.
///
/// `norms` may carry precomputed row norms to skip a second pass. Zero rows
/// are left as zero.
///
/// # Errors
///
/// Returns [`Error::Shape`] if `norms` does not have one entry per row.
pub fn normalize(
    vectors: ArrayView2<'_, f32>,
    norms: Option<ArrayView1<'_, f32>>,
) -> Result<Array2<f32>> {
    match norms {
        Some(norms) if norms.len() != vectors.nrows() => Err(Error::Shape {
            expected: vectors.nrows(),
            got: norms.len(),
        }),
        Some(norms) => Ok(normalize_rows(vectors, norms)),
        None => Ok(normalize_rows(vectors, row_norms(vectors).view())),
    }
}

/// Returns `vectors` untouched if every non-zero row is already unit
/// length, otherwise a normalized copy.
///
/// The borrowed case is the very same buffer as the input (no copy is
/// made); the owned case is exactly what [`normalize`] returns.
#[must_use]
pub fn normalize_or_copy(vectors: ArrayView2<'_, f32>) -> CowArray<'_, f32, Ix2> {
    let norms = row_norms(vectors);
    let all_unit_length = norms
        .iter()
        .filter(|&&norm| norm != 0.0)
        .all(|&norm| (norm - 1.0).abs() <= UNIT_NORM_TOLERANCE);

    if all_unit_length {
        return CowArray::from(vectors);
    }
    CowArray::from(normalize_rows(vectors, norms.view()))
}

fn normalize_rows(vectors: ArrayView2<'_, f32>, norms: ArrayView1<'_, f32>) -> Array2<f32> {
    if !norms.iter().copied().any(is_zero_norm) {
        let column = norms.insert_axis(Axis(1));
        return &vectors / &column;
    }

    // Masked division: zero rows keep the zeros they were allocated with.
    let mut result = Array2::zeros(vectors.raw_dim());
    Zip::from(result.rows_mut())
        .and(vectors.rows())
        .and(&norms)
        .for_each(|mut out, row, &norm| {
            if !is_zero_norm(norm) {
                out.assign(&row.mapv(|x| x / norm));
            }
        });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_normalize_vector_unit_length() {
        let normalized = normalize_vector(arr1(&[3.0_f32, 4.0]).view());
        assert_abs_diff_eq!(normalized[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(normalized[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_vector_zero_stays_zero() {
        let normalized = normalize_vector(arr1(&[0.0_f32, 0.0, 0.0]).view());
        assert!(normalized.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_normalize_batch_without_zero_rows() {
        let vectors = arr2(&[[3.0_f32, 4.0], [0.0, 2.0]]);
        let normalized = normalize(vectors.view(), None).expect("normalize failed");
        assert_abs_diff_eq!(normalized[[0, 0]], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(normalized[[1, 1]], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_batch_masks_zero_rows() {
        let vectors = arr2(&[[3.0_f32, 4.0], [0.0, 0.0], [1e-12, 0.0]]);
        let normalized = normalize(vectors.view(), None).expect("normalize failed");

        assert_abs_diff_eq!(normalized[[0, 1]], 0.8, epsilon = 1e-6);
        assert!(normalized.row(1).iter().all(|&x| x == 0.0));
        assert!(normalized.row(2).iter().all(|&x| x == 0.0));
        assert!(normalized.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_normalize_with_precomputed_norms() {
        let vectors = arr2(&[[3.0_f32, 4.0], [6.0, 8.0]]);
        let norms = row_norms(vectors.view());
        let with_norms = normalize(vectors.view(), Some(norms.view())).expect("normalize failed");
        let without = normalize(vectors.view(), None).expect("normalize failed");
        assert_eq!(with_norms, without);
    }

    #[test]
    fn test_normalize_rejects_mismatched_norms() {
        let vectors = arr2(&[[3.0_f32, 4.0], [6.0, 8.0]]);
        let norms = arr1(&[5.0_f32]);
        let result = normalize(vectors.view(), Some(norms.view()));
        assert!(matches!(
            result,
            Err(Error::Shape {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_normalize_or_copy_borrows_unit_rows() {
        let vectors = arr2(&[[1.0_f32, 0.0], [0.0, 0.0], [0.6, 0.8]]);
        let result = normalize_or_copy(vectors.view());
        assert!(result.is_view());
        assert_eq!(result.as_ptr(), vectors.as_ptr());
    }

    #[test]
    fn test_normalize_or_copy_matches_normalize() {
        let vectors = arr2(&[[3.0_f32, 4.0], [0.0, 0.0], [0.0, 5.0]]);
        let result = normalize_or_copy(vectors.view());
        assert!(!result.is_view());
        let expected = normalize(vectors.view(), None).expect("normalize failed");
        assert_eq!(result.view(), expected.view());
    }

    #[test]
    fn test_normalize_empty_batch() {
        let vectors = Array2::<f32>::zeros((0, 4));
        let normalized = normalize(vectors.view(), None).expect("normalize failed");
        assert_eq!(normalized.dim(), (0, 4));
        assert!(normalize_or_copy(vectors.view()).is_view());
    }
}
