//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::cast_precision_loss)]

use ndarray::{Array1, Array2};

/// Deterministic pseudo-random values in `[-1, 1)` (splitmix64 per cell).
pub fn random_vectors(rows: usize, dim: usize, seed: u64) -> Array2<f32> {
    Array2::from_shape_fn((rows, dim), |(i, j)| {
        let mut x = seed ^ ((i * dim + j) as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        x ^= x >> 31;
        (x >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0
    })
}

/// A tight cluster of `inside` points around `center`, followed by `outside`
/// points placed far away from it.
pub fn clustered(center: &Array1<f32>, inside: usize, outside: usize) -> Array2<f32> {
    let dim = center.len();
    let jitter = random_vectors(inside + outside, dim, 7);
    Array2::from_shape_fn((inside + outside, dim), |(i, j)| {
        if i < inside {
            center[j] + 0.05 * jitter[[i, j]]
        } else {
            center[j] + 10.0 + jitter[[i, j]]
        }
    })
}
