//! Backend contract.
//!
//! Every index variant implements [`Backend`] (instance operations) and
//! [`FromVectors`] (construction and reload). Callers that need to pick a
//! variant at runtime use [`AnyBackend`](super::AnyBackend).
//!
//! # Concurrency
//!
//! Calls are synchronous and return fully materialized results. Mutating
//! calls take `&mut self`, so a single writer is enforced by the borrow
//! checker; to share a backend across threads wrap it in an `RwLock`
//! (queries under the read guard, `insert`/`delete`/`save` under the
//! write guard).

use super::threshold::{self, DEFAULT_THRESHOLD_OVERFETCH};
use crate::models::{BackendType, QueryResult, ThresholdResult};
use crate::normalize::normalize_or_copy;
use crate::persistence;
use crate::{Error, Result};
use ndarray::{ArrayView1, ArrayView2, CowArray, Ix2};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

/// Configuration record of a backend variant.
///
/// Records are flat key/value structs that round-trip losslessly through
/// `arguments.json`.
pub trait BackendArgs: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync {
    /// Dimensionality of the vectors.
    fn dim(&self) -> usize;

    /// Writes the record to `path` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file cannot be written.
    fn dump(&self, path: &Path) -> Result<()> {
        persistence::write_json(path, self)
    }

    /// Reads a record from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file is missing or malformed.
    fn load(path: &Path) -> Result<Self> {
        persistence::read_json(path)
    }

    /// Returns the record as a flat JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the record does not serialize to
    /// a JSON object.
    fn to_dict(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(Error::InvalidInput(format!(
                "configuration record is not an object: {other}"
            ))),
            Err(e) => Err(Error::InvalidInput(e.to_string())),
        }
    }
}

/// Instance operations every backend variant implements.
pub trait Backend: Send + Sync {
    /// Number of currently addressable items.
    ///
    /// For the mutable graph backend this is the live (non-deleted) count.
    fn len(&self) -> usize;

    /// Returns true if the backend holds no addressable items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality, fixed for the backend's lifetime.
    fn dim(&self) -> usize;

    /// Which variant this is.
    fn backend_type(&self) -> BackendType;

    /// Batched k-nearest-neighbor search.
    ///
    /// Returns one entry per row of `vectors`, best match first. The
    /// caller's batch is never modified; normalization works on a copy.
    ///
    /// # Errors
    ///
    /// - [`Error::Shape`] if `vectors` has the wrong number of columns
    /// - [`Error::Capacity`] if `k` exceeds [`len`](Self::len)
    fn query(&self, vectors: ArrayView2<'_, f32>, k: usize) -> Result<QueryResult>;

    /// Finds, per query vector, the neighbors with distance strictly below
    /// `threshold`.
    ///
    /// This is a k-NN search with a fixed over-fetch of
    /// [`DEFAULT_THRESHOLD_OVERFETCH`] neighbors followed by a filter. It is
    /// an approximation: when more than that many items fall inside the
    /// threshold, only the nearest ones are returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shape`] if `vectors` has the wrong number of columns.
    fn threshold(&self, vectors: ArrayView2<'_, f32>, threshold: f32) -> Result<ThresholdResult> {
        self.threshold_with_overfetch(vectors, threshold, DEFAULT_THRESHOLD_OVERFETCH)
    }

    /// [`threshold`](Self::threshold) with a caller-chosen over-fetch size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shape`] if `vectors` has the wrong number of columns.
    fn threshold_with_overfetch(
        &self,
        vectors: ArrayView2<'_, f32>,
        threshold: f32,
        overfetch: usize,
    ) -> Result<ThresholdResult> {
        threshold::threshold_query(self, vectors, threshold, overfetch)
    }

    /// Appends vectors as new items.
    ///
    /// # Errors
    ///
    /// - [`Error::Unsupported`] on construction-only backends
    /// - [`Error::Shape`] if `vectors` has the wrong number of columns
    /// - [`Error::Capacity`] if the declared capacity would be exceeded
    fn insert(&mut self, vectors: ArrayView2<'_, f32>) -> Result<()>;

    /// Removes items by index (tombstone delete).
    ///
    /// # Errors
    ///
    /// - [`Error::Unsupported`] on construction-only backends
    /// - [`Error::InvalidInput`] if an index was never assigned or is
    ///   already deleted
    fn delete(&mut self, indices: &[usize]) -> Result<()>;

    /// Saves the backend into directory `dir` (created if missing).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if any artifact cannot be written.
    fn save(&self, dir: &Path) -> Result<()>;
}

/// Construction and reload of a concrete backend variant.
pub trait FromVectors: Backend + Sized {
    /// The variant's configuration record.
    type Args: BackendArgs;

    /// Builds a fresh index populated with `vectors`.
    ///
    /// Calling this twice with the same inputs yields two independent,
    /// behaviorally equivalent backends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shape`] if `vectors` does not have `args.dim()` columns.
    fn from_vectors(vectors: ArrayView2<'_, f32>, args: Self::Args) -> Result<Self>;

    /// Loads a backend previously written by [`Backend::save`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if a required artifact is missing or
    /// malformed.
    fn load(dir: &Path) -> Result<Self>;

    /// The configuration record this backend was built with.
    fn arguments(&self) -> &Self::Args;
}

/// Validates that `vectors` has `dim` columns.
pub(crate) fn check_shape(vectors: ArrayView2<'_, f32>, dim: usize) -> Result<()> {
    if vectors.ncols() == dim {
        Ok(())
    } else {
        Err(Error::Shape {
            expected: dim,
            got: vectors.ncols(),
        })
    }
}

/// Validates that `k` does not exceed the addressable item count.
pub(crate) fn check_k(k: usize, available: usize) -> Result<()> {
    if k <= available {
        Ok(())
    } else {
        Err(Error::Capacity {
            operation: "query".to_string(),
            requested: k,
            available,
        })
    }
}

/// Prepares a batch for the engine: unit rows for angular metrics, the
/// caller's view untouched otherwise.
pub(crate) fn prepare_batch(
    vectors: ArrayView2<'_, f32>,
    angular: bool,
) -> CowArray<'_, f32, Ix2> {
    if angular {
        normalize_or_copy(vectors)
    } else {
        CowArray::from(vectors)
    }
}

/// Borrows a row as a contiguous slice, copying only for strided views.
pub(crate) fn row_slice<'a>(row: &'a ArrayView1<'_, f32>) -> Cow<'a, [f32]> {
    row.as_slice()
        .map_or_else(|| Cow::Owned(row.to_vec()), Cow::Borrowed)
}
