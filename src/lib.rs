//! # Annex
//!
//! A uniform access layer over interchangeable approximate-nearest-neighbor
//! (ANN) vector indexes.
//!
//! Annex lets a caller build, query, mutate, persist, and reload a
//! similarity index without knowing which ANN engine backs it.
//!
//! ## Features
//!
//! - One [`Backend`] contract for every index variant
//! - Mutable HNSW backend (usearch) with tombstone deletes
//! - Construction-only HNSW backend (instant-distance)
//! - Threshold ("all neighbors within d") queries on top of k-NN search
//! - Zero-safe unit-length normalization for cosine metrics
//!
//! ## Example
//!
//! ```rust,ignore
//! use annex::{Backend, FromVectors, MutableGraphArgs, MutableGraphBackend};
//!
//! let args = MutableGraphArgs::new(32);
//! let backend = MutableGraphBackend::from_vectors(vectors.view(), args)?;
//! let results = backend.query(queries.view(), 10)?;
//! let close = backend.threshold(queries.view(), 0.2)?;
//! backend.save(Path::new("./my-index"))?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

// Module declarations
pub mod backends;
pub mod cli;
pub mod config;
pub mod models;
pub mod normalize;
pub mod observability;
pub mod persistence;

// Re-exports for convenience
pub use backends::{
    AnyBackend, Backend, BackendArgs, DEFAULT_THRESHOLD_OVERFETCH, FromVectors,
    MutableGraphArgs, MutableGraphBackend, StaticGraphArgs, StaticGraphBackend,
};
pub use config::AnnexConfig;
pub use models::{
    BackendType, MutableMetric, Neighbors, QueryResult, StaticMetric, ThresholdResult,
};
pub use normalize::{normalize, normalize_or_copy, normalize_vector};

/// Error type for annex operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Shape` | A vector batch does not have the backend's dimensionality |
/// | `Capacity` | `k` exceeds the live item count, or an insert exceeds declared capacity |
/// | `Unsupported` | `insert`/`delete` on a construction-only backend |
/// | `Persistence` | A saved artifact is missing, unreadable, or malformed |
/// | `InvalidInput` | Bad indices, empty static builds, unparseable names |
/// | `OperationFailed` | The wrapped ANN engine or the filesystem reports a failure |
///
/// Zero vectors never raise: normalization maps them to the origin.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Vector batch dimensionality mismatch.
    ///
    /// Raised when:
    /// - `from_vectors` receives a batch whose column count differs from
    ///   the record's `dim`
    /// - `query`, `threshold`, or `insert` receives a batch of the wrong width
    /// - precomputed norms do not match the number of rows
    #[error("dimension mismatch: expected {expected}, got {got}")]
    Shape {
        /// The expected size.
        expected: usize,
        /// The size that was provided.
        got: usize,
    },

    /// A size limit was exceeded.
    ///
    /// Raised when:
    /// - `query` asks for more neighbors than there are live items
    /// - `insert` would grow a mutable index past its declared capacity
    #[error("capacity exceeded in '{operation}': requested {requested}, available {available}")]
    Capacity {
        /// The operation that hit the limit.
        operation: String,
        /// The requested amount.
        requested: usize,
        /// The amount available.
        available: usize,
    },

    /// The backend variant does not implement this operation.
    ///
    /// Raised when `insert` or `delete` is called on a static graph
    /// backend. Check [`BackendType::supports_mutation`] first.
    #[error("operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        /// The rejected operation.
        operation: &'static str,
        /// The backend that rejected it.
        backend: BackendType,
    },

    /// A persisted artifact could not be written or read back.
    #[error("persistence failed for '{}': {cause}", .path.display())]
    Persistence {
        /// The artifact path.
        path: PathBuf,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when the wrapped ANN engine reports an error, or when
    /// logging setup fails.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Persistence`] for `path`.
    pub(crate) fn persistence(path: impl Into<PathBuf>, cause: impl ToString) -> Self {
        Self::Persistence {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    /// Builds a [`Error::OperationFailed`].
    pub(crate) fn operation(operation: &str, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for annex operations.
pub type Result<T> = std::result::Result<T, Error>;
