//! Index backends.
//!
//! | Backend | Engine | Insert/Delete | Metrics |
//! |---------|--------|---------------|---------|
//! | [`MutableGraphBackend`] | usearch HNSW | yes (tombstones) | cosine, l2, ip |
//! | [`StaticGraphBackend`] | instant-distance HNSW | no | cosine, euclidean, manhattan |
//!
//! Pick a variant statically through [`FromVectors`], or at runtime through
//! [`AnyBackend`].

mod mutable_graph;
mod static_graph;
mod threshold;
mod traits;

pub use mutable_graph::{MutableGraphArgs, MutableGraphBackend};
pub use static_graph::{StaticGraphArgs, StaticGraphBackend};
pub use threshold::DEFAULT_THRESHOLD_OVERFETCH;
pub use traits::{Backend, BackendArgs, FromVectors};

use crate::Result;
use crate::models::{BackendType, QueryResult, ThresholdResult};
use ndarray::ArrayView2;
use std::path::Path;

/// A backend of either variant, selected at runtime.
#[derive(Debug)]
pub enum AnyBackend {
    /// Mutable graph backend.
    MutableGraph(MutableGraphBackend),
    /// Static graph backend.
    StaticGraph(StaticGraphBackend),
}

impl AnyBackend {
    /// Loads the backend saved in `dir` as variant `backend_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`](crate::Error::Persistence) if a
    /// required artifact is missing or malformed.
    pub fn load(dir: &Path, backend_type: BackendType) -> Result<Self> {
        match backend_type {
            BackendType::MutableGraph => MutableGraphBackend::load(dir).map(Self::MutableGraph),
            BackendType::StaticGraph => StaticGraphBackend::load(dir).map(Self::StaticGraph),
        }
    }

    /// The configuration record as a flat JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`](crate::Error::InvalidInput) if the
    /// record does not serialize to an object.
    pub fn arguments_dict(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match self {
            Self::MutableGraph(backend) => backend.arguments().to_dict(),
            Self::StaticGraph(backend) => backend.arguments().to_dict(),
        }
    }

    fn inner(&self) -> &dyn Backend {
        match self {
            Self::MutableGraph(backend) => backend,
            Self::StaticGraph(backend) => backend,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Backend {
        match self {
            Self::MutableGraph(backend) => backend,
            Self::StaticGraph(backend) => backend,
        }
    }
}

impl Backend for AnyBackend {
    fn len(&self) -> usize {
        self.inner().len()
    }

    fn dim(&self) -> usize {
        self.inner().dim()
    }

    fn backend_type(&self) -> BackendType {
        self.inner().backend_type()
    }

    fn query(&self, vectors: ArrayView2<'_, f32>, k: usize) -> Result<QueryResult> {
        self.inner().query(vectors, k)
    }

    fn threshold_with_overfetch(
        &self,
        vectors: ArrayView2<'_, f32>,
        threshold: f32,
        overfetch: usize,
    ) -> Result<ThresholdResult> {
        self.inner()
            .threshold_with_overfetch(vectors, threshold, overfetch)
    }

    fn insert(&mut self, vectors: ArrayView2<'_, f32>) -> Result<()> {
        self.inner_mut().insert(vectors)
    }

    fn delete(&mut self, indices: &[usize]) -> Result<()> {
        self.inner_mut().delete(indices)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        self.inner().save(dir)
    }
}

impl From<MutableGraphBackend> for AnyBackend {
    fn from(backend: MutableGraphBackend) -> Self {
        Self::MutableGraph(backend)
    }
}

impl From<StaticGraphBackend> for AnyBackend {
    fn from(backend: StaticGraphBackend) -> Self {
        Self::StaticGraph(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use ndarray::Array2;
    use tempfile::TempDir;

    fn sample_vectors(rows: usize, dim: usize) -> Array2<f32> {
        Array2::from_shape_fn((rows, dim), |(i, j)| (((i + 1) * (j + 1)) as f32 * 0.37).sin())
    }

    #[test]
    fn test_any_backend_dispatch() {
        let vectors = sample_vectors(10, 4);
        let mut backend: AnyBackend =
            MutableGraphBackend::from_vectors(vectors.view(), MutableGraphArgs::new(4))
                .expect("build failed")
                .into();
        assert_eq!(backend.backend_type(), BackendType::MutableGraph);
        backend.delete(&[0]).expect("delete failed");
        assert_eq!(backend.len(), 9);

        let mut backend: AnyBackend =
            StaticGraphBackend::from_vectors(vectors.view(), StaticGraphArgs::new(4))
                .expect("build failed")
                .into();
        assert!(matches!(backend.delete(&[0]), Err(Error::Unsupported { .. })));
        assert_eq!(backend.len(), 10);
    }

    #[test]
    fn test_any_backend_load_by_type() {
        let dir = TempDir::new().expect("tempdir failed");
        let vectors = sample_vectors(10, 4);
        StaticGraphBackend::from_vectors(vectors.view(), StaticGraphArgs::new(4))
            .expect("build failed")
            .save(dir.path())
            .expect("save failed");

        let backend = AnyBackend::load(dir.path(), BackendType::StaticGraph).expect("load failed");
        assert_eq!(backend.dim(), 4);
        assert_eq!(backend.len(), 10);
        let dict = backend.arguments_dict().expect("dict failed");
        assert_eq!(dict["metric"], "cosine");

        let result = AnyBackend::load(dir.path(), BackendType::MutableGraph);
        assert!(matches!(result, Err(Error::Persistence { .. })));
    }
}
