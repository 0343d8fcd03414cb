//! Static graph backend.
//!
//! Builds an HNSW neighbor graph once from a fixed vector set. There is no
//! insert or delete: both return [`Error::Unsupported`] and leave the
//! backend untouched.
//!
//! The raw vectors are kept next to the graph. They are what gets
//! persisted (`vectors.npy`), and they serve queries whose `k` is larger
//! than the graph's search breadth. The built graph is cached in
//! `neighbor_graph.bin`; if that file is absent on load the graph is
//! rebuilt from the vectors with the same seed.

mod graph;

use self::graph::NeighborGraph;
use super::traits::{Backend, BackendArgs, FromVectors, check_k, check_shape, prepare_batch, row_slice};
use crate::models::{BackendType, Neighbors, QueryResult, StaticMetric};
use crate::persistence::{self, ARGUMENTS_FILE, NEIGHBOR_GRAPH_FILE, VECTORS_FILE, npy};
use crate::{Error, Result};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::instrument;

/// Default graph build quality.
pub const DEFAULT_EF_CONSTRUCTION: usize = 100;
/// Default search breadth.
pub const DEFAULT_EF_SEARCH: usize = 100;
/// Default construction seed.
pub const DEFAULT_SEED: u64 = 42;

/// Configuration record of the static graph backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticGraphArgs {
    /// Vector dimensionality.
    pub dim: usize,
    /// Distance metric.
    #[serde(default)]
    pub metric: StaticMetric,
    /// Candidate list size while building the graph.
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    /// Candidate list size while searching; also the largest `k` served
    /// from the graph.
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
    /// Construction seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

const fn default_ef_construction() -> usize {
    DEFAULT_EF_CONSTRUCTION
}

const fn default_ef_search() -> usize {
    DEFAULT_EF_SEARCH
}

const fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl StaticGraphArgs {
    /// Creates a record with default tuning for `dim`-dimensional vectors.
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self {
            dim,
            metric: StaticMetric::Cosine,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
            seed: DEFAULT_SEED,
        }
    }

    /// Sets the distance metric.
    #[must_use]
    pub const fn with_metric(mut self, metric: StaticMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Sets the build-time candidate list size.
    #[must_use]
    pub const fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    /// Sets the search-time candidate list size.
    #[must_use]
    pub const fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    /// Sets the construction seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl BackendArgs for StaticGraphArgs {
    fn dim(&self) -> usize {
        self.dim
    }
}

/// Construction-only HNSW backend.
pub struct StaticGraphBackend {
    arguments: StaticGraphArgs,
    vectors: Array2<f32>,
    graph: NeighborGraph,
}

impl StaticGraphBackend {
    /// The raw vectors the backend was built from.
    #[must_use]
    pub fn vectors(&self) -> ArrayView2<'_, f32> {
        self.vectors.view()
    }

    fn build_graph(vectors: ArrayView2<'_, f32>, args: &StaticGraphArgs) -> NeighborGraph {
        let prepared = prepare_batch(vectors, args.metric.requires_normalization());
        NeighborGraph::build(prepared.view(), args)
    }

    /// Exact scan over the stored vectors.
    fn scan(&self, query: &[f32], k: usize) -> Neighbors {
        let metric = self.arguments.metric;
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .rows()
            .into_iter()
            .enumerate()
            .map(|(index, row)| (index, metric.distance(query, &row_slice(&row))))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Neighbors::from_pairs(scored)
    }

    fn unsupported(operation: &'static str) -> Error {
        tracing::debug!(operation, "static graph backend is construction-only");
        Error::Unsupported {
            operation,
            backend: BackendType::StaticGraph,
        }
    }
}

impl Backend for StaticGraphBackend {
    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn dim(&self) -> usize {
        self.arguments.dim
    }

    fn backend_type(&self) -> BackendType {
        BackendType::StaticGraph
    }

    fn query(&self, vectors: ArrayView2<'_, f32>, k: usize) -> Result<QueryResult> {
        check_shape(vectors, self.arguments.dim)?;
        check_k(k, self.len())?;
        metrics::counter!("annex_queries_total", "backend" => "static_graph").increment(1);

        let exact = k > self.arguments.ef_search;
        tracing::debug!(rows = vectors.nrows(), k, exact, "static graph query");

        if k == 0 {
            return Ok(vec![Neighbors::new(); vectors.nrows()]);
        }

        let prepared = prepare_batch(vectors, self.arguments.metric.requires_normalization());
        Ok(prepared
            .rows()
            .into_iter()
            .map(|row| {
                let row = row_slice(&row);
                if exact {
                    self.scan(&row, k)
                } else {
                    self.graph.search(&row, k)
                }
            })
            .collect())
    }

    fn insert(&mut self, _vectors: ArrayView2<'_, f32>) -> Result<()> {
        Err(Self::unsupported("insert"))
    }

    fn delete(&mut self, _indices: &[usize]) -> Result<()> {
        Err(Self::unsupported("delete"))
    }

    #[instrument(skip_all, fields(backend = "static_graph", dir = %dir.display()))]
    fn save(&self, dir: &Path) -> Result<()> {
        persistence::ensure_dir(dir)?;
        self.arguments.dump(&dir.join(ARGUMENTS_FILE))?;
        npy::write(&dir.join(VECTORS_FILE), self.vectors.view())?;
        self.graph.save(&dir.join(NEIGHBOR_GRAPH_FILE))?;

        metrics::counter!("annex_saves_total", "backend" => "static_graph").increment(1);
        tracing::info!(rows = self.len(), "saved static graph index");
        Ok(())
    }
}

impl FromVectors for StaticGraphBackend {
    type Args = StaticGraphArgs;

    #[instrument(skip(vectors, args), fields(backend = "static_graph", rows = vectors.nrows(), dim = args.dim))]
    fn from_vectors(vectors: ArrayView2<'_, f32>, args: StaticGraphArgs) -> Result<Self> {
        check_shape(vectors, args.dim)?;
        if vectors.nrows() == 0 {
            return Err(Error::InvalidInput(
                "static graph backend cannot be built from an empty batch".to_string(),
            ));
        }

        let graph = Self::build_graph(vectors, &args);
        metrics::counter!("annex_backend_built_total", "backend" => "static_graph").increment(1);
        Ok(Self {
            arguments: args,
            vectors: vectors.to_owned(),
            graph,
        })
    }

    #[instrument(skip_all, fields(backend = "static_graph", dir = %dir.display()))]
    fn load(dir: &Path) -> Result<Self> {
        let arguments = StaticGraphArgs::load(&dir.join(ARGUMENTS_FILE))?;
        let vectors_path = dir.join(VECTORS_FILE);
        let vectors = npy::read(&vectors_path)?;
        if vectors.ncols() != arguments.dim || vectors.nrows() == 0 {
            return Err(Error::persistence(
                vectors_path,
                format!(
                    "expected a non-empty ({}-column) array, found shape {:?}",
                    arguments.dim,
                    vectors.shape()
                ),
            ));
        }

        let graph_path = dir.join(NEIGHBOR_GRAPH_FILE);
        let graph = if graph_path.is_file() {
            NeighborGraph::load(&graph_path, vectors.nrows(), arguments.metric)?
        } else {
            tracing::info!("neighbor graph cache absent, rebuilding");
            Self::build_graph(vectors.view(), &arguments)
        };

        metrics::counter!("annex_loads_total", "backend" => "static_graph").increment(1);
        tracing::info!(rows = vectors.nrows(), "loaded static graph index");
        Ok(Self {
            arguments,
            vectors,
            graph,
        })
    }

    fn arguments(&self) -> &StaticGraphArgs {
        &self.arguments
    }
}

impl std::fmt::Debug for StaticGraphBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticGraphBackend")
            .field("arguments", &self.arguments)
            .field("rows", &self.vectors.nrows())
            .field("graph_nodes", &self.graph.len())
            .field("graph_metric", &self.graph.metric())
            .finish_non_exhaustive()
    }
}
