//! Mutable graph backend.
//!
//! Wraps an HNSW index that supports incremental insert and tombstone
//! delete. The index is built once at a fixed capacity; every inserted
//! vector takes the next slot, and deleted slots are never reclaimed.
//!
//! # Item indices
//!
//! Item `i` is the `i`-th vector ever added (initial batch first, then
//! inserts in call order). Deleting item `i` hides it from every later
//! query but keeps its slot, so indices stay stable for the backend's
//! lifetime.
//!
//! # `len()`
//!
//! [`Backend::len`] is the live count: slots assigned minus tombstones.
//! [`MutableGraphBackend::slots_used`] is the number of slots ever
//! assigned and [`MutableGraphBackend::capacity`] the declared maximum.

mod engine;

use self::engine::{HnswEngine, index_to_key, key_to_index};
use super::traits::{
    Backend, BackendArgs, FromVectors, check_k, check_shape, prepare_batch, row_slice,
};
use crate::models::{BackendType, MutableMetric, Neighbors, QueryResult};
use crate::persistence::{self, ARGUMENTS_FILE, INDEX_FILE, INDEX_META_FILE};
use crate::{Error, Result};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::instrument;

/// Default graph build quality.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;
/// Default graph degree.
pub const DEFAULT_M: usize = 16;
/// Default search breadth.
pub const DEFAULT_EF_SEARCH: usize = 64;

/// Configuration record of the mutable graph backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableGraphArgs {
    /// Vector dimensionality.
    pub dim: usize,
    /// Distance metric, fixed at construction.
    #[serde(default)]
    pub space: MutableMetric,
    /// Candidate list size while building the graph.
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    /// Maximum out-degree of graph nodes.
    #[serde(default = "default_m")]
    pub m: usize,
    /// Candidate list size while searching.
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
    /// Declared capacity. `None` resolves to the initial batch size.
    #[serde(default)]
    pub max_elements: Option<usize>,
}

const fn default_ef_construction() -> usize {
    DEFAULT_EF_CONSTRUCTION
}

const fn default_m() -> usize {
    DEFAULT_M
}

const fn default_ef_search() -> usize {
    DEFAULT_EF_SEARCH
}

impl MutableGraphArgs {
    /// Creates a record with default tuning for `dim`-dimensional vectors.
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self {
            dim,
            space: MutableMetric::Cosine,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            m: DEFAULT_M,
            ef_search: DEFAULT_EF_SEARCH,
            max_elements: None,
        }
    }

    /// Sets the distance metric.
    #[must_use]
    pub const fn with_space(mut self, space: MutableMetric) -> Self {
        self.space = space;
        self
    }

    /// Declares the maximum number of slots.
    #[must_use]
    pub const fn with_capacity(mut self, max_elements: usize) -> Self {
        self.max_elements = Some(max_elements);
        self
    }

    /// Sets the graph degree.
    #[must_use]
    pub const fn with_m(mut self, m: usize) -> Self {
        self.m = m;
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
}

impl BackendArgs for MutableGraphArgs {
    fn dim(&self) -> usize {
        self.dim
    }
}

/// Bookkeeping persisted next to the engine snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct IndexMeta {
    dim: usize,
    next_slot: usize,
}

/// HNSW backend with insert and tombstone delete.
pub struct MutableGraphBackend {
    arguments: MutableGraphArgs,
    engine: HnswEngine,
    next_slot: usize,
}

impl MutableGraphBackend {
    /// Number of slots ever assigned, tombstones included.
    #[must_use]
    pub const fn slots_used(&self) -> usize {
        self.next_slot
    }

    /// Declared capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arguments.max_elements.unwrap_or(self.next_slot)
    }

    /// Returns true if item `index` was assigned and not deleted.
    #[must_use]
    pub fn is_live(&self, index: usize) -> bool {
        index < self.next_slot
            && index_to_key(index).is_ok_and(|key| self.engine.contains(key))
    }

    fn add_batch(&mut self, vectors: ArrayView2<'_, f32>) -> Result<()> {
        let prepared = prepare_batch(vectors, self.arguments.space.requires_normalization());
        for row in prepared.rows() {
            let key = index_to_key(self.next_slot)?;
            self.engine.add(key, &row_slice(&row))?;
            self.next_slot += 1;
        }
        Ok(())
    }
}

impl Backend for MutableGraphBackend {
    fn len(&self) -> usize {
        self.engine.size()
    }

    fn dim(&self) -> usize {
        self.arguments.dim
    }

    fn backend_type(&self) -> BackendType {
        BackendType::MutableGraph
    }

    fn query(&self, vectors: ArrayView2<'_, f32>, k: usize) -> Result<QueryResult> {
        check_shape(vectors, self.arguments.dim)?;
        check_k(k, self.len())?;
        metrics::counter!("annex_queries_total", "backend" => "mutable_graph").increment(1);
        tracing::debug!(rows = vectors.nrows(), k, live = self.len(), "mutable graph query");

        if k == 0 {
            return Ok(vec![Neighbors::new(); vectors.nrows()]);
        }

        let prepared = prepare_batch(vectors, self.arguments.space.requires_normalization());
        prepared
            .rows()
            .into_iter()
            .map(|row| {
                let (keys, distances) = self.engine.search(&row_slice(&row), k)?;
                let indices = keys
                    .into_iter()
                    .map(key_to_index)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Neighbors { indices, distances })
            })
            .collect()
    }

    #[instrument(skip(self, vectors), fields(backend = "mutable_graph", rows = vectors.nrows()))]
    fn insert(&mut self, vectors: ArrayView2<'_, f32>) -> Result<()> {
        check_shape(vectors, self.arguments.dim)?;
        if vectors.nrows() == 0 {
            return Ok(());
        }

        let capacity = self.capacity();
        let free = capacity.saturating_sub(self.next_slot);
        if vectors.nrows() > free {
            return Err(Error::Capacity {
                operation: "insert".to_string(),
                requested: vectors.nrows(),
                available: free,
            });
        }

        self.add_batch(vectors)?;
        metrics::counter!("annex_inserted_vectors_total", "backend" => "mutable_graph")
            .increment(vectors.nrows() as u64);
        Ok(())
    }

    #[instrument(skip(self, indices), fields(backend = "mutable_graph", count = indices.len()))]
    fn delete(&mut self, indices: &[usize]) -> Result<()> {
        let unique: BTreeSet<usize> = indices.iter().copied().collect();
        if let Some(bad) = unique.iter().find(|&&index| !self.is_live(index)) {
            let reason = if *bad < self.next_slot {
                "is already deleted"
            } else {
                "was never assigned"
            };
            return Err(Error::InvalidInput(format!("item {bad} {reason}")));
        }

        for &index in &unique {
            self.engine.mark_deleted(index_to_key(index)?)?;
        }
        metrics::counter!("annex_deleted_vectors_total", "backend" => "mutable_graph")
            .increment(unique.len() as u64);
        Ok(())
    }

    #[instrument(skip_all, fields(backend = "mutable_graph", dir = %dir.display()))]
    fn save(&self, dir: &Path) -> Result<()> {
        persistence::ensure_dir(dir)?;
        self.arguments.dump(&dir.join(ARGUMENTS_FILE))?;
        self.engine.save_to(&dir.join(INDEX_FILE))?;
        persistence::write_json(
            &dir.join(INDEX_META_FILE),
            &IndexMeta {
                dim: self.arguments.dim,
                next_slot: self.next_slot,
            },
        )?;

        metrics::counter!("annex_saves_total", "backend" => "mutable_graph").increment(1);
        tracing::info!(live = self.len(), slots = self.next_slot, "saved mutable graph index");
        Ok(())
    }
}

impl FromVectors for MutableGraphBackend {
    type Args = MutableGraphArgs;

    #[instrument(skip(vectors, args), fields(backend = "mutable_graph", rows = vectors.nrows(), dim = args.dim))]
    fn from_vectors(vectors: ArrayView2<'_, f32>, mut args: MutableGraphArgs) -> Result<Self> {
        check_shape(vectors, args.dim)?;

        let capacity = args.max_elements.unwrap_or(vectors.nrows());
        if capacity < vectors.nrows() {
            return Err(Error::Capacity {
                operation: "from_vectors".to_string(),
                requested: vectors.nrows(),
                available: capacity,
            });
        }
        args.max_elements = Some(capacity);

        let engine = HnswEngine::new(&args, capacity)?;
        let mut backend = Self {
            arguments: args,
            engine,
            next_slot: 0,
        };
        backend.add_batch(vectors)?;

        metrics::counter!("annex_backend_built_total", "backend" => "mutable_graph").increment(1);
        Ok(backend)
    }

    #[instrument(skip_all, fields(backend = "mutable_graph", dir = %dir.display()))]
    fn load(dir: &Path) -> Result<Self> {
        let arguments = MutableGraphArgs::load(&dir.join(ARGUMENTS_FILE))?;
        let meta_path = dir.join(INDEX_META_FILE);
        let meta: IndexMeta = persistence::read_json(&meta_path)?;
        if meta.dim != arguments.dim {
            return Err(Error::persistence(
                meta_path,
                format!(
                    "dimension {} does not match arguments dimension {}",
                    meta.dim, arguments.dim
                ),
            ));
        }

        let capacity = arguments
            .max_elements
            .unwrap_or(meta.next_slot)
            .max(meta.next_slot);
        let engine = HnswEngine::load_from(&dir.join(INDEX_FILE), &arguments, capacity)?;

        metrics::counter!("annex_loads_total", "backend" => "mutable_graph").increment(1);
        tracing::info!(live = engine.size(), slots = meta.next_slot, "loaded mutable graph index");
        Ok(Self {
            arguments,
            engine,
            next_slot: meta.next_slot,
        })
    }

    fn arguments(&self) -> &MutableGraphArgs {
        &self.arguments
    }
}

impl std::fmt::Debug for MutableGraphBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutableGraphBackend")
            .field("arguments", &self.arguments)
            .field("live", &self.len())
            .field("next_slot", &self.next_slot)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Axis, Slice, arr2};
    use tempfile::TempDir;

    fn sample_vectors(rows: usize, dim: usize) -> Array2<f32> {
        Array2::from_shape_fn((rows, dim), |(i, j)| (((i + 1) * (j + 1)) as f32 * 0.37).sin())
    }

    fn build(rows: usize, args: MutableGraphArgs) -> MutableGraphBackend {
        MutableGraphBackend::from_vectors(sample_vectors(rows, args.dim).view(), args)
            .expect("build failed")
    }

    #[test]
    fn test_args_defaults() {
        let args = MutableGraphArgs::new(32);
        assert_eq!(args.space, MutableMetric::Cosine);
        assert_eq!(args.ef_construction, 200);
        assert_eq!(args.m, 16);
        assert_eq!(args.ef_search, 64);
        assert_eq!(args.max_elements, None);
    }

    #[test]
    fn test_args_deserialize_fills_defaults() {
        let args: MutableGraphArgs =
            serde_json::from_str(r#"{"dim": 8, "space": "l2"}"#).expect("parse failed");
        assert_eq!(args, MutableGraphArgs::new(8).with_space(MutableMetric::L2));
    }

    #[test]
    fn test_args_to_dict_is_flat() {
        let dict = MutableGraphArgs::new(4)
            .with_capacity(10)
            .to_dict()
            .expect("to_dict failed");
        assert_eq!(dict["dim"], 4);
        assert_eq!(dict["space"], "cosine");
        assert_eq!(dict["max_elements"], 10);
    }

    #[test]
    fn test_from_vectors_resolves_capacity() {
        let backend = build(20, MutableGraphArgs::new(8));
        assert_eq!(backend.len(), 20);
        assert_eq!(backend.slots_used(), 20);
        assert_eq!(backend.capacity(), 20);
        assert_eq!(backend.arguments().max_elements, Some(20));
        assert_eq!(backend.dim(), 8);
        assert_eq!(backend.backend_type(), BackendType::MutableGraph);
    }

    #[test]
    fn test_from_vectors_capacity_too_small() {
        let args = MutableGraphArgs::new(8).with_capacity(5);
        let result = MutableGraphBackend::from_vectors(sample_vectors(6, 8).view(), args);
        assert!(matches!(result, Err(Error::Capacity { .. })));
    }

    #[test]
    fn test_from_vectors_shape_mismatch() {
        let result =
            MutableGraphBackend::from_vectors(sample_vectors(3, 4).view(), MutableGraphArgs::new(8));
        assert!(matches!(
            result,
            Err(Error::Shape {
                expected: 8,
                got: 4
            })
        ));
    }

    #[test]
    fn test_query_returns_self() {
        let vectors = sample_vectors(50, 8);
        let backend = MutableGraphBackend::from_vectors(vectors.view(), MutableGraphArgs::new(8))
            .expect("build failed");
        let results = backend
            .query(vectors.slice_axis(Axis(0), Slice::from(10..13)), 1)
            .expect("query failed");
        for (offset, neighbors) in results.iter().enumerate() {
            let (index, distance) = neighbors.first().expect("no neighbor");
            assert_eq!(index, 10 + offset);
            assert!(distance.abs() < 1e-4);
        }
    }

    #[test]
    fn test_query_k_zero_and_capacity() {
        let backend = build(5, MutableGraphArgs::new(4));
        let queries = sample_vectors(2, 4);

        let results = backend.query(queries.view(), 0).expect("query failed");
        assert_eq!(results, vec![Neighbors::new(); 2]);

        assert!(matches!(
            backend.query(queries.view(), 6),
            Err(Error::Capacity {
                requested: 6,
                available: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_query_does_not_mutate_input() {
        let backend = build(5, MutableGraphArgs::new(2));
        let queries = arr2(&[[3.0_f32, 4.0]]);
        backend.query(queries.view(), 1).expect("query failed");
        assert_eq!(queries, arr2(&[[3.0_f32, 4.0]]));
    }

    #[test]
    fn test_insert_appends_slots() {
        let mut backend = build(4, MutableGraphArgs::new(4).with_capacity(10));
        let extra = arr2(&[[0.0_f32, 0.0, 0.0, 9.0], [9.0, 0.0, 0.0, 0.0]]);
        backend.insert(extra.view()).expect("insert failed");

        assert_eq!(backend.len(), 6);
        assert_eq!(backend.slots_used(), 6);
        let results = backend.query(extra.view(), 1).expect("query failed");
        assert_eq!(results[0].indices, vec![4]);
        assert_eq!(results[1].indices, vec![5]);
    }

    #[test]
    fn test_insert_beyond_capacity() {
        let mut backend = build(4, MutableGraphArgs::new(4).with_capacity(5));
        let result = backend.insert(sample_vectors(2, 4).view());
        assert!(matches!(
            result,
            Err(Error::Capacity {
                requested: 2,
                available: 1,
                ..
            })
        ));
        assert_eq!(backend.len(), 4);
    }

    #[test]
    fn test_delete_hides_item_and_keeps_slot() {
        let vectors = sample_vectors(10, 4);
        let mut backend =
            MutableGraphBackend::from_vectors(vectors.view(), MutableGraphArgs::new(4))
                .expect("build failed");
        backend.delete(&[3, 3]).expect("delete failed");

        assert_eq!(backend.len(), 9);
        assert_eq!(backend.slots_used(), 10);
        assert!(!backend.is_live(3));

        let results = backend.query(vectors.view(), 9).expect("query failed");
        assert!(results.iter().all(|n| !n.indices.contains(&3)));
    }

    #[test]
    fn test_delete_rejects_bad_batch_atomically() {
        let mut backend = build(5, MutableGraphArgs::new(4));
        backend.delete(&[1]).expect("delete failed");

        let err = backend.delete(&[2, 1]).expect_err("already deleted");
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(backend.is_live(2));

        let err = backend.delete(&[0, 99]).expect_err("never assigned");
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(backend.is_live(0));
        assert_eq!(backend.len(), 4);
    }

    #[test]
    fn test_deleted_slots_are_not_reused() {
        let mut backend = build(3, MutableGraphArgs::new(4).with_capacity(4));
        backend.delete(&[0]).expect("delete failed");
        backend.insert(sample_vectors(1, 4).view()).expect("insert failed");
        assert_eq!(backend.slots_used(), 4);
        assert!(!backend.is_live(0));
        assert!(backend.is_live(3));

        let result = backend.insert(sample_vectors(1, 4).view());
        assert!(matches!(result, Err(Error::Capacity { .. })));
    }

    #[test]
    fn test_save_load_keeps_slot_counter() {
        let dir = TempDir::new().expect("tempdir failed");
        let mut backend = build(6, MutableGraphArgs::new(4).with_capacity(8));
        backend.delete(&[5]).expect("delete failed");
        backend.save(dir.path()).expect("save failed");

        let mut loaded = MutableGraphBackend::load(dir.path()).expect("load failed");
        assert_eq!(loaded.len(), 5);
        assert_eq!(loaded.slots_used(), 6);
        assert_eq!(loaded.capacity(), 8);
        assert_eq!(loaded.arguments(), backend.arguments());

        loaded
            .insert(sample_vectors(1, 4).view())
            .expect("insert after load failed");
        assert!(loaded.is_live(6));
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = TempDir::new().expect("tempdir failed");
        let result = MutableGraphBackend::load(&dir.path().join("absent"));
        assert!(matches!(result, Err(Error::Persistence { .. })));
    }
}
