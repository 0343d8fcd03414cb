//! usearch HNSW engine behind the mutable graph backend.
//!
//! When the `usearch-hnsw` feature is enabled, this uses the native usearch
//! library for approximate nearest neighbor search. Otherwise, an exact
//! pure-Rust fallback with the same interface and tombstone semantics is
//! used.
//!
//! The backend only talks to [`HnswEngine`] through: `new` (build and
//! reserve capacity), `add`, `mark_deleted`, `contains`, `size`, `search`,
//! `save_to` and `load_from`. Keys are slot numbers assigned by the
//! backend.

use super::MutableGraphArgs;
use crate::{Error, Result};
use std::path::Path;

// ============================================================================
// Native usearch Implementation (with feature)
// ============================================================================

#[cfg(feature = "usearch-hnsw")]
mod native {
    use super::{Error, MutableGraphArgs, Path, Result};
    use crate::models::MutableMetric;
    use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

    /// Native usearch HNSW index.
    pub struct HnswEngine {
        index: Index,
    }

    const fn metric_kind(metric: MutableMetric) -> MetricKind {
        match metric {
            MutableMetric::Cosine => MetricKind::Cos,
            MutableMetric::L2 => MetricKind::L2sq,
            MutableMetric::Ip => MetricKind::IP,
        }
    }

    fn create_index(args: &MutableGraphArgs, capacity: usize) -> Result<Index> {
        let options = IndexOptions {
            dimensions: args.dim,
            metric: metric_kind(args.space),
            quantization: ScalarKind::F32,
            connectivity: args.m,
            expansion_add: args.ef_construction,
            expansion_search: args.ef_search,
            multi: false,
        };

        let index = Index::new(&options).map_err(|e| Error::operation("create_usearch_index", e))?;
        index
            .reserve(capacity)
            .map_err(|e| Error::operation("reserve_usearch_capacity", e))?;
        Ok(index)
    }

    impl HnswEngine {
        /// Creates an empty index with room for `capacity` items.
        pub fn new(args: &MutableGraphArgs, capacity: usize) -> Result<Self> {
            Ok(Self {
                index: create_index(args, capacity)?,
            })
        }

        /// Adds `vector` under `key`.
        pub fn add(&mut self, key: u64, vector: &[f32]) -> Result<()> {
            self.index
                .add(key, vector)
                .map_err(|e| Error::operation("usearch_add", e))
        }

        /// Tombstones `key`; it is excluded from later searches.
        pub fn mark_deleted(&mut self, key: u64) -> Result<()> {
            let removed = self
                .index
                .remove(key)
                .map_err(|e| Error::operation("usearch_remove", e))?;
            if removed == 0 {
                return Err(Error::operation(
                    "usearch_remove",
                    format!("key {key} is not present"),
                ));
            }
            Ok(())
        }

        /// Returns true if `key` is live.
        pub fn contains(&self, key: u64) -> bool {
            self.index.contains(key)
        }

        /// Live item count.
        pub fn size(&self) -> usize {
            self.index.size()
        }

        /// Searches the `k` nearest live keys.
        pub fn search(&self, query: &[f32], k: usize) -> Result<(Vec<u64>, Vec<f32>)> {
            if k == 0 || self.index.size() == 0 {
                return Ok((Vec::new(), Vec::new()));
            }
            let matches = self
                .index
                .search(query, k)
                .map_err(|e| Error::operation("usearch_search", e))?;
            Ok((matches.keys, matches.distances))
        }

        /// Writes the engine-native snapshot.
        pub fn save_to(&self, path: &Path) -> Result<()> {
            self.index
                .save(path.to_string_lossy().as_ref())
                .map_err(|e| Error::persistence(path, e))
        }

        /// Loads a snapshot written by [`save_to`](Self::save_to).
        pub fn load_from(path: &Path, args: &MutableGraphArgs, capacity: usize) -> Result<Self> {
            if !path.is_file() {
                return Err(Error::persistence(path, "index snapshot not found"));
            }
            let index = create_index(args, capacity)?;
            index
                .load(path.to_string_lossy().as_ref())
                .map_err(|e| Error::persistence(path, e))?;
            if index.dimensions() != args.dim {
                return Err(Error::persistence(
                    path,
                    format!(
                        "index dimensions mismatch: expected {}, got {}",
                        args.dim,
                        index.dimensions()
                    ),
                ));
            }
            // Loading shrinks the reservation to the stored size.
            index
                .reserve(capacity)
                .map_err(|e| Error::operation("reserve_usearch_capacity", e))?;
            Ok(Self { index })
        }
    }
}

// ============================================================================
// Pure Rust Fallback Implementation (without feature)
// ============================================================================

#[cfg(not(feature = "usearch-hnsw"))]
mod fallback {
    use super::{Error, MutableGraphArgs, Path, Result};
    use crate::models::MutableMetric;
    use crate::persistence;
    use serde::{Deserialize, Serialize};

    /// Pure-Rust fallback index.
    ///
    /// This is a brute-force O(n) implementation used when the
    /// `usearch-hnsw` feature is not enabled. Deleted slots stay allocated
    /// as `None`, mirroring the graph engine's tombstones.
    pub struct HnswEngine {
        dim: usize,
        metric: MutableMetric,
        capacity: usize,
        slots: Vec<Option<Vec<f32>>>,
        live: usize,
    }

    /// Snapshot layout of `index.bin` for the fallback engine.
    #[derive(Serialize, Deserialize)]
    struct Snapshot {
        dim: usize,
        metric: MutableMetric,
        slots: Vec<Option<Vec<f32>>>,
    }

    impl HnswEngine {
        /// Creates an empty index with room for `capacity` items.
        #[allow(clippy::unnecessary_wraps)]
        pub fn new(args: &MutableGraphArgs, capacity: usize) -> Result<Self> {
            Ok(Self {
                dim: args.dim,
                metric: args.space,
                capacity,
                slots: Vec::with_capacity(capacity),
                live: 0,
            })
        }

        fn slot_of(key: u64) -> Result<usize> {
            usize::try_from(key).map_err(|e| Error::operation("fallback_key", e))
        }

        /// Adds `vector` under `key`.
        pub fn add(&mut self, key: u64, vector: &[f32]) -> Result<()> {
            let slot = Self::slot_of(key)?;
            if slot >= self.capacity {
                return Err(Error::operation(
                    "fallback_add",
                    format!("key {key} is beyond the reserved capacity {}", self.capacity),
                ));
            }
            if vector.len() != self.dim {
                return Err(Error::Shape {
                    expected: self.dim,
                    got: vector.len(),
                });
            }
            if self.slots.len() <= slot {
                self.slots.resize(slot + 1, None);
            }
            if self.slots[slot].replace(vector.to_vec()).is_none() {
                self.live += 1;
            }
            Ok(())
        }

        /// Tombstones `key`; it is excluded from later searches.
        pub fn mark_deleted(&mut self, key: u64) -> Result<()> {
            let slot = Self::slot_of(key)?;
            match self.slots.get_mut(slot).and_then(Option::take) {
                Some(_) => {
                    self.live -= 1;
                    Ok(())
                },
                None => Err(Error::operation(
                    "fallback_remove",
                    format!("key {key} is not present"),
                )),
            }
        }

        /// Returns true if `key` is live.
        pub fn contains(&self, key: u64) -> bool {
            Self::slot_of(key)
                .ok()
                .and_then(|slot| self.slots.get(slot))
                .is_some_and(Option::is_some)
        }

        /// Live item count.
        pub const fn size(&self) -> usize {
            self.live
        }

        /// Searches the `k` nearest live keys (exact).
        #[allow(clippy::unnecessary_wraps)]
        pub fn search(&self, query: &[f32], k: usize) -> Result<(Vec<u64>, Vec<f32>)> {
            let mut scored: Vec<(u64, f32)> = self
                .slots
                .iter()
                .enumerate()
                .filter_map(|(slot, vector)| {
                    let vector = vector.as_ref()?;
                    let key = u64::try_from(slot).ok()?;
                    Some((key, self.metric.distance(query, vector)))
                })
                .collect();

            scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            scored.truncate(k);
            Ok(scored.into_iter().unzip())
        }

        /// Writes the snapshot.
        pub fn save_to(&self, path: &Path) -> Result<()> {
            persistence::write_bincode(
                path,
                &Snapshot {
                    dim: self.dim,
                    metric: self.metric,
                    slots: self.slots.clone(),
                },
            )
        }

        /// Loads a snapshot written by [`save_to`](Self::save_to).
        pub fn load_from(path: &Path, args: &MutableGraphArgs, capacity: usize) -> Result<Self> {
            let snapshot: Snapshot = persistence::read_bincode(path)?;
            if snapshot.dim != args.dim || snapshot.metric != args.space {
                return Err(Error::persistence(
                    path,
                    format!(
                        "snapshot is {}-d {}, arguments say {}-d {}",
                        snapshot.dim, snapshot.metric, args.dim, args.space
                    ),
                ));
            }
            if snapshot.slots.len() > capacity {
                return Err(Error::persistence(
                    path,
                    format!(
                        "snapshot holds {} slots, capacity is {capacity}",
                        snapshot.slots.len()
                    ),
                ));
            }
            let live = snapshot.slots.iter().filter(|slot| slot.is_some()).count();
            Ok(Self {
                dim: snapshot.dim,
                metric: snapshot.metric,
                capacity,
                slots: snapshot.slots,
                live,
            })
        }
    }

}

// ============================================================================
// Public Re-exports
// ============================================================================

#[cfg(feature = "usearch-hnsw")]
pub use native::HnswEngine;

#[cfg(not(feature = "usearch-hnsw"))]
pub use fallback::HnswEngine;

/// Converts an engine key back into an item index.
pub fn key_to_index(key: u64) -> Result<usize> {
    usize::try_from(key).map_err(|e| Error::operation("engine_key", e))
}

/// Converts an item index into an engine key.
pub fn index_to_key(index: usize) -> Result<u64> {
    u64::try_from(index).map_err(|e| Error::operation("engine_key", e))
}
