//! Build-once HNSW neighbor graph (instant-distance).

use super::StaticGraphArgs;
use crate::models::{Neighbors, StaticMetric};
use crate::persistence;
use crate::{Error, Result};
use instant_distance::{Builder, HnswMap, Point, Search};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A graph node: coordinates plus the metric used to compare them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPoint {
    coords: Vec<f32>,
    metric: StaticMetric,
}

impl Point for GraphPoint {
    fn distance(&self, other: &Self) -> f32 {
        self.metric.distance(&self.coords, &other.coords)
    }
}

/// Neighbor graph over a fixed vector set. Values are row indices.
///
/// Every node owns a copy of its coordinates, and the serialized form
/// carries them too: a saved graph answers queries on its own.
#[derive(Serialize, Deserialize)]
pub struct NeighborGraph {
    metric: StaticMetric,
    len: usize,
    map: HnswMap<GraphPoint, usize>,
}

impl NeighborGraph {
    /// Builds the graph from already-prepared rows.
    pub fn build(vectors: ArrayView2<'_, f32>, args: &StaticGraphArgs) -> Self {
        let points: Vec<GraphPoint> = vectors
            .rows()
            .into_iter()
            .map(|row| GraphPoint {
                coords: row.to_vec(),
                metric: args.metric,
            })
            .collect();
        let values: Vec<usize> = (0..points.len()).collect();
        let len = points.len();

        let map = Builder::default()
            .ef_construction(args.ef_construction)
            .ef_search(args.ef_search)
            .seed(args.seed)
            .build(points, values);

        Self {
            metric: args.metric,
            len,
            map,
        }
    }

    /// Number of nodes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Metric the graph was built with.
    pub const fn metric(&self) -> StaticMetric {
        self.metric
    }

    /// Approximate `k` nearest rows to `query`.
    ///
    /// Returns at most `ef_search` neighbors.
    pub fn search(&self, query: &[f32], k: usize) -> Neighbors {
        let point = GraphPoint {
            coords: query.to_vec(),
            metric: self.metric,
        };
        let mut search = Search::default();
        Neighbors::from_pairs(
            self.map
                .search(&point, &mut search)
                .take(k)
                .map(|item| (*item.value, item.distance)),
        )
    }

    /// Writes the graph to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if encoding or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        persistence::write_bincode(path, self)
    }

    /// Reads a graph and checks it matches `rows` vectors under `metric`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the file does not decode or was
    /// built for a different vector set.
    pub fn load(path: &Path, rows: usize, metric: StaticMetric) -> Result<Self> {
        let graph: Self = persistence::read_bincode(path)?;
        if graph.len != rows {
            return Err(Error::persistence(
                path,
                format!("graph has {} nodes, vector set has {rows} rows", graph.len),
            ));
        }
        if graph.metric != metric {
            return Err(Error::persistence(
                path,
                format!("graph metric is {}, arguments say {metric}", graph.metric),
            ));
        }
        Ok(graph)
    }
}
