//! Data models shared by every backend.

mod backend;
mod metric;
mod query;

pub use backend::BackendType;
pub use metric::{MutableMetric, StaticMetric};
pub use query::{Neighbors, QueryResult, ThresholdResult};
