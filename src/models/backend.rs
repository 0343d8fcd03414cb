//! Backend kind tag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of backend variants.
///
/// Callers check [`supports_mutation`](Self::supports_mutation) before
/// calling `insert` or `delete`; persistence uses the tag to pick the
/// loader for a saved directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// HNSW graph with dynamic insert and tombstone delete.
    MutableGraph,
    /// Graph built once from a fixed vector set.
    StaticGraph,
}

impl BackendType {
    /// Returns the type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MutableGraph => "mutable_graph",
            Self::StaticGraph => "static_graph",
        }
    }

    /// Returns true if `insert` and `delete` are supported.
    #[must_use]
    pub const fn supports_mutation(&self) -> bool {
        matches!(self, Self::MutableGraph)
    }

    /// Returns all backend types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::MutableGraph, Self::StaticGraph]
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "mutable_graph" | "mutable" | "hnsw" => Ok(Self::MutableGraph),
            "static_graph" | "static" => Ok(Self::StaticGraph),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown backend type: {other}"
            ))),
        }
    }
}
