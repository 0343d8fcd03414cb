//! Distance metrics supported by each backend.
//!
//! Every metric is expressed as a distance: smaller is closer, and query
//! results are ordered by ascending distance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distance metric for the mutable graph backend.
///
/// | Metric | Distance |
/// |--------|----------|
/// | `Cosine` | `1 - cos(a, b)` |
/// | `L2` | squared Euclidean distance |
/// | `Ip` | `1 - a·b` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutableMetric {
    /// Cosine distance (vectors are normalized before comparison).
    #[default]
    Cosine,
    /// Squared Euclidean distance.
    L2,
    /// Inner-product distance.
    Ip,
}

impl MutableMetric {
    /// Returns the metric as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
            Self::Ip => "ip",
        }
    }

    /// Returns true if vectors must be unit length before comparison.
    #[must_use]
    pub const fn requires_normalization(&self) -> bool {
        matches!(self, Self::Cosine)
    }

    /// Computes the distance between two equal-length vectors.
    #[must_use]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_distance(a, b),
            Self::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Self::Ip => 1.0 - dot(a, b),
        }
    }
}

impl fmt::Display for MutableMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutableMetric {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "cos" => Ok(Self::Cosine),
            "l2" | "l2sq" => Ok(Self::L2),
            "ip" | "dot" => Ok(Self::Ip),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown mutable graph metric: {other}"
            ))),
        }
    }
}

/// Distance metric for the static graph backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticMetric {
    /// Cosine distance (angular; normalized at build and query time).
    #[default]
    Cosine,
    /// Euclidean (L2) distance.
    Euclidean,
    /// Manhattan (L1) distance.
    Manhattan,
}

impl StaticMetric {
    /// Returns the metric as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
        }
    }

    /// Returns true for angular metrics.
    #[must_use]
    pub const fn requires_normalization(&self) -> bool {
        matches!(self, Self::Cosine)
    }

    /// Computes the distance between two equal-length vectors.
    #[must_use]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_distance(a, b),
            Self::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            Self::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

impl fmt::Display for StaticMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaticMetric {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "cos" => Ok(Self::Cosine),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "manhattan" | "l1" => Ok(Self::Manhattan),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown static graph metric: {other}"
            ))),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine distance, `1.0` when either side is the zero vector.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let similarity = (dot(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0);
    1.0 - similarity
}
