//! On-disk layout shared by every backend.
//!
//! A saved backend is a directory:
//!
//! | File | Written by | Contents |
//! |------|------------|----------|
//! | `arguments.json` | all | flat configuration record |
//! | `index.bin` | mutable graph | engine-native snapshot (opaque) |
//! | `index_meta.json` | mutable graph | slot counter |
//! | `vectors.npy` | static graph | raw source vectors |
//! | `neighbor_graph.bin` | static graph | cached graph with node coordinates (optional on load) |

pub mod npy;

use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Configuration record file name.
pub const ARGUMENTS_FILE: &str = "arguments.json";
/// Engine-native index snapshot file name.
pub const INDEX_FILE: &str = "index.bin";
/// Mutable graph bookkeeping file name.
pub const INDEX_META_FILE: &str = "index_meta.json";
/// Raw vector array file name.
pub const VECTORS_FILE: &str = "vectors.npy";
/// Cached neighbor graph file name.
///
/// The cache is the bincode of the whole graph, node coordinates included,
/// so it repeats the contents of [`VECTORS_FILE`] and roughly doubles the
/// size of a saved static index. Deleting it is safe: the graph is rebuilt
/// from the vectors on load.
pub const NEIGHBOR_GRAPH_FILE: &str = "neighbor_graph.bin";

/// Creates the backend directory if needed.
///
/// # Errors
///
/// Returns [`Error::Persistence`] if the directory cannot be created.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::persistence(dir, e))
}

/// Writes `value` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`Error::Persistence`] if serialization or the write fails.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| Error::persistence(path, e))?;
    fs::write(path, content).map_err(|e| Error::persistence(path, e))
}

/// Reads a JSON value written by [`write_json`].
///
/// # Errors
///
/// Returns [`Error::Persistence`] if the file is missing or malformed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| Error::persistence(path, e))?;
    serde_json::from_str(&content).map_err(|e| Error::persistence(path, e))
}

/// Encodes `value` with bincode and writes it to `path`.
///
/// # Errors
///
/// Returns [`Error::Persistence`] if encoding or the write fails.
pub fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| Error::persistence(path, e))?;
    fs::write(path, bytes).map_err(|e| Error::persistence(path, e))
}

/// Reads a bincode value written by [`write_bincode`].
///
/// # Errors
///
/// Returns [`Error::Persistence`] if the file is missing or does not decode.
pub fn read_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| Error::persistence(path, e))?;
    let (value, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
        .map_err(|e| Error::persistence(path, e))?;
    Ok(value)
}
