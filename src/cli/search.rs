//! Query and threshold CLI commands.

use super::{write_error, write_json_line};
use crate::Result;
use crate::backends::{AnyBackend, Backend};
use crate::config::AnnexConfig;
use crate::models::BackendType;
use crate::persistence::npy;
use std::io::Write;
use std::path::PathBuf;

/// Arguments of `annex query`.
#[derive(Debug, Clone)]
pub struct QueryCommand {
    /// Saved index directory.
    pub index: PathBuf,
    /// Backend variant the index was saved as.
    pub backend: BackendType,
    /// `.npy` file with the query vectors.
    pub vectors: PathBuf,
    /// Neighbors per query vector.
    pub k: usize,
}

impl QueryCommand {
    /// Writes one `{"indices": [...], "distances": [...]}` line per query.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or vectors cannot be loaded or the
    /// query fails.
    pub fn run<W: Write>(&self, writer: &mut W) -> Result<()> {
        let backend = AnyBackend::load(&self.index, self.backend)?;
        let queries = npy::read(&self.vectors)?;
        for neighbors in backend.query(queries.view(), self.k)? {
            write_json_line(writer, &neighbors).map_err(write_error)?;
        }
        Ok(())
    }
}

/// Arguments of `annex threshold`.
#[derive(Debug, Clone)]
pub struct ThresholdCommand {
    /// Saved index directory.
    pub index: PathBuf,
    /// Backend variant the index was saved as.
    pub backend: BackendType,
    /// `.npy` file with the query vectors.
    pub vectors: PathBuf,
    /// Exclusive distance bound.
    pub distance: f32,
    /// Over-fetch size; the configured value when unset.
    pub overfetch: Option<usize>,
}

impl ThresholdCommand {
    /// Writes one JSON array of indices per query.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or vectors cannot be loaded or the
    /// query fails.
    pub fn run<W: Write>(&self, config: &AnnexConfig, writer: &mut W) -> Result<()> {
        let backend = AnyBackend::load(&self.index, self.backend)?;
        let queries = npy::read(&self.vectors)?;
        let overfetch = self.overfetch.unwrap_or(config.threshold_overfetch);
        for indices in backend.threshold_with_overfetch(queries.view(), self.distance, overfetch)? {
            write_json_line(writer, &indices).map_err(write_error)?;
        }
        Ok(())
    }
}
