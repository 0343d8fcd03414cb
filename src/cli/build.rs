//! Build CLI command.

use super::{write_error, write_json_line};
use crate::backends::{Backend, FromVectors, MutableGraphBackend, StaticGraphBackend};
use crate::config::AnnexConfig;
use crate::models::BackendType;
use crate::persistence::npy;
use crate::{Error, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Arguments of `annex build`.
#[derive(Debug, Clone)]
pub struct BuildCommand {
    /// Backend variant to build.
    pub backend: BackendType,
    /// `.npy` file with the source vectors.
    pub vectors: PathBuf,
    /// Directory the index is saved into.
    pub out: PathBuf,
    /// Declared capacity (mutable graph only).
    pub capacity: Option<usize>,
}

/// Summary line printed after a build.
#[derive(Debug, Serialize)]
struct BuildSummary<'a> {
    backend: BackendType,
    dim: usize,
    len: usize,
    out: &'a Path,
}

impl BuildCommand {
    /// Builds the index, saves it and writes a JSON summary line.
    ///
    /// # Errors
    ///
    /// Returns an error if the vectors cannot be read, the build fails, or
    /// the index cannot be saved.
    pub fn run<W: Write>(&self, config: &AnnexConfig, writer: &mut W) -> Result<()> {
        let vectors = npy::read(&self.vectors)?;
        let dim = vectors.ncols();

        let (dim, len) = match self.backend {
            BackendType::MutableGraph => {
                let mut args = config.mutable_graph_args(dim);
                if let Some(capacity) = self.capacity {
                    args = args.with_capacity(capacity);
                }
                let backend = MutableGraphBackend::from_vectors(vectors.view(), args)?;
                backend.save(&self.out)?;
                (backend.dim(), backend.len())
            },
            BackendType::StaticGraph => {
                if self.capacity.is_some() {
                    return Err(Error::InvalidInput(
                        "--capacity only applies to the mutable_graph backend".to_string(),
                    ));
                }
                let backend =
                    StaticGraphBackend::from_vectors(vectors.view(), config.static_graph_args(dim))?;
                backend.save(&self.out)?;
                (backend.dim(), backend.len())
            },
        };

        write_json_line(
            writer,
            &BuildSummary {
                backend: self.backend,
                dim,
                len,
                out: &self.out,
            },
        )
        .map_err(write_error)
    }
}
