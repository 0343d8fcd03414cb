//! Info CLI command.

use super::{write_error, write_json_line};
use crate::Result;
use crate::backends::{AnyBackend, Backend};
use crate::models::BackendType;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Arguments of `annex info`.
#[derive(Debug, Clone)]
pub struct InfoCommand {
    /// Saved index directory.
    pub index: PathBuf,
    /// Backend variant the index was saved as.
    pub backend: BackendType,
}

#[derive(Debug, Serialize)]
struct IndexInfo {
    backend: BackendType,
    supports_mutation: bool,
    dim: usize,
    len: usize,
    arguments: serde_json::Map<String, serde_json::Value>,
}

impl InfoCommand {
    /// Loads the index and writes a JSON description line.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be loaded.
    pub fn run<W: Write>(&self, writer: &mut W) -> Result<()> {
        let backend = AnyBackend::load(&self.index, self.backend)?;
        let info = IndexInfo {
            backend: backend.backend_type(),
            supports_mutation: backend.backend_type().supports_mutation(),
            dim: backend.dim(),
            len: backend.len(),
            arguments: backend.arguments_dict()?,
        };
        write_json_line(writer, &info).map_err(write_error)
    }
}
