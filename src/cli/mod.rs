//! CLI command implementations.
//!
//! Each command writes JSON lines to the writer it is given; the binary
//! passes a locked stdout. Logs go to stderr.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `build` | Build an index from a `.npy` file and save it |
//! | `query` | k-nearest-neighbor search against a saved index |
//! | `threshold` | All neighbors within a distance, per query vector |
//! | `info` | Describe a saved index |
//!
//! # Example Usage
//!
//! ```bash
//! annex build --backend mutable_graph --vectors corpus.npy --out ./idx --capacity 50000
//! annex query --index ./idx --backend mutable_graph --vectors probes.npy -k 10
//! annex threshold --index ./idx --backend mutable_graph --vectors probes.npy --distance 0.2
//! annex info --index ./idx --backend mutable_graph
//! ```

mod build;
mod info;
mod search;

pub use build::BuildCommand;
pub use info::InfoCommand;
pub use search::{QueryCommand, ThresholdCommand};

use crate::Error;
use serde::Serialize;
use std::io::{self, Write};

/// Writes `value` as a single JSON line.
fn write_json_line<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")
}

#[allow(clippy::needless_pass_by_value)]
fn write_error(e: io::Error) -> Error {
    Error::operation("write_output", e)
}
