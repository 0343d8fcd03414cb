//! Minimal NumPy `.npy` codec for two-dimensional `f32` arrays.
//!
//! Writes format version 1.0 with a `<f4`, C-order header. Reads versions
//! 1.0 to 3.0 with `<f4` or `<f8` little-endian data (the latter is
//! narrowed to `f32`).

use crate::{Error, Result};
use ndarray::{Array2, ArrayView2};
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGNMENT: usize = 64;

/// Encodes `array` as `.npy` bytes.
#[must_use]
pub fn encode(array: ArrayView2<'_, f32>) -> Vec<u8> {
    let (rows, cols) = array.dim();
    let mut header =
        format!("{{'descr': '<f4', 'fortran_order': False, 'shape': ({rows}, {cols}), }}");

    // magic(6) + version(2) + header_len(2) + header + '\n' must be 64-aligned.
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (HEADER_ALIGNMENT - unpadded % HEADER_ALIGNMENT) % HEADER_ALIGNMENT;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len()).unwrap_or(u16::MAX);
    let mut bytes = Vec::with_capacity(unpadded + padding + rows * cols * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&header_len.to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    // Logical (row-major) order regardless of memory layout.
    for value in array {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decodes `.npy` bytes into a two-dimensional `f32` array.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the bytes are not a supported
/// `.npy` payload.
pub fn decode(bytes: &[u8]) -> Result<Array2<f32>> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(invalid("missing .npy magic string"));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (usize::from(u16::from_le_bytes([bytes[8], bytes[9]])), 10),
        2 | 3 => {
            let raw = bytes
                .get(8..12)
                .ok_or_else(|| invalid("truncated .npy header length"))?;
            let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            (usize::try_from(len).map_err(invalid)?, 12)
        },
        other => return Err(invalid(format!("unsupported .npy version {other}"))),
    };

    let data_start = header_start + header_len;
    let header = bytes
        .get(header_start..data_start)
        .ok_or_else(|| invalid("truncated .npy header"))?;
    let header = std::str::from_utf8(header).map_err(invalid)?;
    let header = Header::parse(header)?;

    let data = &bytes[data_start..];
    let count = header
        .rows
        .checked_mul(header.cols)
        .ok_or_else(|| invalid("shape overflows usize"))?;
    let values: Vec<f32> = match header.descr.as_str() {
        "<f4" => read_values(data, count, 4, |chunk| {
            f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
        })?,
        "<f8" => read_values(data, count, 8, |chunk| {
            let mut raw = [0_u8; 8];
            raw.copy_from_slice(chunk);
            #[allow(clippy::cast_possible_truncation)]
            let narrowed = f64::from_le_bytes(raw) as f32;
            narrowed
        })?,
        other => return Err(invalid(format!("unsupported dtype '{other}', expected '<f4'"))),
    };

    let shape = (header.rows, header.cols);
    if header.fortran_order {
        return Array2::from_shape_vec((header.cols, header.rows), values)
            .map(|transposed| transposed.reversed_axes().as_standard_layout().into_owned())
            .map_err(invalid);
    }
    Array2::from_shape_vec(shape, values).map_err(invalid)
}

/// Writes `array` to `path` as `.npy`.
///
/// # Errors
///
/// Returns [`Error::Persistence`] if the file cannot be written.
pub fn write(path: &Path, array: ArrayView2<'_, f32>) -> Result<()> {
    fs::write(path, encode(array)).map_err(|e| Error::persistence(path, e))
}

/// Reads a two-dimensional `f32` array from a `.npy` file.
///
/// # Errors
///
/// Returns [`Error::Persistence`] if the file is missing or malformed.
pub fn read(path: &Path) -> Result<Array2<f32>> {
    let bytes = fs::read(path).map_err(|e| Error::persistence(path, e))?;
    decode(&bytes).map_err(|e| Error::persistence(path, e))
}

fn invalid(cause: impl ToString) -> Error {
    Error::InvalidInput(format!("malformed .npy data: {}", cause.to_string()))
}

fn read_values(
    data: &[u8],
    count: usize,
    width: usize,
    convert: impl Fn(&[u8]) -> f32,
) -> Result<Vec<f32>> {
    let needed = count
        .checked_mul(width)
        .ok_or_else(|| invalid("data size overflows usize"))?;
    if data.len() < needed {
        return Err(invalid(format!(
            "expected {needed} data bytes, found {}",
            data.len()
        )));
    }
    Ok(data[..needed].chunks_exact(width).map(convert).collect())
}

/// Parsed `.npy` header dictionary.
#[derive(Debug, PartialEq, Eq)]
struct Header {
    descr: String,
    fortran_order: bool,
    rows: usize,
    cols: usize,
}

impl Header {
    /// Parses the Python-literal header dict, e.g.
    /// `{'descr': '<f4', 'fortran_order': False, 'shape': (3, 2), }`.
    fn parse(text: &str) -> Result<Self> {
        let descr = Self::value_after(text, "'descr'")?
            .trim_start()
            .strip_prefix('\'')
            .and_then(|rest| rest.split('\'').next())
            .ok_or_else(|| invalid("unreadable 'descr'"))?
            .to_string();

        let fortran_order = Self::value_after(text, "'fortran_order'")?
            .trim_start()
            .starts_with("True");

        let shape = Self::value_after(text, "'shape'")?
            .trim_start()
            .strip_prefix('(')
            .and_then(|rest| rest.split(')').next())
            .ok_or_else(|| invalid("unreadable 'shape'"))?;
        let dims = shape
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.trim_end_matches('L').parse::<usize>().map_err(invalid))
            .collect::<Result<Vec<_>>>()?;

        let (rows, cols) = match dims.as_slice() {
            [rows, cols] => (*rows, *cols),
            [len] => (1, *len),
            other => {
                return Err(invalid(format!(
                    "expected a 2-d array, found {} dimensions",
                    other.len()
                )));
            },
        };

        Ok(Self {
            descr,
            fortran_order,
            rows,
            cols,
        })
    }

    fn value_after<'a>(text: &'a str, key: &str) -> Result<&'a str> {
        let start = text
            .find(key)
            .ok_or_else(|| invalid(format!("header has no {key} key")))?;
        let rest = &text[start + key.len()..];
        rest.trim_start()
            .strip_prefix(':')
            .ok_or_else(|| invalid(format!("header key {key} has no value")))
    }
}
