//! Reader for NumPy `.npy` arrays holding precomputed recipe embeddings.
//!
//! File format (versions 1.0, 2.0, 3.0):
//! - magic: b"\x93NUMPY"
//! - major, minor: u8, u8
//! - header_len: u16 (v1) or u32 (v2, v3), little-endian
//! - header: Python dict literal, e.g.
//!   `{'descr': '<f4', 'fortran_order': False, 'shape': (1000, 384), }`
//! - data: raw little-endian values in C order
//!
//! Only the dtypes produced by the embedding pipeline are supported.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

static DESCR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'descr'\s*:\s*'([^']*)'").expect("valid regex"));
static FORTRAN_ORDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'fortran_order'\s*:\s*(True|False)").expect("valid regex"));
static SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'shape'\s*:\s*\(([^)]*)\)").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum NpyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a .npy file")]
    BadMagic,

    #[error("Unsupported .npy format version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("Malformed .npy header: {0}")]
    MalformedHeader(String),

    #[error("Unsupported dtype '{0}'")]
    UnsupportedDtype(String),

    #[error("Fortran-ordered arrays are not supported")]
    FortranOrder,

    #[error("Expected a {expected}-dimensional array, got shape {shape:?}")]
    WrongRank { expected: usize, shape: Vec<usize> },

    #[error("Id {0} is not a non-negative integer")]
    InvalidId(f64),
}

/// Element type of an array, parsed from the header `descr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    I4,
    I8,
    U4,
    U8,
    F4,
    F8,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, NpyError> {
        match descr {
            "<i4" => Ok(Dtype::I4),
            "<i8" => Ok(Dtype::I8),
            "<u4" => Ok(Dtype::U4),
            "<u8" => Ok(Dtype::U8),
            "<f4" => Ok(Dtype::F4),
            "<f8" => Ok(Dtype::F8),
            other => Err(NpyError::UnsupportedDtype(other.to_string())),
        }
    }

    fn size(self) -> usize {
        match self {
            Dtype::I4 | Dtype::U4 | Dtype::F4 => 4,
            Dtype::I8 | Dtype::U8 | Dtype::F8 => 8,
        }
    }

    fn is_float(self) -> bool {
        matches!(self, Dtype::F4 | Dtype::F8)
    }
}

#[derive(Debug)]
struct ArrayHeader {
    dtype: Dtype,
    shape: Vec<usize>,
}

impl ArrayHeader {
    /// Fail unless the data section of a file holding `data_len` bytes can
    /// hold every element the shape declares.
    fn check_data_len(&self, data_len: u64) -> Result<(), NpyError> {
        let needed = self
            .shape
            .iter()
            .try_fold(self.dtype.size(), |acc, dim| acc.checked_mul(*dim))
            .ok_or_else(|| NpyError::MalformedHeader(format!("shape {:?} overflows", self.shape)))?;

        if needed as u64 > data_len {
            return Err(NpyError::MalformedHeader(format!(
                "shape {:?} needs {needed} bytes of data, file has {data_len}",
                self.shape
            )));
        }

        Ok(())
    }
}

/// Open `path` and parse its header, checking the declared shape against the
/// file size.
fn open(path: &Path) -> Result<(BufReader<File>, ArrayHeader), NpyError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let mut reader = BufReader::new(file);
    let (header, header_len) = read_header(&mut reader)?;
    header.check_data_len(file_len.saturating_sub(header_len as u64))?;

    Ok((reader, header))
}

/// Read a 1-D array of recipe ids.
///
/// Float arrays are accepted as long as every value is a non-negative
/// integer, since ids often round-trip through float64 in pandas.
pub fn read_ids(path: &Path) -> Result<Vec<u64>, NpyError> {
    let (mut reader, header) = open(path)?;

    let count = match header.shape.as_slice() {
        [count] => *count,
        _ => {
            return Err(NpyError::WrongRank {
                expected: 1,
                shape: header.shape.clone(),
            })
        }
    };

    let mut ids = Vec::with_capacity(count);
    let mut buf = [0u8; 8];
    for _ in 0..count {
        let bytes = &mut buf[..header.dtype.size()];
        reader.read_exact(bytes)?;

        let id = match header.dtype {
            Dtype::I4 => id_from_signed(i32::from_le_bytes(le4(bytes)) as i64)?,
            Dtype::I8 => id_from_signed(i64::from_le_bytes(le8(bytes)))?,
            Dtype::U4 => u32::from_le_bytes(le4(bytes)) as u64,
            Dtype::U8 => u64::from_le_bytes(le8(bytes)),
            Dtype::F4 => id_from_float(f32::from_le_bytes(le4(bytes)) as f64)?,
            Dtype::F8 => id_from_float(f64::from_le_bytes(le8(bytes)))?,
        };
        ids.push(id);
    }

    Ok(ids)
}

/// Read a 2-D float matrix, one embedding per row.
pub fn read_embeddings(path: &Path) -> Result<Vec<Vec<f32>>, NpyError> {
    let (mut reader, header) = open(path)?;

    if !header.dtype.is_float() {
        return Err(NpyError::UnsupportedDtype(format!("{:?}", header.dtype)));
    }

    let (rows, cols) = match header.shape.as_slice() {
        [rows, cols] => (*rows, *cols),
        _ => {
            return Err(NpyError::WrongRank {
                expected: 2,
                shape: header.shape.clone(),
            })
        }
    };

    // zero-width rows take no bytes, so the size check cannot bound `rows`
    if cols == 0 && rows > 0 {
        return Err(NpyError::MalformedHeader(format!(
            "{rows} rows of zero-length embeddings"
        )));
    }

    let mut matrix = Vec::with_capacity(rows);
    let mut buf = [0u8; 8];
    for _ in 0..rows {
        let mut row = Vec::with_capacity(cols);
        for _ in 0..cols {
            let bytes = &mut buf[..header.dtype.size()];
            reader.read_exact(bytes)?;
            let value = match header.dtype {
                Dtype::F4 => f32::from_le_bytes(le4(bytes)),
                _ => f64::from_le_bytes(le8(bytes)) as f32,
            };
            row.push(value);
        }
        matrix.push(row);
    }

    Ok(matrix)
}

/// Parse the preamble and header dict. Also returns the number of bytes
/// consumed.
fn read_header(reader: &mut impl Read) -> Result<(ArrayHeader, usize), NpyError> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let mut version = [0u8; 2];
    reader.read_exact(&mut version)?;

    let (header_len, len_field) = match version[0] {
        1 => {
            let mut len = [0u8; 2];
            reader.read_exact(&mut len)?;
            (u16::from_le_bytes(len) as usize, 2)
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            reader.read_exact(&mut len)?;
            (u32::from_le_bytes(len) as usize, 4)
        }
        major => return Err(NpyError::UnsupportedVersion(major, version[1])),
    };

    let mut raw = vec![0u8; header_len];
    reader.read_exact(&mut raw)?;
    let text = String::from_utf8_lossy(&raw);

    let consumed = MAGIC.len() + version.len() + len_field + header_len;
    Ok((parse_header(&text)?, consumed))
}

fn parse_header(text: &str) -> Result<ArrayHeader, NpyError> {
    let descr = DESCR
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| NpyError::MalformedHeader("missing 'descr'".to_string()))?;

    let fortran_order = FORTRAN_ORDER
        .captures(text)
        .map(|c| &c[1] == "True")
        .ok_or_else(|| NpyError::MalformedHeader("missing 'fortran_order'".to_string()))?;

    let shape = SHAPE
        .captures(text)
        .ok_or_else(|| NpyError::MalformedHeader("missing 'shape'".to_string()))?[1]
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| {
            dim.parse::<usize>()
                .map_err(|_| NpyError::MalformedHeader(format!("bad dimension '{dim}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let dtype = Dtype::parse(&descr)?;

    if fortran_order && shape.len() > 1 {
        return Err(NpyError::FortranOrder);
    }

    Ok(ArrayHeader { dtype, shape })
}

fn id_from_signed(value: i64) -> Result<u64, NpyError> {
    u64::try_from(value).map_err(|_| NpyError::InvalidId(value as f64))
}

fn id_from_float(value: f64) -> Result<u64, NpyError> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Ok(value as u64)
    } else {
        Err(NpyError::InvalidId(value))
    }
}

fn le4(bytes: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes[..4]);
    out
}

fn le8(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&bytes[..8]);
    out
}
