//! Segment (trial boundary) file encoding.
//!
//! Layout: 8-byte magic, u32 version, u32 row count, u32 column count, then
//! row-major little-endian `i64` values.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array2;

use super::error::ContainerError;
use super::result::TrialTable;

const SEG_MAGIC: &[u8; 8] = b"SPWSEG01";
const SEG_VERSION: u32 = 1;
const MAX_SEG_CELLS: u64 = 1 << 32;

pub(crate) fn write_seg(path: &Path, table: &TrialTable) -> Result<(), ContainerError> {
    let io_err = |source| ContainerError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    out.write_all(SEG_MAGIC).map_err(io_err)?;
    out.write_all(&SEG_VERSION.to_le_bytes()).map_err(io_err)?;
    out.write_all(&(table.n_trials() as u32).to_le_bytes())
        .map_err(io_err)?;
    out.write_all(&(table.n_columns() as u32).to_le_bytes())
        .map_err(io_err)?;
    for &value in table.rows().iter() {
        out.write_all(&value.to_le_bytes()).map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    Ok(())
}

pub(crate) fn read_seg(path: &Path) -> Result<TrialTable, ContainerError> {
    let io_err = |source| ContainerError::Io {
        path: path.to_path_buf(),
        source,
    };
    let bad = |detail: &str| ContainerError::SegFormat {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    };
    let file = File::open(path).map_err(io_err)?;
    let mut input = BufReader::new(file);

    let mut magic = [0u8; 8];
    input.read_exact(&mut magic).map_err(io_err)?;
    if &magic != SEG_MAGIC {
        return Err(bad("magic mismatch"));
    }
    let version = read_u32(&mut input).map_err(io_err)?;
    if version != SEG_VERSION {
        return Err(bad("unsupported version"));
    }
    let rows = read_u32(&mut input).map_err(io_err)? as usize;
    let cols = read_u32(&mut input).map_err(io_err)? as usize;
    if (rows as u64) * (cols as u64) > MAX_SEG_CELLS {
        return Err(bad("implausible table dimensions"));
    }

    let mut values = Vec::with_capacity(rows * cols);
    let mut buf = [0u8; 8];
    for _ in 0..rows * cols {
        input.read_exact(&mut buf).map_err(io_err)?;
        values.push(i64::from_le_bytes(buf));
    }
    let rows = Array2::from_shape_vec((rows, cols), values)
        .map_err(|_| bad("row data does not match dimensions"))?;
    Ok(TrialTable::new(rows))
}

fn read_u32(input: &mut impl Read) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
