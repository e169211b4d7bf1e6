//! Reading `.spw` containers back, with checksum verification.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, IxDyn};
use rustfft::num_complex::{Complex32, Complex64};
use serde_json::Value;

use super::checksum::hash_file;
use super::dtype::{DataChunk, Dtype};
use super::error::ContainerError;
use super::result::TrialTable;
use super::seg::read_seg;
use super::{DAT_EXT, SEG_EXT};

/// Parsed `.info` metadata document.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub label: Vec<String>,
    pub segment_label: String,
    pub log: String,
    pub seg_checksum: String,
    pub dat_checksum: String,
    pub data_dtype: Dtype,
    pub data_shape: Vec<usize>,
    /// The full document, including flattened free-form metadata fields.
    pub document: Value,
}

/// One container save loaded back into memory.
#[derive(Debug)]
pub struct LoadedContainer {
    pub info: ContainerInfo,
    pub trials: TrialTable,
    pub data: DataChunk,
}

/// Parse the metadata document of one save.
pub fn read_info(info_path: &Path) -> Result<ContainerInfo, ContainerError> {
    let text = fs::read_to_string(info_path).map_err(|source| ContainerError::Io {
        path: info_path.to_path_buf(),
        source,
    })?;
    let document: Value =
        serde_json::from_str(&text).map_err(|source| ContainerError::ParseInfo {
            path: info_path.to_path_buf(),
            source,
        })?;

    let dtype_name = get_str(&document, "data_dtype")?;
    let data_dtype = Dtype::from_name(&dtype_name).ok_or(ContainerError::BadField {
        field: "data_dtype".to_string(),
    })?;
    Ok(ContainerInfo {
        label: get_str_vec(&document, "label")?,
        segment_label: get_str(&document, "segmentlabel")?,
        log: get_str(&document, "log")?,
        seg_checksum: get_str(&document, "seg_checksum")?,
        dat_checksum: get_str(&document, "dat_checksum")?,
        data_dtype,
        data_shape: get_shape(&document, "data_shape")?,
        document,
    })
}

/// Load one save of a container, given its `.info` path.
///
/// Both companion files are re-hashed and compared against the recorded
/// checksums before anything is decoded; a mismatch signals corruption or a
/// crash mid-save.
pub fn load_spw(info_path: &Path) -> Result<LoadedContainer, ContainerError> {
    let info = read_info(info_path)?;
    let seg_path = sibling(info_path, SEG_EXT);
    let dat_path = sibling(info_path, DAT_EXT);

    verify_checksum(&seg_path, &info.seg_checksum)?;
    verify_checksum(&dat_path, &info.dat_checksum)?;

    let trials = read_seg(&seg_path)?;
    let data = read_dat(&dat_path, info.data_dtype, &info.data_shape)?;
    Ok(LoadedContainer { info, trials, data })
}

fn sibling(info_path: &Path, ext: &str) -> PathBuf {
    info_path.with_extension(ext)
}

fn verify_checksum(path: &Path, expected: &str) -> Result<(), ContainerError> {
    if hash_file(path)? != expected {
        return Err(ContainerError::ChecksumMismatch {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn read_dat(path: &Path, dtype: Dtype, shape: &[usize]) -> Result<DataChunk, ContainerError> {
    let bytes = fs::read(path).map_err(|source| ContainerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let elems: usize = shape.iter().product();
    let expected = (elems * dtype.byte_len()) as u64;
    if bytes.len() as u64 != expected {
        return Err(ContainerError::DataLength {
            path: path.to_path_buf(),
            expected,
            actual: bytes.len() as u64,
        });
    }
    let dims = IxDyn(shape);
    let shape_err = |_| ContainerError::BadField {
        field: "data_shape".to_string(),
    };
    let chunk = match dtype {
        Dtype::Int16 => DataChunk::Int16(
            ArrayD::from_shape_vec(
                dims,
                bytes
                    .chunks_exact(2)
                    .map(|b| i16::from_le_bytes([b[0], b[1]]))
                    .collect(),
            )
            .map_err(shape_err)?,
        ),
        Dtype::Int32 => DataChunk::Int32(
            ArrayD::from_shape_vec(
                dims,
                bytes
                    .chunks_exact(4)
                    .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            )
            .map_err(shape_err)?,
        ),
        Dtype::Int64 => DataChunk::Int64(
            ArrayD::from_shape_vec(dims, read_words8(&bytes).map(i64::from_le_bytes).collect())
                .map_err(shape_err)?,
        ),
        Dtype::Float32 => DataChunk::Float32(
            ArrayD::from_shape_vec(
                dims,
                bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect(),
            )
            .map_err(shape_err)?,
        ),
        Dtype::Float64 => DataChunk::Float64(
            ArrayD::from_shape_vec(dims, read_words8(&bytes).map(f64::from_le_bytes).collect())
                .map_err(shape_err)?,
        ),
        Dtype::Complex64 => DataChunk::Complex64(
            ArrayD::from_shape_vec(
                dims,
                bytes
                    .chunks_exact(8)
                    .map(|b| {
                        Complex32::new(
                            f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                            f32::from_le_bytes([b[4], b[5], b[6], b[7]]),
                        )
                    })
                    .collect(),
            )
            .map_err(shape_err)?,
        ),
        Dtype::Complex128 => DataChunk::Complex128(
            ArrayD::from_shape_vec(
                dims,
                bytes
                    .chunks_exact(16)
                    .map(|b| {
                        let mut re = [0u8; 8];
                        let mut im = [0u8; 8];
                        re.copy_from_slice(&b[..8]);
                        im.copy_from_slice(&b[8..]);
                        Complex64::new(f64::from_le_bytes(re), f64::from_le_bytes(im))
                    })
                    .collect(),
            )
            .map_err(shape_err)?,
        ),
    };
    Ok(chunk)
}

fn read_words8(bytes: &[u8]) -> impl Iterator<Item = [u8; 8]> + '_ {
    bytes.chunks_exact(8).map(|b| {
        let mut word = [0u8; 8];
        word.copy_from_slice(b);
        word
    })
}

fn get_str(doc: &Value, field: &str) -> Result<String, ContainerError> {
    doc.get(field)
        .ok_or_else(|| ContainerError::MissingField {
            field: field.to_string(),
        })?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ContainerError::BadField {
            field: field.to_string(),
        })
}

fn get_str_vec(doc: &Value, field: &str) -> Result<Vec<String>, ContainerError> {
    let items = doc
        .get(field)
        .ok_or_else(|| ContainerError::MissingField {
            field: field.to_string(),
        })?
        .as_array()
        .ok_or_else(|| ContainerError::BadField {
            field: field.to_string(),
        })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ContainerError::BadField {
                    field: field.to_string(),
                })
        })
        .collect()
}

fn get_shape(doc: &Value, field: &str) -> Result<Vec<usize>, ContainerError> {
    let items = doc
        .get(field)
        .ok_or_else(|| ContainerError::MissingField {
            field: field.to_string(),
        })?
        .as_array()
        .ok_or_else(|| ContainerError::BadField {
            field: field.to_string(),
        })?;
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .map(|d| d as usize)
                .ok_or_else(|| ContainerError::BadField {
                    field: field.to_string(),
                })
        })
        .collect()
}
