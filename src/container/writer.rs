//! Writing a result object to an on-disk `.spw` container.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::Rng;
use serde_json::{Map, Value};

use super::checksum::hash_file;
use super::dtype::{DataChunk, Dtype, widest_dtype};
use super::error::ContainerError;
use super::metadata::flatten;
use super::result::SpectralResult;
use super::seg::write_seg;
use super::{CONTAINER_EXT, DAT_EXT, INFO_EXT, SEG_EXT};

/// Paths produced by one save operation.
#[derive(Debug, Clone)]
pub struct SavedContainer {
    pub dir: PathBuf,
    /// Random 4-hex-character disambiguation suffix shared by the three files.
    pub suffix: String,
    pub seg_path: PathBuf,
    pub dat_path: PathBuf,
    pub info_path: PathBuf,
}

/// Persist `out` under `target` as a `.spw` container.
///
/// `target` names the container directory; a `.spw` extension is appended when
/// missing and the directory is created if absent. The three companion files
/// are named `<base>.<suffix>.{seg,dat,info}` with `base` defaulting to the
/// directory stem and `suffix` freshly random per save, so repeated saves
/// under one base name never collide. Pre-existing files are never touched.
pub fn save_spw(
    target: &Path,
    out: &mut SpectralResult,
    basename: Option<&str>,
) -> Result<SavedContainer, ContainerError> {
    let dir = normalize_target(target)?;
    ensure_directory(&dir)?;
    let base = resolve_basename(&dir, basename)?;

    let suffix: u16 = rand::rng().random();
    let suffix = format!("{suffix:04x}");
    let file_for = |ext: &str| dir.join(format!("{base}.{suffix}.{ext}"));
    let seg_path = file_for(SEG_EXT);
    let dat_path = file_for(DAT_EXT);
    let info_path = file_for(INFO_EXT);

    write_seg(&seg_path, out.trials())?;

    let dtype = widest_dtype(out.chunks()).ok_or(ContainerError::EmptyChunks)?;
    let total_elems: usize = out.full_shape().iter().product();
    write_dat(&dat_path, out.chunks(), dtype, total_elems)?;

    let seg_checksum = hash_file(&seg_path)?;
    let dat_checksum = hash_file(&dat_path)?;

    // Logged before the info file goes out so the entry is part of it.
    out.append_log(&format!("Wrote files {base}.{suffix}.[dat/info/seg]"));

    let mut doc = match flatten(out.metadata()) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    doc.insert("label".to_string(), Value::from(out.label().to_vec()));
    doc.insert(
        "segmentlabel".to_string(),
        Value::String(out.segment_label().to_string()),
    );
    doc.insert("log".to_string(), Value::String(out.log().to_string()));
    doc.insert("seg_checksum".to_string(), Value::String(seg_checksum));
    doc.insert("dat_checksum".to_string(), Value::String(dat_checksum));
    doc.insert(
        "data_dtype".to_string(),
        Value::String(dtype.name().to_string()),
    );
    doc.insert(
        "data_shape".to_string(),
        Value::from(
            out.full_shape()
                .into_iter()
                .map(|d| d as u64)
                .collect::<Vec<u64>>(),
        ),
    );
    write_info(&info_path, &Value::Object(doc))?;

    tracing::info!(
        container = %dir.display(),
        base,
        suffix,
        "wrote .spw container"
    );
    Ok(SavedContainer {
        dir,
        suffix,
        seg_path,
        dat_path,
        info_path,
    })
}

fn normalize_target(target: &Path) -> Result<PathBuf, ContainerError> {
    if target.file_name().is_none() {
        return Err(ContainerError::InvalidTarget {
            path: target.to_path_buf(),
        });
    }
    if target.extension().and_then(|e| e.to_str()) == Some(CONTAINER_EXT) {
        Ok(target.to_path_buf())
    } else {
        let mut name = target.as_os_str().to_os_string();
        name.push(".");
        name.push(CONTAINER_EXT);
        Ok(PathBuf::from(name))
    }
}

fn ensure_directory(dir: &Path) -> Result<(), ContainerError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ContainerError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| ContainerError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn resolve_basename(dir: &Path, basename: Option<&str>) -> Result<String, ContainerError> {
    let name = match basename {
        Some(name) => {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(ContainerError::InvalidBasename {
                    name: name.to_string(),
                });
            }
            // A trailing container extension on an explicit name is dropped.
            name.strip_suffix(&format!(".{CONTAINER_EXT}"))
                .unwrap_or(name)
                .to_string()
        }
        None => dir
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| ContainerError::InvalidTarget {
                path: dir.to_path_buf(),
            })?,
    };
    Ok(name)
}

/// Allocate the full file up front, then stream every chunk widened to the
/// output dtype; explicit flush and sync so the bytes are on disk when the
/// checksum is taken.
fn write_dat(
    path: &Path,
    chunks: &[DataChunk],
    dtype: Dtype,
    total_elems: usize,
) -> Result<(), ContainerError> {
    let io_err = |source| ContainerError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    file.set_len(total_elems as u64 * dtype.byte_len() as u64)
        .map_err(io_err)?;
    let mut out = BufWriter::new(file);
    for chunk in chunks {
        chunk.write_widened(dtype, &mut out).map_err(io_err)?;
    }
    out.flush().map_err(io_err)?;
    let file = out.into_inner().map_err(|err| io_err(err.into_error()))?;
    file.sync_all().map_err(io_err)?;
    Ok(())
}

fn write_info(path: &Path, doc: &Value) -> Result<(), ContainerError> {
    let text = serde_json::to_string_pretty(doc).map_err(|source| ContainerError::EncodeInfo {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| ContainerError::Io {
        path: path.to_path_buf(),
        source,
    })
}
