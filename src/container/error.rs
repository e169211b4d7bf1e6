use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while writing or reading `.spw` containers.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Save target exists but is not a directory.
    #[error("Container target {path} exists and is not a directory")]
    NotADirectory { path: PathBuf },
    /// Save target path carries no usable name component.
    #[error("Container target {path} has no base name")]
    InvalidTarget { path: PathBuf },
    #[error("Invalid container base name '{name}'")]
    InvalidBasename { name: String },
    #[error("Failed to create container directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Container I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode metadata document for {path}: {source}")]
    EncodeInfo {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to parse metadata document {path}: {source}")]
    ParseInfo {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Result carries no data chunks to persist.
    #[error("Result has no data chunks")]
    EmptyChunks,
    /// Chunk shapes disagree beyond the stacking axis.
    #[error("Chunk shape {got:?} does not stack onto {expected:?}")]
    ChunkShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("Segment file {path} is malformed: {detail}")]
    SegFormat { path: PathBuf, detail: String },
    /// Recorded checksum does not match the file on disk.
    #[error("Checksum mismatch for {path}")]
    ChecksumMismatch { path: PathBuf },
    #[error("Metadata document is missing field '{field}'")]
    MissingField { field: String },
    #[error("Metadata document field '{field}' is malformed")]
    BadField { field: String },
    #[error("Data file {path} holds {actual} bytes, expected {expected}")]
    DataLength {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}
