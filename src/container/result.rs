//! The result object persisted to a container.

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::Array2;

use super::dtype::DataChunk;
use super::error::ContainerError;
use super::metadata::{MetaMap, new_meta_map};

/// Per-trial boundary and annotation records.
///
/// Each row describes one trial: start sample, stop sample, and trigger
/// offset, followed by any extra annotation columns the recording carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialTable {
    rows: Array2<i64>,
}

impl TrialTable {
    pub fn new(rows: Array2<i64>) -> Self {
        Self { rows }
    }

    /// Table of plain `[start, stop, offset]` rows.
    pub fn from_bounds(bounds: &[(i64, i64, i64)]) -> Self {
        let mut rows = Array2::zeros((bounds.len(), 3));
        for (t, &(start, stop, offset)) in bounds.iter().enumerate() {
            rows[[t, 0]] = start;
            rows[[t, 1]] = stop;
            rows[[t, 2]] = offset;
        }
        Self { rows }
    }

    pub fn n_trials(&self) -> usize {
        self.rows.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.rows.ncols()
    }

    pub fn rows(&self) -> &Array2<i64> {
        &self.rows
    }
}

/// An analysis result ready for persistence: the aggregated numeric payload
/// (chunked along the leading axis), trial boundaries, channel labels, and
/// free-form metadata with an append-only operation log.
#[derive(Debug)]
pub struct SpectralResult {
    chunks: Vec<DataChunk>,
    trials: TrialTable,
    metadata: Rc<RefCell<MetaMap>>,
    label: Vec<String>,
    segment_label: String,
    log: String,
}

impl SpectralResult {
    /// Assemble a result; chunks must stack along the leading axis.
    pub fn new(
        chunks: Vec<DataChunk>,
        trials: TrialTable,
        label: Vec<String>,
        segment_label: impl Into<String>,
    ) -> Result<Self, ContainerError> {
        let first = chunks.first().ok_or(ContainerError::EmptyChunks)?;
        if first.shape().is_empty() {
            return Err(ContainerError::ChunkShapeMismatch {
                expected: vec![0],
                got: Vec::new(),
            });
        }
        let trailing = first.shape()[1..].to_vec();
        for chunk in &chunks[1..] {
            if chunk.shape().len() != trailing.len() + 1 || chunk.shape()[1..] != trailing[..] {
                return Err(ContainerError::ChunkShapeMismatch {
                    expected: first.shape().to_vec(),
                    got: chunk.shape().to_vec(),
                });
            }
        }
        Ok(Self {
            chunks,
            trials,
            metadata: new_meta_map(),
            label,
            segment_label: segment_label.into(),
            log: String::new(),
        })
    }

    pub fn chunks(&self) -> &[DataChunk] {
        &self.chunks
    }

    pub fn trials(&self) -> &TrialTable {
        &self.trials
    }

    /// Shared handle to the free-form metadata map.
    pub fn metadata(&self) -> &Rc<RefCell<MetaMap>> {
        &self.metadata
    }

    pub fn label(&self) -> &[String] {
        &self.label
    }

    /// Structural tag describing the trial table's row semantics.
    pub fn segment_label(&self) -> &str {
        &self.segment_label
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    /// Append one line to the operation log.
    pub fn append_log(&mut self, entry: &str) {
        if !self.log.is_empty() {
            self.log.push('\n');
        }
        self.log.push_str(entry);
    }

    /// Shape of the concatenated payload across all chunks.
    pub fn full_shape(&self) -> Vec<usize> {
        let leading: usize = self.chunks.iter().map(|c| c.shape()[0]).sum();
        let mut shape = self.chunks[0].shape().to_vec();
        shape[0] = leading;
        shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Dtype;
    use crate::container::dtype::widest_dtype;
    use ndarray::{ArrayD, IxDyn};

    fn chunk(rows: usize) -> DataChunk {
        DataChunk::Float64(ArrayD::zeros(IxDyn(&[rows, 4])))
    }

    #[test]
    fn empty_chunk_list_is_rejected() {
        let err = SpectralResult::new(
            Vec::new(),
            TrialTable::from_bounds(&[]),
            Vec::new(),
            "trial",
        )
        .unwrap_err();
        assert!(matches!(err, ContainerError::EmptyChunks));
    }

    #[test]
    fn mismatched_trailing_dims_are_rejected() {
        let bad = DataChunk::Float64(ArrayD::zeros(IxDyn(&[2, 5])));
        let err = SpectralResult::new(
            vec![chunk(2), bad],
            TrialTable::from_bounds(&[(0, 2, 0), (2, 4, 0)]),
            Vec::new(),
            "trial",
        )
        .unwrap_err();
        assert!(matches!(err, ContainerError::ChunkShapeMismatch { .. }));
    }

    #[test]
    fn full_shape_sums_the_leading_axis() {
        let result = SpectralResult::new(
            vec![chunk(2), chunk(3)],
            TrialTable::from_bounds(&[(0, 2, 0), (2, 5, 0)]),
            Vec::new(),
            "trial",
        )
        .unwrap();
        assert_eq!(result.full_shape(), vec![5, 4]);
        assert_eq!(widest_dtype(result.chunks()), Some(Dtype::Float64));
    }

    #[test]
    fn log_entries_accumulate_line_by_line() {
        let mut result = SpectralResult::new(
            vec![chunk(1)],
            TrialTable::from_bounds(&[(0, 1, 0)]),
            Vec::new(),
            "trial",
        )
        .unwrap();
        result.append_log("computed cross spectra");
        result.append_log("wrote container");
        assert_eq!(result.log(), "computed cross spectra\nwrote container");
    }
}
