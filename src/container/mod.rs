//! The `.spw` container: a directory of companion files (`.seg`, `.dat`,
//! `.info`) persisting one analysis result with checksum verification.

mod checksum;
mod dtype;
mod error;
mod metadata;
mod reader;
mod result;
mod seg;
mod writer;

pub use checksum::hash_file;
pub use dtype::{DataChunk, Dtype, widest_dtype};
pub use error::ContainerError;
pub use metadata::{MetaMap, MetaValue, flatten, new_meta_map};
pub use reader::{ContainerInfo, LoadedContainer, load_spw, read_info};
pub use result::{SpectralResult, TrialTable};
pub use writer::{SavedContainer, save_spw};

/// Extension of the container directory itself.
pub const CONTAINER_EXT: &str = "spw";
pub(crate) const SEG_EXT: &str = "seg";
pub(crate) const DAT_EXT: &str = "dat";
pub(crate) const INFO_EXT: &str = "info";
