//! Single-trial spectral estimation (tapering, FFT, cross-spectra).

mod cross_spectra;
mod dpss;
mod error;
mod freq_match;
mod spectrum;
mod taper;

pub use cross_spectra::{
    CrossSpectraConfig, CrossSpectraKernel, ProbeSpec, TimeAxis, TrialKernel,
};
pub use error::SpectralError;
pub use freq_match::best_match;
pub use spectrum::{Padding, freq_axis, mtmfft};
pub use taper::{DpssParams, TaperSpec};
