//! Multi-taper cross-spectral estimation and `.spw` container persistence.
/// Spectral estimation: tapers, windowed FFT, frequency matching, cross-spectra.
pub mod analysis;
/// On-disk `.spw` container format: writer, reader, metadata flattening.
pub mod container;
