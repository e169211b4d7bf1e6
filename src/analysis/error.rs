use thiserror::Error;

/// Errors raised by spectral estimation components.
#[derive(Debug, Error)]
pub enum SpectralError {
    /// Taper identifier is not one of the supported window families.
    #[error("Unknown taper '{name}'")]
    UnknownTaper { name: String },
    /// Taper options are inconsistent with the requested window family.
    #[error("Invalid taper options: {detail}")]
    InvalidTaperOptions { detail: String },
    /// Taper length does not match the (padded) trial length.
    #[error("Taper length {taper_len} does not match signal length {samples}")]
    ShapeMismatch { taper_len: usize, samples: usize },
    /// Trial carries no samples or no channels.
    #[error("Trial is empty ({samples} samples, {channels} channels)")]
    EmptyTrial { samples: usize, channels: usize },
    #[error("Samplerate must be positive, got {value}")]
    InvalidSamplerate { value: f64 },
    /// Every requested frequency lies outside the available axis.
    #[error("Requested frequencies all outside available range [{lo}, {hi}] Hz")]
    FrequenciesOutOfRange { lo: f64, hi: f64 },
}
