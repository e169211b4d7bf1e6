//! Single-trial cross-spectral estimation between all channel pairs.

use ndarray::{Array4, ArrayView2};
use rustfft::num_complex::Complex64;

use crate::container::Dtype;

use super::error::SpectralError;
use super::freq_match::best_match;
use super::spectrum::{Padding, freq_axis, mtmfft};
use super::taper::TaperSpec;

/// Which axis of the trial array runs along time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeAxis {
    /// Rows are samples, columns are channels.
    #[default]
    Rows,
    /// Columns are samples, rows are channels.
    Columns,
}

/// Output shape and element type reported by a probe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSpec {
    pub shape: [usize; 4],
    pub dtype: Dtype,
}

/// Two-phase contract between the trial scheduler and an estimator.
///
/// The scheduler probes once with a trial shape to learn the uniform output
/// shape and element type, preallocates storage, then computes once per trial
/// on independent workers. Probing performs no numeric work and never reads
/// sample values, so numerically invalid data cannot fail it.
pub trait TrialKernel {
    type Output;

    fn probe(&self, trial_shape: (usize, usize)) -> Result<ProbeSpec, SpectralError>;

    fn compute(&self, trial: ArrayView2<'_, f64>) -> Result<Self::Output, SpectralError>;
}

/// Configuration for [`CrossSpectraKernel`].
#[derive(Debug, Clone)]
pub struct CrossSpectraConfig {
    /// Sampling rate in Hz.
    pub samplerate: f64,
    /// Frequencies of interest; `None` keeps the full axis.
    pub foi: Option<Vec<f64>>,
    pub padding: Padding,
    pub taper: TaperSpec,
    pub time_axis: TimeAxis,
    /// Coherence-style normalization of the taper-averaged tensor.
    pub normalize: bool,
}

impl CrossSpectraConfig {
    pub fn new(samplerate: f64, taper: TaperSpec) -> Self {
        Self {
            samplerate,
            foi: None,
            padding: Padding::None,
            taper,
            time_axis: TimeAxis::Rows,
            normalize: false,
        }
    }
}

/// Per-trial cross-spectra estimator.
///
/// For one trial: tapered Fourier transforms of every channel, pairwise outer
/// product against the conjugate across the channel axis, uniform average over
/// tapers. The diagonal holds the auto-spectra; the tensor is Hermitian per
/// frequency bin. No averaging over trials happens here; that is the caller's
/// job.
#[derive(Debug, Clone)]
pub struct CrossSpectraKernel {
    cfg: CrossSpectraConfig,
}

impl CrossSpectraKernel {
    pub fn new(cfg: CrossSpectraConfig) -> Result<Self, SpectralError> {
        if !(cfg.samplerate > 0.0) {
            return Err(SpectralError::InvalidSamplerate {
                value: cfg.samplerate,
            });
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &CrossSpectraConfig {
        &self.cfg
    }

    fn oriented(&self, shape: (usize, usize)) -> (usize, usize) {
        match self.cfg.time_axis {
            TimeAxis::Rows => shape,
            TimeAxis::Columns => (shape.1, shape.0),
        }
    }

    /// Frequency bin indices retained in the output, for a padded length.
    fn selected_bins(&self, padded_len: usize) -> Result<Vec<usize>, SpectralError> {
        let axis = freq_axis(padded_len, self.cfg.samplerate);
        match &self.cfg.foi {
            Some(foi) => {
                let (_, indices) = best_match(&axis, foi, true)?;
                Ok(indices)
            }
            None => Ok((0..axis.len()).collect()),
        }
    }
}

impl TrialKernel for CrossSpectraKernel {
    type Output = (Vec<f64>, Array4<Complex64>);

    fn probe(&self, trial_shape: (usize, usize)) -> Result<ProbeSpec, SpectralError> {
        let (samples, channels) = self.oriented(trial_shape);
        if samples == 0 || channels == 0 {
            return Err(SpectralError::EmptyTrial { samples, channels });
        }
        let padded = self.cfg.padding.padded_len(samples);
        let n_freq = self.selected_bins(padded)?.len();
        Ok(ProbeSpec {
            shape: [1, n_freq, channels, channels],
            dtype: Dtype::Complex128,
        })
    }

    fn compute(&self, trial: ArrayView2<'_, f64>) -> Result<Self::Output, SpectralError> {
        let dat = match self.cfg.time_axis {
            TimeAxis::Rows => trial,
            TimeAxis::Columns => trial.reversed_axes(),
        };
        let padded = self.cfg.padding.apply(dat);
        let (samples, channels) = padded.dim();

        let tapers = self.cfg.taper.build(samples)?;
        let (specs, axis) = mtmfft(padded.view(), self.cfg.samplerate, &tapers)?;
        let bins = self.selected_bins(samples)?;
        let n_tapers = tapers.dim().0;

        let mut tensor = Array4::zeros((1, bins.len(), channels, channels));
        let scale = 1.0 / n_tapers as f64;
        for (out_f, &f) in bins.iter().enumerate() {
            for i in 0..channels {
                for j in 0..channels {
                    let mut acc = Complex64::new(0.0, 0.0);
                    for k in 0..n_tapers {
                        acc += specs[[k, f, i]] * specs[[k, f, j]].conj();
                    }
                    tensor[[0, out_f, i, j]] = acc * scale;
                }
            }
        }
        if self.cfg.normalize {
            normalize_coherence(&mut tensor);
        }

        let freqs = bins.iter().map(|&f| axis[f]).collect();
        Ok((freqs, tensor))
    }
}

/// Divide each cross term by the geometric mean of the two auto-spectra.
///
/// Operates on the taper-averaged tensor, so Hermitian symmetry and the
/// non-negative real diagonal survive; the diagonal becomes one wherever the
/// auto-spectral power is nonzero.
fn normalize_coherence(tensor: &mut Array4<Complex64>) {
    let (_, n_freq, channels, _) = tensor.dim();
    for f in 0..n_freq {
        let diag: Vec<f64> = (0..channels).map(|i| tensor[[0, f, i, i]].re).collect();
        for i in 0..channels {
            for j in 0..channels {
                let denom = (diag[i] * diag[j]).sqrt();
                tensor[[0, f, i, j]] = if denom > 0.0 {
                    tensor[[0, f, i, j]] / denom
                } else {
                    Complex64::new(0.0, 0.0)
                };
            }
        }
    }
}
