//! Tapered Fourier transforms of multi-channel trials.

use ndarray::{Array2, Array3, ArrayView2};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;

use super::error::SpectralError;

/// Zero-padding applied to the time axis before the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// Transform the trial at its native length.
    #[default]
    None,
    /// Pad up to the next power of two.
    NextPow2,
    /// Pad up to an absolute sample count (no-op when shorter than the trial).
    ToLength(usize),
}

impl Padding {
    /// Effective transform length for a trial of `samples` samples.
    pub fn padded_len(&self, samples: usize) -> usize {
        match *self {
            Padding::None => samples,
            Padding::NextPow2 => samples.next_power_of_two(),
            Padding::ToLength(target) => target.max(samples),
        }
    }

    /// Copy `dat` into a zero-padded array of the effective length.
    pub(crate) fn apply(&self, dat: ArrayView2<'_, f64>) -> Array2<f64> {
        let (samples, channels) = dat.dim();
        let padded = self.padded_len(samples);
        let mut out = Array2::zeros((padded, channels));
        for t in 0..samples {
            for c in 0..channels {
                out[[t, c]] = dat[[t, c]];
            }
        }
        out
    }
}

/// One-sided frequency axis for an `n`-sample transform: `k * fs / n`.
pub fn freq_axis(n: usize, samplerate: f64) -> Vec<f64> {
    let bins = n / 2 + 1;
    (0..bins).map(|k| k as f64 * samplerate / n as f64).collect()
}

/// (Multi-)tapered FFT of a `(samples, channels)` trial.
///
/// Returns per-taper, per-frequency, per-channel Fourier coefficients of
/// shape `(K, samples/2 + 1, channels)` together with the frequency axis.
/// Only non-negative frequencies are retained (real-input symmetry).
pub fn mtmfft(
    dat: ArrayView2<'_, f64>,
    samplerate: f64,
    tapers: &Array2<f64>,
) -> Result<(Array3<Complex64>, Vec<f64>), SpectralError> {
    let (samples, channels) = dat.dim();
    if samples == 0 || channels == 0 {
        return Err(SpectralError::EmptyTrial { samples, channels });
    }
    if !(samplerate > 0.0) {
        return Err(SpectralError::InvalidSamplerate { value: samplerate });
    }
    let (n_tapers, taper_len) = tapers.dim();
    if taper_len != samples {
        return Err(SpectralError::ShapeMismatch { taper_len, samples });
    }

    let bins = samples / 2 + 1;
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(samples);
    let mut buf = vec![Complex64::new(0.0, 0.0); samples];
    let mut specs = Array3::zeros((n_tapers, bins, channels));
    for k in 0..n_tapers {
        for c in 0..channels {
            for t in 0..samples {
                buf[t] = Complex64::new(dat[[t, c]] * tapers[[k, t]], 0.0);
            }
            fft.process(&mut buf);
            for (f, value) in buf.iter().take(bins).enumerate() {
                specs[[k, f, c]] = *value;
            }
        }
    }
    Ok((specs, freq_axis(samples, samplerate)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TaperSpec;
    use ndarray::Array2;
    use std::f64::consts::PI;

    #[test]
    fn padding_lengths() {
        assert_eq!(Padding::None.padded_len(1000), 1000);
        assert_eq!(Padding::NextPow2.padded_len(1000), 1024);
        assert_eq!(Padding::ToLength(1200).padded_len(1000), 1200);
        assert_eq!(Padding::ToLength(10).padded_len(1000), 1000);
    }

    #[test]
    fn freq_axis_is_increasing_from_zero() {
        let freqs = freq_axis(10_000, 1000.0);
        assert_eq!(freqs.len(), 5001);
        assert_eq!(freqs[0], 0.0);
        assert!((freqs[5000] - 500.0).abs() < 1e-9);
        assert!(freqs.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn pure_tone_lands_in_its_bin() {
        let n = 1000;
        let fs = 1000.0;
        let mut dat = Array2::zeros((n, 1));
        for t in 0..n {
            dat[[t, 0]] = (2.0 * PI * 50.0 * t as f64 / fs).cos();
        }
        let tapers = TaperSpec::None.build(n).unwrap();
        let (specs, freqs) = mtmfft(dat.view(), fs, &tapers).unwrap();
        let powers: Vec<f64> = (0..freqs.len()).map(|f| specs[[0, f, 0]].norm_sqr()).collect();
        let peak = powers
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 50);
    }

    #[test]
    fn taper_length_mismatch_is_a_shape_error() {
        let dat = Array2::zeros((100, 2));
        let tapers = TaperSpec::Hann.build(64).unwrap();
        let err = mtmfft(dat.view(), 1000.0, &tapers).unwrap_err();
        assert!(matches!(err, SpectralError::ShapeMismatch { .. }));
    }

    #[test]
    fn spectra_report_one_bin_per_nonnegative_frequency() {
        let dat = Array2::from_elem((64, 3), 1.0);
        let tapers = TaperSpec::Hann.build(64).unwrap();
        let (specs, freqs) = mtmfft(dat.view(), 256.0, &tapers).unwrap();
        assert_eq!(specs.dim(), (1, 33, 3));
        assert_eq!(freqs.len(), 33);
    }
}
