//! End-to-end estimator scenarios on synthetic signals.

use std::f64::consts::PI;

use crosspec::analysis::{
    CrossSpectraConfig, CrossSpectraKernel, DpssParams, TaperSpec, TrialKernel,
};
use crosspec::container::Dtype;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn white_noise(samples: usize, channels: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dat = Array2::zeros((samples, channels));
    for t in 0..samples {
        for c in 0..channels {
            // Sum of uniforms, zero-mean; Gaussianity is irrelevant here.
            dat[[t, c]] = rng.random::<f64>() + rng.random::<f64>() - 1.0;
        }
    }
    dat
}

/// Two 30/80 Hz cosines per channel with per-channel phase offsets, plus noise.
fn harmonic_mixture(samples: usize, fs: f64, phases: &[f64], seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dat = Array2::zeros((samples, phases.len()));
    for (c, &phase) in phases.iter().enumerate() {
        for t in 0..samples {
            let time = t as f64 / fs;
            let tone = (2.0 * PI * 30.0 * time + phase).cos()
                + (2.0 * PI * 80.0 * time + phase).cos();
            dat[[t, c]] = tone + rng.random::<f64>() + rng.random::<f64>() - 1.0;
        }
    }
    dat
}

#[test]
fn white_noise_bartlett_estimate_is_hermitian_with_real_diagonal() {
    init_tracing();
    let samples = 10_000;
    let fs = 1000.0;
    let trial = white_noise(samples, 2, 11);
    let kernel =
        CrossSpectraKernel::new(CrossSpectraConfig::new(fs, TaperSpec::Bartlett)).unwrap();

    let probe = kernel.probe(trial.dim()).unwrap();
    assert_eq!(probe.shape, [1, 5001, 2, 2]);

    let (freqs, tensor) = kernel.compute(trial.view()).unwrap();
    assert_eq!(freqs.len(), 5001);
    assert_eq!(tensor.dim(), (1, 5001, 2, 2));
    for f in 0..5001 {
        for i in 0..2 {
            let auto = tensor[[0, f, i, i]];
            assert!(auto.im.abs() < 1e-9, "bin {f} channel {i}: im = {}", auto.im);
            assert!(auto.re >= -1e-9, "bin {f} channel {i}: re = {}", auto.re);
        }
        let delta = tensor[[0, f, 0, 1]] - tensor[[0, f, 1, 0]].conj();
        assert!(delta.norm() < 1e-9, "bin {f}: conjugate mismatch");
    }
}

#[test]
fn multitaper_auto_spectra_peak_at_the_harmonic_bins() {
    init_tracing();
    let samples = 10_000;
    let fs = 1000.0;
    let phases = [0.0, PI / 2.0, PI];
    let trial = harmonic_mixture(samples, fs, &phases, 23);
    let kernel = CrossSpectraKernel::new(CrossSpectraConfig::new(
        fs,
        TaperSpec::Dpss(DpssParams { nw: 4.0, kmax: 12 }),
    ))
    .unwrap();

    let (freqs, tensor) = kernel.compute(trial.view()).unwrap();
    let bin = |target: f64| {
        freqs
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - target).abs().total_cmp(&(b.1 - target).abs()))
            .map(|(i, _)| i)
            .unwrap()
    };
    let bin30 = bin(30.0);
    let bin80 = bin(80.0);

    for c in 0..3 {
        let power = |f: usize| tensor[[0, f, c, c]].norm();
        // Quiet band well away from both tones and DC.
        let quiet: f64 =
            (2000..3000).map(power).sum::<f64>() / 1000.0;
        assert!(
            power(bin30) > 10.0 * quiet,
            "channel {c}: 30 Hz bin not prominent ({} vs {quiet})",
            power(bin30)
        );
        assert!(
            power(bin80) > 10.0 * quiet,
            "channel {c}: 80 Hz bin not prominent ({} vs {quiet})",
            power(bin80)
        );
        // The tones dominate their neighborhoods.
        for offset in [-50i64, 50] {
            let away30 = (bin30 as i64 + offset) as usize;
            let away80 = (bin80 as i64 + offset) as usize;
            assert!(power(bin30) > power(away30));
            assert!(power(bin80) > power(away80));
        }
    }
}

#[test]
fn probe_succeeds_on_nan_filled_data() {
    let trial = Array2::from_elem((10_000, 5), f64::NAN);
    let kernel =
        CrossSpectraKernel::new(CrossSpectraConfig::new(1000.0, TaperSpec::Hann)).unwrap();
    // Probe consumes only the shape; invalid sample values cannot reach it.
    let spec = kernel.probe(trial.dim()).unwrap();
    assert_eq!(spec.shape, [1, 5001, 5, 5]);
    assert_eq!(spec.dtype, Dtype::Complex128);
}

#[test]
fn probe_matches_compute_across_configurations() {
    let fs = 512.0;
    let trial = white_noise(1024, 3, 5);
    let configs = [
        CrossSpectraConfig::new(fs, TaperSpec::Hann),
        {
            let mut cfg = CrossSpectraConfig::new(fs, TaperSpec::Bartlett);
            cfg.foi = Some(vec![10.0, 20.0, 20.1, 100.0]);
            cfg
        },
        {
            let mut cfg = CrossSpectraConfig::new(
                fs,
                TaperSpec::Dpss(DpssParams { nw: 3.0, kmax: 5 }),
            );
            cfg.padding = crosspec::analysis::Padding::NextPow2;
            cfg
        },
    ];
    for cfg in configs {
        let kernel = CrossSpectraKernel::new(cfg).unwrap();
        let probe = kernel.probe(trial.dim()).unwrap();
        let (freqs, tensor) = kernel.compute(trial.view()).unwrap();
        let (reps, n_freq, rows, cols) = tensor.dim();
        assert_eq!(probe.shape, [reps, n_freq, rows, cols]);
        assert_eq!(freqs.len(), n_freq);
        assert!(freqs.windows(2).all(|w| w[1] > w[0]));
    }
}
