//! Discrete prolate spheroidal (Slepian) sequences.
//!
//! Uses the symmetric tridiagonal formulation: the DPSS of length `N` and
//! half-bandwidth `W` are the eigenvectors of a tridiagonal matrix with
//! diagonal `((N-1-2i)/2)^2 cos(2πW)` and off-diagonal `i(N-i)/2`. The top
//! `Kmax` eigenvalues are located by Sturm-sequence bisection and the
//! eigenvectors recovered by inverse iteration.

use std::f64::consts::PI;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::SpectralError;

const INVERSE_ITERATIONS: usize = 4;

pub(crate) fn dpss_windows(
    len: usize,
    nw: f64,
    kmax: usize,
) -> Result<Array2<f64>, SpectralError> {
    let half_bandwidth = nw / len as f64;
    let cos_w = (2.0 * PI * half_bandwidth).cos();
    let diag: Vec<f64> = (0..len)
        .map(|i| {
            let t = (len - 1) as f64 / 2.0 - i as f64;
            t * t * cos_w
        })
        .collect();
    let off: Vec<f64> = (1..len)
        .map(|k| k as f64 * (len - k) as f64 / 2.0)
        .collect();

    let (lo, hi) = gershgorin_bounds(&diag, &off);
    let anorm = lo.abs().max(hi.abs()).max(1.0);
    let pivmin = f64::EPSILON * anorm * 1e-3;

    let mut found: Vec<Vec<f64>> = Vec::with_capacity(kmax);
    for k in 0..kmax {
        // Eigenvalues ascend; taper k belongs to the (k+1)-th largest.
        let eig_index = len - 1 - k;
        let lambda = bisect_eigenvalue(&diag, &off, eig_index, lo, hi, pivmin);
        let vector = inverse_iteration(&diag, &off, lambda, &found, k as u64, pivmin);
        found.push(vector);
    }

    let mut tapers = Array2::zeros((kmax, len));
    for (k, mut vector) in found.into_iter().enumerate() {
        fix_polarity(k, &mut vector);
        for (i, value) in vector.into_iter().enumerate() {
            tapers[[k, i]] = value;
        }
    }
    Ok(tapers)
}

fn gershgorin_bounds(diag: &[f64], off: &[f64]) -> (f64, f64) {
    let n = diag.len();
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for i in 0..n {
        let left = if i > 0 { off[i - 1].abs() } else { 0.0 };
        let right = if i < n - 1 { off[i].abs() } else { 0.0 };
        lo = lo.min(diag[i] - left - right);
        hi = hi.max(diag[i] + left + right);
    }
    (lo, hi)
}

/// Number of eigenvalues strictly below `x` (Sturm sequence).
fn count_below(diag: &[f64], off: &[f64], x: f64, pivmin: f64) -> usize {
    let mut count = 0;
    let mut q = 1.0_f64;
    for i in 0..diag.len() {
        q = if i == 0 {
            diag[0] - x
        } else {
            diag[i] - x - off[i - 1] * off[i - 1] / q
        };
        if q.abs() < pivmin {
            q = -pivmin;
        }
        if q < 0.0 {
            count += 1;
        }
    }
    count
}

/// Bisection for the eigenvalue of ascending index `j`.
fn bisect_eigenvalue(
    diag: &[f64],
    off: &[f64],
    j: usize,
    mut lo: f64,
    mut hi: f64,
    pivmin: f64,
) -> f64 {
    for _ in 0..160 {
        let mid = 0.5 * (lo + hi);
        if count_below(diag, off, mid, pivmin) >= j + 1 {
            hi = mid;
        } else {
            lo = mid;
        }
        if hi - lo <= 2.0 * f64::EPSILON * (lo.abs().max(hi.abs()) + 1.0) {
            break;
        }
    }
    0.5 * (lo + hi)
}

fn inverse_iteration(
    diag: &[f64],
    off: &[f64],
    lambda: f64,
    previous: &[Vec<f64>],
    seed: u64,
    pivmin: f64,
) -> Vec<f64> {
    let n = diag.len();
    let mut rng = StdRng::seed_from_u64(0x5EED_D155 ^ seed);
    let mut v: Vec<f64> = (0..n).map(|_| rng.random::<f64>() - 0.5).collect();
    normalize(&mut v);
    for _ in 0..INVERSE_ITERATIONS {
        solve_shifted(diag, off, lambda, &mut v, pivmin);
        // Tridiagonal eigenvalues are simple, but neighbors can be close for
        // the weakly concentrated trailing tapers; project out everything
        // already found to keep the family orthogonal.
        for u in previous {
            let proj: f64 = v.iter().zip(u).map(|(a, b)| a * b).sum();
            for (a, b) in v.iter_mut().zip(u) {
                *a -= proj * b;
            }
        }
        if !normalize(&mut v) {
            for value in v.iter_mut() {
                *value = rng.random::<f64>() - 0.5;
            }
            normalize(&mut v);
        }
    }
    v
}

/// Scale to unit L2 norm; false if the vector collapsed to (near) zero.
fn normalize(v: &mut [f64]) -> bool {
    let peak = v.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()));
    if !(peak > 0.0) || !peak.is_finite() {
        return false;
    }
    for value in v.iter_mut() {
        *value /= peak;
    }
    let norm = v.iter().map(|&x| x * x).sum::<f64>().sqrt();
    if !(norm > 0.0) {
        return false;
    }
    for value in v.iter_mut() {
        *value /= norm;
    }
    true
}

/// Solve `(T - lambda*I) x = b` in place, Gaussian elimination with partial
/// pivoting on the tridiagonal band (one superdiagonal of fill).
fn solve_shifted(diag: &[f64], off: &[f64], lambda: f64, b: &mut [f64], pivmin: f64) {
    let n = diag.len();
    let mut d: Vec<f64> = diag.iter().map(|&x| x - lambda).collect();
    let mut du: Vec<f64> = off.to_vec();
    let dl: Vec<f64> = off.to_vec();
    let mut du2 = vec![0.0_f64; n.saturating_sub(2)];

    for i in 0..n.saturating_sub(1) {
        if d[i].abs() >= dl[i].abs() {
            if d[i].abs() < pivmin {
                d[i] = pivmin.copysign(if d[i] == 0.0 { 1.0 } else { d[i] });
            }
            let fact = dl[i] / d[i];
            d[i + 1] -= fact * du[i];
            b[i + 1] -= fact * b[i];
            if i < n - 2 {
                du2[i] = 0.0;
            }
        } else {
            let fact = d[i] / dl[i];
            d[i] = dl[i];
            let temp = d[i + 1];
            d[i + 1] = du[i] - fact * temp;
            if i < n - 2 {
                du2[i] = du[i + 1];
                du[i + 1] = -fact * du2[i];
            }
            du[i] = temp;
            let tb = b[i];
            b[i] = b[i + 1];
            b[i + 1] = tb - fact * b[i];
        }
    }
    if d[n - 1].abs() < pivmin {
        d[n - 1] = pivmin.copysign(if d[n - 1] == 0.0 { 1.0 } else { d[n - 1] });
    }

    b[n - 1] /= d[n - 1];
    if n > 1 {
        b[n - 2] = (b[n - 2] - du[n - 2] * b[n - 1]) / d[n - 2];
    }
    for i in (0..n.saturating_sub(2)).rev() {
        b[i] = (b[i] - du[i] * b[i + 1] - du2[i] * b[i + 2]) / d[i];
    }
}

/// Sign convention: symmetric (even-index) tapers have non-negative sum,
/// antisymmetric ones start with a positive significant lobe.
fn fix_polarity(k: usize, v: &mut [f64]) {
    let flip = if k % 2 == 0 {
        v.iter().sum::<f64>() < 0.0
    } else {
        let thresh = 1e-7_f64.max(1.0 / v.len() as f64);
        match v.iter().find(|&&x| x * x > thresh) {
            Some(&first) => first < 0.0,
            None => v.get(1).copied().unwrap_or(0.0) < 0.0,
        }
    };
    if flip {
        for value in v.iter_mut() {
            *value = -*value;
        }
    }
}
