//! Taper (window) construction for single- and multi-taper spectral analysis.

use std::f64::consts::PI;

use ndarray::Array2;

use super::dpss::dpss_windows;
use super::error::SpectralError;

/// Parameters for the discrete prolate spheroidal (Slepian) taper family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DpssParams {
    /// Time-bandwidth product `NW`.
    pub nw: f64,
    /// Number of tapers to return.
    pub kmax: usize,
}

/// Which window family to apply before the Fourier transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaperSpec {
    /// No tapering; a single all-ones window.
    None,
    Hann,
    Bartlett,
    /// Multi-taper family of `kmax` orthogonal Slepian windows.
    Dpss(DpssParams),
}

impl TaperSpec {
    /// Resolve a textual taper identifier.
    ///
    /// `dpss` requires explicit parameters; for the single-taper families any
    /// supplied parameters are ignored.
    pub fn from_name(name: &str, dpss: Option<DpssParams>) -> Result<Self, SpectralError> {
        match name.to_ascii_lowercase().as_str() {
            "boxcar" | "none" => Ok(TaperSpec::None),
            "hann" => Ok(TaperSpec::Hann),
            "bartlett" => Ok(TaperSpec::Bartlett),
            "dpss" => {
                let params = dpss.ok_or_else(|| SpectralError::InvalidTaperOptions {
                    detail: "dpss requires NW and Kmax".to_string(),
                })?;
                Ok(TaperSpec::Dpss(params))
            }
            other => Err(SpectralError::UnknownTaper {
                name: other.to_string(),
            }),
        }
    }

    /// Number of tapers this spec produces.
    pub fn taper_count(&self) -> usize {
        match self {
            TaperSpec::Dpss(params) => params.kmax,
            _ => 1,
        }
    }

    /// Build the `(K, len)` taper matrix for a signal of `len` samples.
    pub fn build(&self, len: usize) -> Result<Array2<f64>, SpectralError> {
        if len == 0 {
            return Err(SpectralError::EmptyTrial {
                samples: 0,
                channels: 0,
            });
        }
        match self {
            TaperSpec::None => Ok(Array2::ones((1, len))),
            TaperSpec::Hann => Ok(single(len, hann)),
            TaperSpec::Bartlett => Ok(single(len, bartlett)),
            TaperSpec::Dpss(params) => {
                validate_dpss(len, params)?;
                if params.kmax as f64 > 2.0 * params.nw {
                    tracing::debug!(
                        kmax = params.kmax,
                        nw = params.nw,
                        "Kmax exceeds 2*NW; trailing tapers are poorly concentrated"
                    );
                }
                dpss_windows(len, params.nw, params.kmax)
            }
        }
    }
}

fn validate_dpss(len: usize, params: &DpssParams) -> Result<(), SpectralError> {
    if params.kmax == 0 || params.kmax >= len {
        return Err(SpectralError::InvalidTaperOptions {
            detail: format!("Kmax must be in 1..{len}, got {}", params.kmax),
        });
    }
    if !(params.nw > 0.0) || params.nw >= len as f64 / 2.0 {
        return Err(SpectralError::InvalidTaperOptions {
            detail: format!("NW must be in (0, {}), got {}", len as f64 / 2.0, params.nw),
        });
    }
    Ok(())
}

fn single(len: usize, window: fn(usize, usize) -> f64) -> Array2<f64> {
    let mut out = Array2::zeros((1, len));
    if len == 1 {
        out[[0, 0]] = 1.0;
        return out;
    }
    for n in 0..len {
        out[[0, n]] = window(n, len);
    }
    out
}

fn hann(n: usize, len: usize) -> f64 {
    0.5 - 0.5 * (2.0 * PI * n as f64 / (len - 1) as f64).cos()
}

fn bartlett(n: usize, len: usize) -> f64 {
    1.0 - (2.0 * n as f64 / (len - 1) as f64 - 1.0).abs()
}
