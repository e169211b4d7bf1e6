//! Matching requested frequencies of interest onto a computed axis.

use super::error::SpectralError;

/// Map requested frequencies onto the nearest bins of `axis`.
///
/// `axis` must be sorted ascending (the output of
/// [`freq_axis`](super::freq_axis) always is). Returns the matched axis values
/// and their bin indices in request order. Ties between two equidistant bins
/// resolve to the lower-valued bin. With `squash_duplicates`, requests that
/// collapse onto the same bin are reported once and the index sequence is
/// sorted ascending.
///
/// Requests beyond either end clamp to the edge bins; only a request set that
/// lies entirely outside the axis range is an error.
pub fn best_match(
    axis: &[f64],
    requests: &[f64],
    squash_duplicates: bool,
) -> Result<(Vec<f64>, Vec<usize>), SpectralError> {
    if requests.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }
    let lo = axis.first().copied().unwrap_or(f64::NAN);
    let hi = axis.last().copied().unwrap_or(f64::NAN);
    if axis.is_empty() || requests.iter().all(|&f| f < lo || f > hi) {
        return Err(SpectralError::FrequenciesOutOfRange { lo, hi });
    }

    let mut indices: Vec<usize> = requests.iter().map(|&f| nearest_bin(axis, f)).collect();
    if squash_duplicates {
        indices.sort_unstable();
        indices.dedup();
    }
    let values = indices.iter().map(|&i| axis[i]).collect();
    Ok((values, indices))
}

fn nearest_bin(axis: &[f64], request: f64) -> usize {
    let upper = axis.partition_point(|&v| v < request);
    if upper == 0 {
        return 0;
    }
    if upper == axis.len() {
        return axis.len() - 1;
    }
    let below = upper - 1;
    // `<=` keeps the lower bin on exact ties.
    if (request - axis[below]).abs() <= (axis[upper] - request).abs() {
        below
    } else {
        upper
    }
}
