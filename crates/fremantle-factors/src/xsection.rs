//! Cross-sectional statistics over one date's scores.
//!
//! Every function ignores non-finite entries when computing statistics and
//! leaves them untouched (NaN stays NaN).

/// Finite values of a slice.
fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

/// Number of finite values.
pub fn finite_count(values: &[f64]) -> usize {
    finite(values).count()
}

/// Mean of the finite values, `None` when there are none.
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = finite(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Sample standard deviation (n - 1) of the finite values.
///
/// `None` for fewer than two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let n = finite_count(values);
    if n < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = finite(values).map(|v| (v - m).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

/// Clip finite values to `[mean - k*sd, mean + k*sd]`.
///
/// Returns `false` and leaves the slice unchanged when the dispersion is
/// undefined (fewer than two finite values).
pub fn clip_sigma(values: &mut [f64], k: f64) -> bool {
    let (Some(m), Some(sd)) = (mean(values), std_dev(values)) else {
        return false;
    };
    let (lo, hi) = (m - k * sd, m + k * sd);
    for v in values.iter_mut().filter(|v| v.is_finite()) {
        *v = v.clamp(lo, hi);
    }
    true
}

/// Subtract the mean of the finite values.
pub fn demean(values: &mut [f64]) {
    if let Some(m) = mean(values) {
        for v in values.iter_mut().filter(|v| v.is_finite()) {
            *v -= m;
        }
    }
}

/// Standardize to zero mean and unit sample standard deviation.
///
/// A cross-section with zero dispersion maps to 0.0 for every finite value.
pub fn zscore(values: &mut [f64]) {
    let (Some(m), Some(sd)) = (mean(values), std_dev(values)) else {
        for v in values.iter_mut() {
            *v = f64::NAN;
        }
        return;
    };
    for v in values.iter_mut().filter(|v| v.is_finite()) {
        *v = if sd > 0.0 { (*v - m) / sd } else { 0.0 };
    }
}

/// Average ranks (1-based) of the finite values; ties share the mean rank.
///
/// Non-finite entries get NaN.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len())
        .filter(|&i| values[i].is_finite())
        .collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![f64::NAN; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Replace finite values by their percentile rank, `average rank / count`.
pub fn percentile_rank(values: &mut [f64]) {
    let n = finite_count(values) as f64;
    let ranks = average_ranks(values);
    for (v, r) in values.iter_mut().zip(ranks) {
        *v = r / n;
    }
}
