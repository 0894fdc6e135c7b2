//! Statistics over rebalance-period return series.
//!
//! Returns are simple per-period returns. NaN periods (a bucket with no
//! resolved trade) contribute nothing: they do not move the NAV and are left
//! out of the moments.

use fremantle_data::Symbol;
use fremantle_factors::xsection::{average_ranks, mean, std_dev};
use std::collections::BTreeSet;

/// Spearman rank correlation between `x` and `y`.
///
/// Pairs where either side is non-finite are dropped. NaN with fewer than
/// three pairs or when either side has no dispersion.
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(a, b)| (*a, *b))
        .unzip();
    if xs.len() < 3 {
        return f64::NAN;
    }
    pearson(&average_ranks(&xs), &average_ranks(&ys))
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let (Some(mx), Some(my)) = (mean(x), mean(y)) else {
        return f64::NAN;
    };
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (da, db) = (a - mx, b - my);
        sxy += da * db;
        sxx += da * da;
        syy += db * db;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

/// Net asset value after each period, starting from 1.0.
///
/// A NaN period carries the previous value forward.
pub fn nav(returns: &[f64]) -> Vec<f64> {
    let mut level = 1.0;
    returns
        .iter()
        .map(|r| {
            if r.is_finite() {
                level *= 1.0 + r;
            }
            level
        })
        .collect()
}

/// Compounded return over the whole series; NaN when no period is finite.
pub fn cumulative_return(returns: &[f64]) -> f64 {
    if !returns.iter().any(|r| r.is_finite()) {
        return f64::NAN;
    }
    nav(returns).last().map_or(f64::NAN, |v| v - 1.0)
}

/// Compound annual growth rate over the finite periods.
pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
    let periods = returns.iter().filter(|r| r.is_finite()).count();
    if periods == 0 {
        return f64::NAN;
    }
    let growth = 1.0 + cumulative_return(returns);
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(periods_per_year / periods as f64) - 1.0
}

/// Sample standard deviation of the finite periods scaled by `sqrt(periods_per_year)`.
pub fn annualized_volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    std_dev(returns).map_or(f64::NAN, |sd| sd * periods_per_year.sqrt())
}

/// `(annualized mean - risk_free_rate) / annualized volatility`.
///
/// NaN when the volatility is zero or undefined.
pub fn sharpe(returns: &[f64], periods_per_year: f64, risk_free_rate: f64) -> f64 {
    let vol = annualized_volatility(returns, periods_per_year);
    match mean(returns) {
        Some(m) if vol > 0.0 => (m * periods_per_year - risk_free_rate) / vol,
        _ => f64::NAN,
    }
}

/// Most negative `nav / running_max(nav) - 1`, with the initial 1.0 as the
/// first peak. NaN for an empty series.
pub fn max_drawdown(nav: &[f64]) -> f64 {
    if nav.is_empty() {
        return f64::NAN;
    }
    let mut peak: f64 = 1.0;
    let mut worst: f64 = 0.0;
    for v in nav {
        peak = peak.max(*v);
        worst = worst.min(v / peak - 1.0);
    }
    worst
}

/// Share of `current` that was not in `previous`.
///
/// NaN for an empty current membership.
pub fn turnover(previous: &[Symbol], current: &[Symbol]) -> f64 {
    if current.is_empty() {
        return f64::NAN;
    }
    let before: BTreeSet<&Symbol> = previous.iter().collect();
    let kept = current.iter().filter(|s| before.contains(s)).count();
    1.0 - kept as f64 / current.len() as f64
}
