//! Day-of-year windowing and exceedance statistics over daily climate series.
//!
//! Everything in here is a pure function over already-fetched data. Degenerate
//! input (no samples, a single year, zero variance) never errors; it maps to a
//! NaN, `None` or zero sentinel instead.

pub mod climatology;
pub mod trend;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Daily observations for one variable, ordered by date. Missing values are NaN.
pub type DailySeries = Vec<(NaiveDate, f64)>;

/// Two-sided z-score for a 95% interval
pub const Z_95: f64 = 1.959963984540054;

/// Largest day-of-year (leap years)
pub const MAX_DOY: u32 = 366;

/// Threshold comparison mode. Both modes are strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    #[default]
    Gt,
    Lt,
}

impl Comparison {
    pub fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Gt => value > threshold,
            Comparison::Lt => value < threshold,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Lt => "<",
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comparison::Gt => write!(f, "gt"),
            Comparison::Lt => write!(f, "lt"),
        }
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gt" | ">" => Ok(Comparison::Gt),
            "lt" | "<" => Ok(Comparison::Lt),
            other => Err(format!("comparison must be 'gt' or 'lt', got '{}'", other)),
        }
    }
}

/// Ordinal day within the calendar year (1..=366)
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

/// Inclusive day-of-year band around `center_date`, clamped to 1..=366.
///
/// The band does not wrap across the year boundary: a centre on 3 January with
/// a 15 day window covers days 1..=18 only.
pub fn doy_band(center_date: NaiveDate, window_days: u32) -> (u32, u32) {
    let center = day_of_year(center_date);
    let lower = center.saturating_sub(window_days).max(1);
    let upper = center.saturating_add(window_days).min(MAX_DOY);
    (lower, upper)
}

/// Collect every finite value whose day-of-year lies within `window_days` of
/// `center_date`'s day-of-year, across all years in the series.
pub fn select_dayofyear_window(
    series: &[(NaiveDate, f64)],
    center_date: NaiveDate,
    window_days: u32,
) -> Vec<f64> {
    let (lower, upper) = doy_band(center_date, window_days);
    series
        .iter()
        .filter(|(date, value)| {
            let doy = day_of_year(*date);
            lower <= doy && doy <= upper && value.is_finite()
        })
        .map(|&(_, value)| value)
        .collect()
}

/// Number of samples strictly beyond `threshold` in the given direction
pub fn count_exceedances(samples: &[f64], threshold: f64, comparison: Comparison) -> usize {
    samples
        .iter()
        .filter(|&&x| comparison.matches(x, threshold))
        .count()
}

/// Empirical exceedance probability `k / n`. NaN when there are no samples.
pub fn compute_exceedance_probability(
    samples: &[f64],
    threshold: f64,
    comparison: Comparison,
) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    count_exceedances(samples, threshold, comparison) as f64 / samples.len() as f64
}

/// Wilson score interval for a binomial proportion.
///
/// Only the 95% level is tabulated; any other `confidence` falls back to the
/// 95% z-score. Returns `(NaN, NaN)` when `n == 0`. Both bounds are clamped
/// to `[0, 1]`.
pub fn wilson_confidence_interval(k: usize, n: usize, confidence: f64) -> (f64, f64) {
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let z = if (confidence - 0.95).abs() < f64::EPSILON {
        Z_95
    } else {
        tracing::debug!("Unsupported confidence level {}, using 95%", confidence);
        Z_95
    };

    let n = n as f64;
    let phat = k as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (phat + z2 / (2.0 * n)) / denom;
    let margin = z * ((phat * (1.0 - phat) + z2 / (4.0 * n)) / n).sqrt() / denom;

    ((center - margin).max(0.0), (center + margin).min(1.0))
}

/// Exceedance probability together with its sample support and 95% interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExceedanceResult {
    pub probability: f64,
    pub successes: usize,
    pub n_samples: usize,
    pub ci_low: f64,
    pub ci_high: f64,
}

/// Run the estimator and the Wilson interval over one sample window
pub fn exceedance(samples: &[f64], threshold: f64, comparison: Comparison) -> ExceedanceResult {
    let successes = count_exceedances(samples, threshold, comparison);
    let n_samples = samples.len();
    let (ci_low, ci_high) = wilson_confidence_interval(successes, n_samples, 0.95);
    let probability = if n_samples == 0 {
        f64::NAN
    } else {
        successes as f64 / n_samples as f64
    };
    ExceedanceResult {
        probability,
        successes,
        n_samples,
        ci_low,
        ci_high,
    }
}

/// Round to `decimals` places; non-finite input becomes `None`.
///
/// Rounds the exact binary value through decimal formatting, so 2.675
/// (stored as 2.67499...) gives 2.67 rather than 2.68.
pub fn rounded(value: f64, decimals: usize) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    format!("{:.*}", decimals, value).parse().ok()
}

/// Round to `decimals` places, passing NaN and infinities through untouched.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    rounded(value, decimals).unwrap_or(value)
}
