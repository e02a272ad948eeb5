use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use super::{day_of_year, doy_band, Comparison};

/// Exceedance tally for one calendar year, restricted to the day-of-year band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnnualBucket {
    pub year: i32,
    pub exceed: usize,
    pub total: usize,
}

impl AnnualBucket {
    /// `exceed / total`, or 0.0 for an empty year
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.exceed as f64 / self.total as f64
        }
    }
}

/// Unrounded annual-exceedance trend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub years: Vec<i32>,
    pub rates: Vec<f64>,
    /// Sen's slope, rate change per year
    pub slope: f64,
    /// Mann-Kendall S statistic
    pub s: i64,
    /// Mann-Kendall Z, no tie correction
    pub z: f64,
    /// Two-sided p-value for `z` under the standard normal
    pub p_value: f64,
}

/// Tally finite observations inside the fixed band around `center_date`, per year.
///
/// Years come back in ascending order. Years with no observations in the band
/// do not appear.
pub fn annual_buckets(
    series: &[(NaiveDate, f64)],
    center_date: NaiveDate,
    threshold: f64,
    comparison: Comparison,
    window_days: u32,
) -> Vec<AnnualBucket> {
    let (lower, upper) = doy_band(center_date, window_days);
    let mut tally: BTreeMap<i32, (usize, usize)> = BTreeMap::new();

    for &(date, value) in series {
        let doy = day_of_year(date);
        if !(lower <= doy && doy <= upper) || !value.is_finite() {
            continue;
        }
        let entry = tally.entry(date.year()).or_insert((0, 0));
        entry.1 += 1;
        if comparison.matches(value, threshold) {
            entry.0 += 1;
        }
    }

    tally
        .into_iter()
        .map(|(year, (exceed, total))| AnnualBucket { year, exceed, total })
        .collect()
}

/// Sen's slope: the median of all pairwise slopes.
///
/// Takes the sorted slope at index `len / 2`; for an even count the two
/// middle values are not averaged. Zero pairs give 0.0.
pub fn sens_slope(years: &[i32], values: &[f64]) -> f64 {
    let n = years.len().min(values.len());
    let mut slopes = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            if years[j] != years[i] {
                slopes.push((values[j] - values[i]) / f64::from(years[j] - years[i]));
            }
        }
    }
    if slopes.is_empty() {
        return 0.0;
    }
    slopes.sort_by(|a, b| a.total_cmp(b));
    slopes[slopes.len() / 2]
}

/// Mann-Kendall S: sum of the signs of every later-minus-earlier difference
pub fn mann_kendall_s(values: &[f64]) -> i64 {
    let mut s = 0i64;
    for i in 0..values.len() {
        for j in (i + 1)..values.len() {
            if values[j] > values[i] {
                s += 1;
            } else if values[j] < values[i] {
                s -= 1;
            }
        }
    }
    s
}

/// Variance of S under the null hypothesis, assuming no ties
pub fn mann_kendall_variance(n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let n = n as f64;
    n * (n - 1.0) * (2.0 * n + 5.0) / 18.0
}

/// Mann-Kendall Z = S / sqrt(var); 0.0 when the variance vanishes
pub fn mann_kendall_z(values: &[f64]) -> f64 {
    let var_s = mann_kendall_variance(values.len());
    if var_s > 0.0 {
        mann_kendall_s(values) as f64 / var_s.sqrt()
    } else {
        0.0
    }
}

/// Two-sided p-value `2 * (1 - Φ(|z|))`
pub fn two_sided_p_value(z: f64) -> f64 {
    let dist = match Normal::new(0.0, 1.0) {
        Ok(d) => d,
        Err(_) => return f64::NAN,
    };
    (2.0 * (1.0 - dist.cdf(z.abs()))).clamp(0.0, 1.0)
}

/// Per-year exceedance rates around `center_date` and their monotonic trend
pub fn annual_exceedance_trend(
    series: &[(NaiveDate, f64)],
    center_date: NaiveDate,
    threshold: f64,
    comparison: Comparison,
    window_days: u32,
) -> TrendResult {
    let buckets = annual_buckets(series, center_date, threshold, comparison, window_days);
    let years: Vec<i32> = buckets.iter().map(|b| b.year).collect();
    let rates: Vec<f64> = buckets.iter().map(AnnualBucket::rate).collect();

    let slope = sens_slope(&years, &rates);
    let s = mann_kendall_s(&rates);
    let z = mann_kendall_z(&rates);

    tracing::debug!(
        "Trend over {} years: slope={:.5} S={} Z={:.3}",
        years.len(), slope, s, z
    );

    TrendResult {
        years,
        rates,
        slope,
        s,
        z,
        p_value: two_sided_p_value(z),
    }
}
