use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::{day_of_year, rounded};

/// Summary of the historical values seen on one day-of-year.
/// Each statistic is rounded to 3 places; `None` when undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoyStats {
    pub doy: u32,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub p10: Option<f64>,
    pub p90: Option<f64>,
}

/// Unrounded bucket statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
}

/// Mean, median and nearest-rank 10th/90th percentiles.
///
/// Percentiles index `floor(n * p)` into the ascending sort, without
/// interpolation. Returns `None` for an empty slice.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();

    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    let rank = |p: f64| sorted[((n as f64 * p).floor() as usize).min(n - 1)];

    Some(Summary {
        mean,
        median,
        p10: rank(0.1),
        p90: rank(0.9),
    })
}

/// Day-of-year climatology over every year in `series`.
///
/// Only days with at least one finite observation produce a row; rows come
/// out in ascending day-of-year order.
pub fn build_climatology(series: &[(NaiveDate, f64)]) -> Vec<DoyStats> {
    let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for &(date, value) in series {
        if value.is_finite() {
            buckets.entry(day_of_year(date)).or_default().push(value);
        }
    }

    buckets
        .into_iter()
        .map(|(doy, values)| match summarize(&values) {
            Some(s) => DoyStats {
                doy,
                mean: rounded(s.mean, 3),
                median: rounded(s.median, 3),
                p10: rounded(s.p10, 3),
                p90: rounded(s.p90, 3),
            },
            None => DoyStats {
                doy,
                mean: None,
                median: None,
                p10: None,
                p90: None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_doy(year: i32, doy: u32) -> NaiveDate {
        NaiveDate::from_yo_opt(year, doy).unwrap()
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(summarize(&[4.0, 1.0, 3.0, 2.0]).unwrap().median, 2.5);
        assert_eq!(summarize(&[5.0, 1.0, 3.0]).unwrap().median, 3.0);
    }

    #[test]
    fn test_nearest_rank_percentiles() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let s = summarize(&values).unwrap();
        assert_eq!(s.p10, 2.0);
        assert_eq!(s.p90, 10.0);
        assert_eq!(s.mean, 5.5);

        let single = summarize(&[7.0]).unwrap();
        assert_eq!((single.p10, single.median, single.p90), (7.0, 7.0, 7.0));
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_build_groups_by_doy_across_years() {
        let series = vec![
            (at_doy(2001, 32), 10.0),
            (at_doy(2002, 32), 20.0),
            (at_doy(2003, 32), f64::NAN),
            (at_doy(2001, 1), 1.0 / 3.0),
            (at_doy(2002, 60), f64::INFINITY),
        ];
        let table = build_climatology(&series);

        let doys: Vec<u32> = table.iter().map(|r| r.doy).collect();
        assert_eq!(doys, vec![1, 32]);

        assert_eq!(table[0].mean, Some(0.333));
        assert_eq!(table[1].mean, Some(15.0));
        assert_eq!(table[1].median, Some(15.0));
        assert_eq!(table[1].p10, Some(10.0));
        assert_eq!(table[1].p90, Some(20.0));
    }

    #[test]
    fn test_build_empty_series() {
        assert!(build_climatology(&[]).is_empty());
    }
}
