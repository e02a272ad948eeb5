pub mod client;
pub mod endpoints;
pub mod error;
#[cfg(test)]
pub mod mock;

use std::collections::HashMap;
use std::future::Future;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::stats::DailySeries;

pub use client::PowerClient;
pub use error::PowerError;

/// Geographic point (decimal degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// "1981–2025" style label used in responses
    pub fn period_label(&self) -> String {
        format!("{}–{}", self.start.year(), self.end.year())
    }
}

/// Variable name -> daily series
pub type SeriesMap = HashMap<String, DailySeries>;

/// Anything that can hand back daily series for a point and date range.
///
/// Implementations must return every requested variable or fail with
/// [`PowerError::MissingVariable`].
pub trait SeriesSource: Send + Sync + 'static {
    fn fetch_series(
        &self,
        location: Location,
        range: DateRange,
        variables: &[String],
    ) -> impl Future<Output = Result<SeriesMap, PowerError>> + Send;
}

/// Remove one variable's series from a fetched map
pub fn take_series(series: &mut SeriesMap, variable: &str) -> Result<DailySeries, PowerError> {
    series
        .remove(variable)
        .ok_or_else(|| PowerError::MissingVariable(variable.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_bounds() {
        assert!(Location::new(30.0444, 31.2357).is_valid());
        assert!(Location::new(-90.0, 180.0).is_valid());
        assert!(!Location::new(91.0, 0.0).is_valid());
        assert!(!Location::new(0.0, -180.5).is_valid());
        assert!(!Location::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_period_label() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(1981, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 4).unwrap(),
        );
        assert_eq!(range.period_label(), "1981–2025");
    }

    #[test]
    fn test_take_series_missing() {
        let mut map = SeriesMap::new();
        map.insert("T2M".to_string(), Vec::new());
        assert!(take_series(&mut map, "T2M").is_ok());
        let err = take_series(&mut map, "WS10M").unwrap_err();
        assert_eq!(err.to_string(), "Variable WS10M not available in POWER response");
    }
}
