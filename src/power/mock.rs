//! In-memory series source for tests.

use std::future::Future;
use std::sync::Mutex;

use super::{DateRange, Location, PowerError, SeriesMap, SeriesSource};
use crate::stats::DailySeries;

/// Serves fixed series, or fails every request when `fail` is set
#[derive(Default)]
pub struct StaticSource {
    series: SeriesMap,
    fail: bool,
    /// (location, range, variables) of each call
    pub calls: Mutex<Vec<(Location, DateRange, Vec<String>)>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, variable: &str, series: DailySeries) -> Self {
        self.series.insert(variable.to_string(), series);
        self
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl SeriesSource for StaticSource {
    fn fetch_series(
        &self,
        location: Location,
        range: DateRange,
        variables: &[String],
    ) -> impl Future<Output = Result<SeriesMap, PowerError>> + Send {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((location, range, variables.to_vec()));
        }
        let result = if self.fail {
            Err(PowerError::Status {
                status: reqwest::StatusCode::BAD_GATEWAY,
                body: "upstream unavailable".to_string(),
            })
        } else {
            variables
                .iter()
                .map(|v| {
                    self.series
                        .get(v)
                        .cloned()
                        .map(|s| (v.clone(), s))
                        .ok_or_else(|| PowerError::MissingVariable(v.clone()))
                })
                .collect::<Result<SeriesMap, PowerError>>()
        };
        std::future::ready(result)
    }
}
