use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::{ChatError, ChatbotTables, Quantity, ThresholdBand, UserType};
use crate::power::{take_series, DateRange, Location, SeriesSource};
use crate::stats::{self, round_to};

const MS_TO_KMH: f64 = 3.6;

/// Share of a two-sided band trimmed from each edge for "excellent"
const OPTIMAL_MARGIN: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suitability {
    Excellent,
    Good,
    Poor,
    Unknown,
}

impl Suitability {
    pub fn score(self) -> f64 {
        match self {
            Suitability::Excellent => 1.0,
            Suitability::Good => 0.7,
            Suitability::Poor => 0.3,
            Suitability::Unknown => 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterAnalysis {
    pub parameter: &'static str,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
    pub sample_count: usize,
    pub suitability: Suitability,
    pub thresholds: Option<ThresholdBand>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherAnalysis {
    pub user_type: UserType,
    pub location: Location,
    pub target_date: NaiveDate,
    pub parameters: Vec<ParameterAnalysis>,
}

impl WeatherAnalysis {
    pub fn parameter(&self, name: &str) -> Option<&ParameterAnalysis> {
        self.parameters.iter().find(|p| p.parameter == name)
    }

    pub fn overall_suitability(&self) -> f64 {
        overall_suitability(&self.parameters)
    }
}

/// Grade a value against a band. Out of range is poor; the central 80% of
/// a two-sided band is excellent; everything else inside is good.
pub fn assess_value(band: Option<&ThresholdBand>, value: f64) -> Suitability {
    let Some(band) = band else {
        return Suitability::Unknown;
    };
    if !value.is_finite() {
        return Suitability::Unknown;
    }
    if band.min.is_some_and(|min| value < min) || band.max.is_some_and(|max| value > max) {
        return Suitability::Poor;
    }
    match (band.min, band.max) {
        (Some(min), Some(max)) => {
            let margin = (max - min) * OPTIMAL_MARGIN;
            if value >= min + margin && value <= max - margin {
                Suitability::Excellent
            } else {
                Suitability::Good
            }
        }
        _ => Suitability::Good,
    }
}

/// Mean of the per-parameter scores, 0.5 when nothing was assessed
pub fn overall_suitability(parameters: &[ParameterAnalysis]) -> f64 {
    if parameters.is_empty() {
        return 0.5;
    }
    parameters.iter().map(|p| p.suitability.score()).sum::<f64>() / parameters.len() as f64
}

/// Summarise one parameter's window samples. `None` when there are no
/// finite samples or the parameter is not one the bot knows.
pub fn analyze_parameter(
    tables: &ChatbotTables,
    user_type: UserType,
    parameter: &'static str,
    samples: &[f64],
) -> Option<ParameterAnalysis> {
    let quantity = Quantity::for_parameter(parameter)?;
    let scale = if quantity == Quantity::Wind { MS_TO_KMH } else { 1.0 };
    let values: Vec<f64> = samples
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| v * scale)
        .collect();
    if values.is_empty() {
        return None;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let thresholds = tables
        .thresholds(user_type)
        .and_then(|t| t.get(quantity))
        .copied();

    Some(ParameterAnalysis {
        parameter,
        mean: round_to(mean, 2),
        min: round_to(min, 2),
        max: round_to(max, 2),
        unit: quantity.unit(),
        sample_count: values.len(),
        suitability: assess_value(thresholds.as_ref(), mean),
        thresholds,
    })
}

/// Fetch the user type's parameters and grade the day-of-year window
/// around `target_date`.
pub async fn assess_conditions<S: SeriesSource>(
    source: &S,
    tables: &ChatbotTables,
    history: DateRange,
    user_type: UserType,
    location: Location,
    target_date: NaiveDate,
) -> Result<WeatherAnalysis, ChatError> {
    if !location.is_valid() {
        return Err(ChatError::InvalidCoordinates);
    }

    let names = tables.parameters(user_type);
    let variables: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    let mut fetched = source.fetch_series(location, history, &variables).await?;

    let mut parameters = Vec::with_capacity(names.len());
    for &name in names {
        let series = take_series(&mut fetched, name)?;
        let samples = stats::select_dayofyear_window(&series, target_date, tables.window_days);
        match analyze_parameter(tables, user_type, name, &samples) {
            Some(p) => parameters.push(p),
            None => debug!("No usable samples for {} near {}", name, target_date),
        }
    }

    Ok(WeatherAnalysis {
        user_type,
        location,
        target_date,
        parameters,
    })
}
