//! Probability, climatology and trend reports.
//!
//! Each operation fetches one variable over the full historical range, runs the
//! statistics in [`crate::stats`] and assembles the response document. The HTTP
//! handlers and the CLI both go through here.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::power::{endpoints, take_series, DateRange, Location, PowerError, SeriesSource};
use crate::stats::{self, climatology, trend, Comparison, DailySeries};

pub const SOURCE_POWER: &str = "NASA POWER";
pub const SOURCE_POWER_MERRA2: &str = "NASA POWER (MERRA-2 derived)";

/// Fetch range from the configured record start through `today`
pub fn history_range(config: &AnalysisConfig, today: NaiveDate) -> DateRange {
    DateRange::new(config.history_start, today)
}

/// Units of a POWER daily parameter in the RE community
pub fn units_for(variable: &str) -> Option<&'static str> {
    match variable {
        endpoints::T2M | endpoints::T2M_MAX | endpoints::T2M_MIN => Some("°C"),
        endpoints::PRECTOTCORR => Some("mm/day"),
        endpoints::WS10M | endpoints::WS10M_MAX => Some("m/s"),
        endpoints::RH2M => Some("%"),
        _ => None,
    }
}

async fn fetch_variable<S: SeriesSource>(
    source: &S,
    location: Location,
    range: DateRange,
    variable: &str,
) -> Result<DailySeries, PowerError> {
    let variables = [variable.to_string()];
    let mut series = source.fetch_series(location, range, &variables).await?;
    take_series(&mut series, variable)
}

#[derive(Debug, Clone)]
pub struct ProbabilityRequest {
    pub location: Location,
    pub target_date: NaiveDate,
    pub variable: String,
    pub threshold: f64,
    pub comparison: Comparison,
    pub window_days: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbabilityReport {
    /// NaN (null in JSON) when the window held no samples
    pub probability: f64,
    pub n_samples: usize,
    pub ci_95: [f64; 2],
    pub threshold: f64,
    pub comparison: Comparison,
    pub units: Option<&'static str>,
    pub source: Vec<&'static str>,
    pub period: String,
    pub method: String,
}

pub async fn probability<S: SeriesSource>(
    source: &S,
    range: DateRange,
    req: &ProbabilityRequest,
) -> Result<ProbabilityReport, PowerError> {
    let series = fetch_variable(source, req.location, range, &req.variable).await?;
    let samples = stats::select_dayofyear_window(&series, req.target_date, req.window_days);
    let result = stats::exceedance(&samples, req.threshold, req.comparison);

    info!(
        "P({} {} {}) near {} = {:.4} from {} samples",
        req.variable, req.comparison.symbol(), req.threshold, req.target_date,
        result.probability, result.n_samples
    );

    Ok(ProbabilityReport {
        probability: result.probability,
        n_samples: result.n_samples,
        ci_95: [result.ci_low, result.ci_high],
        threshold: req.threshold,
        comparison: req.comparison,
        units: units_for(&req.variable),
        source: vec![SOURCE_POWER_MERRA2],
        period: range.period_label(),
        method: format!("DOY ±{}d; binomial proportion (Wilson CI)", req.window_days),
    })
}

#[derive(Debug, Clone)]
pub struct ClimatologyRequest {
    pub location: Location,
    pub variable: String,
    /// Echoed back; buckets are exact days-of-year
    pub window_days: u32,
}

/// Column-oriented climatology table
#[derive(Debug, Clone, Serialize)]
pub struct ClimatologyReport {
    pub doy: Vec<u32>,
    pub mean: Vec<Option<f64>>,
    pub median: Vec<Option<f64>>,
    pub p10: Vec<Option<f64>>,
    pub p90: Vec<Option<f64>>,
    pub window_days: u32,
    pub units: Option<&'static str>,
    pub source: Vec<&'static str>,
    pub period: String,
}

pub async fn climatology<S: SeriesSource>(
    source: &S,
    range: DateRange,
    req: &ClimatologyRequest,
) -> Result<ClimatologyReport, PowerError> {
    let series = fetch_variable(source, req.location, range, &req.variable).await?;
    let rows = climatology::build_climatology(&series);
    info!("Climatology for {}: {} day-of-year buckets", req.variable, rows.len());

    Ok(ClimatologyReport {
        doy: rows.iter().map(|r| r.doy).collect(),
        mean: rows.iter().map(|r| r.mean).collect(),
        median: rows.iter().map(|r| r.median).collect(),
        p10: rows.iter().map(|r| r.p10).collect(),
        p90: rows.iter().map(|r| r.p90).collect(),
        window_days: req.window_days,
        units: units_for(&req.variable),
        source: vec![SOURCE_POWER],
        period: range.period_label(),
    })
}

#[derive(Debug, Clone)]
pub struct TrendRequest {
    pub location: Location,
    pub target_date: NaiveDate,
    pub variable: String,
    pub threshold: f64,
    pub comparison: Comparison,
    pub window_days: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub years: Vec<i32>,
    /// Per-year exceedance rate, 4 dp
    pub values: Vec<f64>,
    /// Sen's slope, 5 dp
    pub trend_slope_per_year: f64,
    /// 3 dp
    pub mann_kendall_z: f64,
    pub mann_kendall_s: i64,
    /// Two-sided, 4 dp
    pub p_value: f64,
    pub source: Vec<&'static str>,
    pub period: String,
}

pub async fn trend<S: SeriesSource>(
    source: &S,
    range: DateRange,
    req: &TrendRequest,
) -> Result<TrendReport, PowerError> {
    let series = fetch_variable(source, req.location, range, &req.variable).await?;
    let result = trend::annual_exceedance_trend(
        &series,
        req.target_date,
        req.threshold,
        req.comparison,
        req.window_days,
    );

    info!(
        "Trend for {} {} {}: {} years, slope={:.5}/yr, Z={:.3}",
        req.variable, req.comparison.symbol(), req.threshold,
        result.years.len(), result.slope, result.z
    );

    Ok(TrendReport {
        values: result.rates.iter().map(|&r| stats::round_to(r, 4)).collect(),
        years: result.years,
        trend_slope_per_year: stats::round_to(result.slope, 5),
        mann_kendall_z: stats::round_to(result.z, 3),
        mann_kendall_s: result.s,
        p_value: stats::round_to(result.p_value, 4),
        source: vec![SOURCE_POWER],
        period: range.period_label(),
    })
}
