use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, info, warn};

use super::endpoints;
use super::{DateRange, Location, PowerError, SeriesMap, SeriesSource};
use crate::config::PowerConfig;
use crate::stats::DailySeries;

/// NASA POWER daily point client
/// One request returns every requested variable for the whole date range
pub struct PowerClient {
    http: Client,
    base_url: String,
    community: String,
}

/// Daily point response: properties.parameter.{VAR}.{YYYYMMDD: value}
#[derive(Debug, Deserialize)]
struct PowerResponse {
    #[serde(default)]
    header: Option<PowerHeader>,
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerHeader {
    fill_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    #[serde(default)]
    parameter: HashMap<String, HashMap<String, serde_json::Value>>,
}

impl PowerClient {
    pub fn new(config: &PowerConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            community: config.community.clone(),
        })
    }

    /// Fetch daily series for each variable over `range` at `location`
    pub async fn fetch_daily_series(
        &self,
        location: Location,
        range: DateRange,
        variables: &[String],
    ) -> Result<SeriesMap, PowerError> {
        let query = [
            ("parameters", variables.join(",")),
            ("community", self.community.clone()),
            ("latitude", format!("{:.4}", location.lat)),
            ("longitude", format!("{:.4}", location.lon)),
            ("start", range.start.format(endpoints::DATE_FORMAT).to_string()),
            ("end", range.end.format(endpoints::DATE_FORMAT).to_string()),
            ("format", "JSON".to_string()),
        ];

        debug!(
            "POWER request {} vars={:?} at ({:.4}, {:.4}) {}..{}",
            self.base_url, variables, location.lat, location.lon, range.start, range.end
        );

        let resp = self
            .http
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|source| PowerError::Http {
                url: self.base_url.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("POWER returned {} for {:?}", status, variables);
            return Err(PowerError::Status {
                status,
                body: truncate(&body, 300),
            });
        }

        let data: PowerResponse = resp.json().await.map_err(PowerError::Decode)?;
        let fill_value = data
            .header
            .and_then(|h| h.fill_value)
            .unwrap_or(endpoints::DEFAULT_FILL_VALUE);

        let mut parameters = data.properties.parameter;
        let mut series = SeriesMap::new();
        for var in variables {
            let raw = parameters
                .remove(var)
                .ok_or_else(|| PowerError::MissingVariable(var.clone()))?;
            let parsed = parse_daily_values(raw, fill_value);
            info!("Fetched {} days of {}", parsed.len(), var);
            series.insert(var.clone(), parsed);
        }

        Ok(series)
    }
}

impl SeriesSource for PowerClient {
    fn fetch_series(
        &self,
        location: Location,
        range: DateRange,
        variables: &[String],
    ) -> impl Future<Output = Result<SeriesMap, PowerError>> + Send {
        self.fetch_daily_series(location, range, variables)
    }
}

/// Turn `{YYYYMMDD: value}` into a date-sorted series.
/// Unparseable keys are dropped; null, non-numeric and fill values become NaN.
fn parse_daily_values(raw: HashMap<String, serde_json::Value>, fill_value: f64) -> DailySeries {
    let mut items: DailySeries = raw
        .into_iter()
        .filter_map(|(ymd, value)| {
            let date = NaiveDate::parse_from_str(&ymd, endpoints::DATE_FORMAT).ok()?;
            let value = match value.as_f64() {
                Some(v) if v != fill_value => v,
                _ => f64::NAN,
            };
            Some((date, value))
        })
        .collect();
    items.sort_by_key(|&(date, _)| date);
    items
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}
