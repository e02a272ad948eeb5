use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppState;
use crate::analysis::{
    self, ClimatologyReport, ClimatologyRequest, ProbabilityReport, ProbabilityRequest, TrendReport,
    TrendRequest,
};
use crate::chatbot::{self, respond::Suggestions, ChatReply, ChatRequest};
use crate::power::{Location, SeriesSource};
use crate::stats::Comparison;

#[derive(Debug, Deserialize)]
pub struct ProbabilityQuery {
    pub lat: f64,
    pub lon: f64,
    pub target_date: NaiveDate,
    #[serde(rename = "var")]
    pub variable: String,
    pub threshold: f64,
    #[serde(default)]
    pub comparison: Comparison,
    pub window_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ClimatologyQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "var")]
    pub variable: String,
    pub window_days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub lat: f64,
    pub lon: f64,
    pub target_date: NaiveDate,
    #[serde(rename = "var")]
    pub variable: String,
    pub threshold: f64,
    #[serde(default)]
    pub comparison: Comparison,
    pub window_days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

fn validate_location(lat: f64, lon: f64) -> Result<Location, ApiError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ApiError::BadRequest(format!("lat must be between -90 and 90, got {}", lat)));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::BadRequest(format!("lon must be between -180 and 180, got {}", lon)));
    }
    Ok(Location::new(lat, lon))
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn probability<S: SeriesSource>(
    State(state): State<Arc<AppState<S>>>,
    Query(q): Query<ProbabilityQuery>,
) -> Result<Json<ProbabilityReport>, ApiError> {
    let location = validate_location(q.lat, q.lon)?;
    let window_days = q.window_days.unwrap_or(state.analysis.default_window_days);
    if window_days > state.analysis.max_window_days {
        return Err(ApiError::BadRequest(format!(
            "window_days must be between 0 and {}, got {}",
            state.analysis.max_window_days, window_days
        )));
    }

    let req = ProbabilityRequest {
        location,
        target_date: q.target_date,
        variable: q.variable,
        threshold: q.threshold,
        comparison: q.comparison,
        window_days,
    };
    let report = analysis::probability(&state.source, state.history(), &req).await?;
    Ok(Json(report))
}

pub async fn climatology<S: SeriesSource>(
    State(state): State<Arc<AppState<S>>>,
    Query(q): Query<ClimatologyQuery>,
) -> Result<Json<ClimatologyReport>, ApiError> {
    let req = ClimatologyRequest {
        location: validate_location(q.lat, q.lon)?,
        variable: q.variable,
        window_days: q.window_days.unwrap_or(state.analysis.default_window_days),
    };
    let report = analysis::climatology(&state.source, state.history(), &req).await?;
    Ok(Json(report))
}

pub async fn trend<S: SeriesSource>(
    State(state): State<Arc<AppState<S>>>,
    Query(q): Query<TrendQuery>,
) -> Result<Json<TrendReport>, ApiError> {
    let req = TrendRequest {
        location: validate_location(q.lat, q.lon)?,
        target_date: q.target_date,
        variable: q.variable,
        threshold: q.threshold,
        comparison: q.comparison,
        window_days: q.window_days.unwrap_or(state.analysis.default_window_days),
    };
    let report = analysis::trend(&state.source, state.history(), &req).await?;
    Ok(Json(report))
}

pub async fn chatbot<S: SeriesSource>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query is required".to_string()));
    }
    let today = Utc::now().date_naive();
    let reply = chatbot::respond(&state.source, &state.tables, state.history(), &req, today).await;
    Ok(Json(reply))
}

pub async fn chatbot_suggestions() -> Json<Suggestions> {
    Json(chatbot::respond::suggestions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::{ChatbotTables, Intent};
    use crate::config::AnalysisConfig;
    use crate::power::mock::StaticSource;
    use axum::http::StatusCode;

    fn state(source: StaticSource) -> Arc<AppState<StaticSource>> {
        Arc::new(AppState::new(source, AnalysisConfig::default(), ChatbotTables::default()))
    }

    fn summer_source() -> StaticSource {
        let series = (1990..2000)
            .flat_map(|y| (170..=190).map(move |d| (NaiveDate::from_yo_opt(y, d).unwrap(), (y - 1960) as f64)))
            .collect();
        StaticSource::new().with_series("T2M_MAX", series)
    }

    fn probability_query(lat: f64, window_days: Option<u32>) -> ProbabilityQuery {
        ProbabilityQuery {
            lat,
            lon: 31.0,
            target_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            variable: "T2M_MAX".to_string(),
            threshold: 35.0,
            comparison: Comparison::Gt,
            window_days,
        }
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(health().await.0.status, "ok");
    }

    #[tokio::test]
    async fn test_probability_handler() {
        let state = state(summer_source());
        let Json(report) = probability(State(state.clone()), Query(probability_query(30.0, None)))
            .await
            .unwrap();
        // 1996..1999 are 36..39 °C
        assert_eq!(report.n_samples, 210);
        assert!((report.probability - 0.4).abs() < 1e-12);
        assert!(report.method.contains("±15d"));

        let calls = state.source.calls.lock().unwrap();
        assert_eq!(calls[0].1.start, NaiveDate::from_ymd_opt(1981, 1, 1).unwrap());
        assert_eq!(calls[0].2, vec!["T2M_MAX".to_string()]);
    }

    #[tokio::test]
    async fn test_probability_rejects_bad_lat() {
        let state = state(summer_source());
        let err = probability(State(state.clone()), Query(probability_query(95.0, None)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_probability_rejects_wide_window() {
        let state = state(summer_source());
        let err = probability(State(state), Query(probability_query(30.0, Some(61))))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("window_days"));
    }

    #[tokio::test]
    async fn test_climatology_handler() {
        let q = ClimatologyQuery { lat: 30.0, lon: 31.0, variable: "T2M_MAX".into(), window_days: None };
        let Json(report) = climatology(State(state(summer_source())), Query(q)).await.unwrap();
        assert_eq!(report.doy.len(), 21);
        assert_eq!(report.window_days, 15);
        assert_eq!(report.mean[0], Some(34.5));
    }

    #[tokio::test]
    async fn test_climatology_rejects_bad_lon() {
        let q = ClimatologyQuery { lat: 0.0, lon: 181.0, variable: "T2M_MAX".into(), window_days: None };
        let err = climatology(State(state(summer_source())), Query(q)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_trend_upstream_failure_is_500() {
        let q = TrendQuery {
            lat: 30.0,
            lon: 31.0,
            target_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            variable: "T2M_MAX".into(),
            threshold: 35.0,
            comparison: Comparison::Gt,
            window_days: None,
        };
        let err = trend(State(state(StaticSource::failing())), Query(q)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_trend_handler() {
        let q = TrendQuery {
            lat: 30.0,
            lon: 31.0,
            target_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            variable: "T2M_MAX".into(),
            threshold: 35.0,
            comparison: Comparison::Gt,
            window_days: Some(5),
        };
        let Json(report) = trend(State(state(summer_source())), Query(q)).await.unwrap();
        assert_eq!(report.years, (1990..2000).collect::<Vec<_>>());
        assert_eq!(report.mann_kendall_s, 24);
        assert!(report.p_value < 0.05);
    }

    #[tokio::test]
    async fn test_query_string_parsing() {
        let uri: axum::http::Uri =
            "/probability?lat=30&lon=31&target_date=2025-07-01&var=T2M&threshold=30&window_days=10"
                .parse()
                .unwrap();
        let Query(q) = Query::<ProbabilityQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(q.variable, "T2M");
        assert_eq!(q.comparison, Comparison::Gt);
        assert_eq!(q.window_days, Some(10));
        assert_eq!(q.target_date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }

    #[tokio::test]
    async fn test_chatbot_empty_query() {
        let req = ChatRequest { query: "   ".into(), location: None, target_date: None, context: None };
        let err = chatbot(State(state(summer_source())), Json(req)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chatbot_asks_for_location() {
        let req = ChatRequest {
            query: "Is it safe to go fishing?".into(),
            location: None,
            target_date: None,
            context: None,
        };
        let Json(reply) = chatbot(State(state(summer_source())), Json(req)).await.unwrap();
        assert!(reply.needs_location);
        assert_eq!(reply.intent, Intent::SuitabilityCheck);
    }

    #[tokio::test]
    async fn test_suggestions() {
        let Json(s) = chatbot_suggestions().await;
        assert!(!s.farmer.is_empty());
        assert!(!s.fisher.is_empty());
    }
}
