//! HTTP API (axum).

pub mod error;
pub mod routes;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analysis;
use crate::chatbot::ChatbotTables;
use crate::config::{AnalysisConfig, ServerConfig};
use crate::power::{DateRange, SeriesSource};

/// Shared state handed to every handler
pub struct AppState<S> {
    pub source: S,
    pub analysis: AnalysisConfig,
    pub tables: ChatbotTables,
}

impl<S: SeriesSource> AppState<S> {
    pub fn new(source: S, analysis: AnalysisConfig, tables: ChatbotTables) -> Self {
        Self { source, analysis, tables }
    }

    /// Configured record start through today (UTC)
    pub fn history(&self) -> DateRange {
        analysis::history_range(&self.analysis, Utc::now().date_naive())
    }
}

/// Routes mounted under `/api`
pub fn api_router<S: SeriesSource>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/probability", get(routes::probability::<S>))
        .route("/climatology", get(routes::climatology::<S>))
        .route("/trend", get(routes::trend::<S>))
        .route("/chatbot", post(routes::chatbot::<S>))
        .route("/chatbot/suggestions", get(routes::chatbot_suggestions))
        .with_state(state)
}

/// Full application: API, optional static frontend, CORS and request tracing
pub fn app<S: SeriesSource>(state: Arc<AppState<S>>, static_dir: Option<&str>) -> Router {
    let mut app = Router::new().nest("/api", api_router(state));

    match static_dir {
        Some(dir) if Path::new(dir).is_dir() => {
            info!("Serving static files from {}", dir);
            app = app.fallback_service(ServeDir::new(dir));
        }
        Some(dir) => warn!("Static directory {} not found, serving API only", dir),
        None => {}
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve<S: SeriesSource>(state: Arc<AppState<S>>, config: &ServerConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state, config.static_dir.as_deref()))
        .await
        .context("HTTP server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::mock::StaticSource;

    #[test]
    fn test_history_ends_today() {
        let state = AppState::new(StaticSource::new(), AnalysisConfig::default(), ChatbotTables::default());
        let range = state.history();
        assert_eq!(range.start, AnalysisConfig::default().history_start);
        assert_eq!(range.end, Utc::now().date_naive());
    }

    #[test]
    fn test_app_builds_without_static_dir() {
        let state = Arc::new(AppState::new(StaticSource::new(), AnalysisConfig::default(), ChatbotTables::default()));
        let _ = app(state, Some("definitely-not-a-directory"));
    }
}
