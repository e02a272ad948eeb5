mod analysis;
mod chatbot;
mod config;
mod power;
mod server;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::analysis::{ClimatologyRequest, ProbabilityRequest, TrendRequest};
use crate::chatbot::{ChatLocation, ChatRequest, ChatbotTables};
use crate::config::{AppConfig, CONFIG_FILE};
use crate::power::{Location, PowerClient};
use crate::stats::Comparison;

#[derive(Parser)]
#[command(name = "tempestra", about = "Climate likelihoods from NASA POWER daily history")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address, overrides config
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Probability that a variable exceeds a threshold near a date
    Probability {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Target date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,
        /// POWER parameter, e.g. T2M_MAX
        #[arg(short, long, default_value = "T2M_MAX")]
        var: String,
        #[arg(short, long, allow_hyphen_values = true)]
        threshold: f64,
        /// gt or lt
        #[arg(long, default_value = "gt")]
        comparison: Comparison,
        /// Days either side of the target day-of-year
        #[arg(short, long)]
        window: Option<u32>,
    },
    /// Day-of-year climatology table
    Climatology {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(short, long, default_value = "T2M_MAX")]
        var: String,
        /// Only print days-of-year in this range, e.g. 150-200
        #[arg(long)]
        days: Option<String>,
    },
    /// Year-by-year exceedance rate with Sen's slope and Mann-Kendall test
    Trend {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(short, long)]
        date: NaiveDate,
        #[arg(short, long, default_value = "T2M_MAX")]
        var: String,
        #[arg(short, long, allow_hyphen_values = true)]
        threshold: f64,
        #[arg(long, default_value = "gt")]
        comparison: Comparison,
        #[arg(short, long)]
        window: Option<u32>,
    },
    /// Ask the farming/fishing assistant a question
    Chat {
        query: String,
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

fn location(lat: f64, lon: f64) -> Result<Location> {
    let location = Location::new(lat, lon);
    anyhow::ensure!(
        location.is_valid(),
        "Invalid coordinates {}, {}: lat must be in [-90, 90] and lon in [-180, 180]",
        lat,
        lon
    );
    Ok(location)
}

fn parse_day_range(days: &str) -> Result<(u32, u32)> {
    let (from, to) = days
        .split_once('-')
        .with_context(|| format!("Expected FROM-TO, got '{}'", days))?;
    let from: u32 = from.trim().parse().context("Invalid start day")?;
    let to: u32 = to.trim().parse().context("Invalid end day")?;
    Ok((from, to))
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tempestra=info,tower_http=info".into()),
        )
        .init();

    // Load .env if present (override system env vars)
    dotenvy::dotenv_override().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    let client = PowerClient::new(&config.power)?;
    let history = analysis::history_range(&config.analysis, Utc::now().date_naive());

    match cli.command {
        Commands::Serve { bind } => {
            let mut server_config = config.server.clone();
            if let Some(bind) = bind {
                server_config.bind = bind;
            }
            info!(
                "Starting tempestra API (history from {}, POWER at {})",
                config.analysis.history_start, config.power.base_url
            );
            let state = Arc::new(server::AppState::new(
                client,
                config.analysis.clone(),
                ChatbotTables::default(),
            ));
            server::serve(state, &server_config).await?;
        }
        Commands::Probability { lat, lon, date, var, threshold, comparison, window } => {
            let window_days = window.unwrap_or(config.analysis.default_window_days);
            anyhow::ensure!(
                window_days <= config.analysis.max_window_days,
                "window must be at most {} days",
                config.analysis.max_window_days
            );
            let req = ProbabilityRequest {
                location: location(lat, lon)?,
                target_date: date,
                variable: var,
                threshold,
                comparison,
                window_days,
            };
            let r = analysis::probability(&client, history, &req).await?;

            println!(
                "\nP({} {} {}{}) near {} at {:.4}, {:.4}",
                req.variable,
                comparison.symbol(),
                threshold,
                r.units.unwrap_or(""),
                date,
                lat,
                lon
            );
            println!("{}", "-".repeat(60));
            if r.n_samples == 0 {
                println!("No samples in window; probability undefined");
            } else {
                println!("Probability:    {:>7.1}%", r.probability * 100.0);
                println!(
                    "95% CI:         {:>7.1}% - {:.1}%",
                    r.ci_95[0] * 100.0,
                    r.ci_95[1] * 100.0
                );
            }
            println!("Samples:        {:>7}", r.n_samples);
            println!("Period:         {:>7}", r.period);
            println!("Method:         {}", r.method);
        }
        Commands::Climatology { lat, lon, var, days } => {
            let req = ClimatologyRequest {
                location: location(lat, lon)?,
                variable: var,
                window_days: config.analysis.default_window_days,
            };
            let (from, to) = match days.as_deref() {
                Some(d) => parse_day_range(d)?,
                None => (1, stats::MAX_DOY),
            };
            let r = analysis::climatology(&client, history, &req).await?;

            println!(
                "\n{} climatology at {:.4}, {:.4} ({}, {})",
                req.variable,
                lat,
                lon,
                r.period,
                r.units.unwrap_or("?")
            );
            println!("{:>5} {:>9} {:>9} {:>9} {:>9}", "DOY", "Mean", "Median", "P10", "P90");
            println!("{}", "-".repeat(45));
            for i in 0..r.doy.len() {
                if r.doy[i] < from || r.doy[i] > to {
                    continue;
                }
                println!(
                    "{:>5} {:>9} {:>9} {:>9} {:>9}",
                    r.doy[i],
                    fmt_opt(r.mean[i]),
                    fmt_opt(r.median[i]),
                    fmt_opt(r.p10[i]),
                    fmt_opt(r.p90[i])
                );
            }
        }
        Commands::Trend { lat, lon, date, var, threshold, comparison, window } => {
            let req = TrendRequest {
                location: location(lat, lon)?,
                target_date: date,
                variable: var,
                threshold,
                comparison,
                window_days: window.unwrap_or(config.analysis.default_window_days),
            };
            let r = analysis::trend(&client, history, &req).await?;

            println!(
                "\nAnnual rate of {} {} {} near {} ({})",
                req.variable,
                comparison.symbol(),
                threshold,
                date.format("%b %d"),
                r.period
            );
            println!("{:>6} {:>8}", "Year", "Rate");
            println!("{}", "-".repeat(15));
            for (year, rate) in r.years.iter().zip(&r.values) {
                println!("{:>6} {:>7.1}%", year, rate * 100.0);
            }
            println!("{}", "-".repeat(15));
            println!("Sen's slope:     {:+.5}/yr", r.trend_slope_per_year);
            println!("Mann-Kendall S:  {:>8}", r.mann_kendall_s);
            println!("Mann-Kendall Z:  {:>8.3}", r.mann_kendall_z);
            println!("p-value:         {:>8.4}", r.p_value);
        }
        Commands::Chat { query, lat, lon, date } => {
            let place = match (lat, lon) {
                (Some(lat), Some(lng)) => Some(ChatLocation { lat: Some(lat), lng: Some(lng), name: None }),
                _ => None,
            };
            let req = ChatRequest {
                query,
                location: place,
                target_date: date,
                context: None,
            };
            let tables = ChatbotTables::default();
            let reply =
                chatbot::respond(&client, &tables, history, &req, Utc::now().date_naive()).await;

            if let Some(user_type) = reply.user_type {
                info!("Detected {} asking for {:?}", user_type, reply.intent);
            }
            println!("\n{}\n", reply.response);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day_range() {
        assert_eq!(parse_day_range("150-200").unwrap(), (150, 200));
        assert_eq!(parse_day_range(" 1 - 31 ").unwrap(), (1, 31));
        assert!(parse_day_range("150").is_err());
        assert!(parse_day_range("a-b").is_err());
    }

    #[test]
    fn test_location_validation() {
        assert!(location(30.0, 31.0).is_ok());
        assert!(location(-91.0, 31.0).is_err());
    }

    #[test]
    fn test_cli_parses_probability() {
        let cli = Cli::try_parse_from([
            "tempestra", "probability", "--lat", "-33.9", "--lon", "18.4", "--date", "2025-01-15",
            "--threshold", "30", "--comparison", "lt",
        ])
        .unwrap();
        match cli.command {
            Commands::Probability { lat, comparison, var, window, .. } => {
                assert_eq!(lat, -33.9);
                assert_eq!(comparison, Comparison::Lt);
                assert_eq!(var, "T2M_MAX");
                assert_eq!(window, None);
            }
            _ => panic!("expected probability"),
        }
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
    }
}
