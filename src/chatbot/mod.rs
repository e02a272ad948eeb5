//! Keyword chatbot for farmers and fishers.
//!
//! All matching is done against the fixed tables in [`ChatbotTables`]; the
//! only data-driven part is the suitability assessment, which runs the
//! day-of-year window over fetched history.

pub mod assess;
pub mod intent;
pub mod respond;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::power::{endpoints, DateRange, Location, PowerError, SeriesSource};

pub use assess::assess_conditions;
pub use intent::analyze_query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Farmer,
    Fisher,
    General,
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserType::Farmer => write!(f, "farmer"),
            UserType::Fisher => write!(f, "fisher"),
            UserType::General => write!(f, "general"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SuitabilityCheck,
    TimingAdvice,
    OptimalTiming,
    RiskAssessment,
    GeneralAdvice,
}

/// Weather quantity a threshold applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Precipitation,
    Wind,
    Humidity,
}

impl Quantity {
    pub fn for_parameter(parameter: &str) -> Option<Self> {
        match parameter {
            endpoints::T2M | endpoints::T2M_MAX | endpoints::T2M_MIN => Some(Quantity::Temperature),
            endpoints::PRECTOTCORR => Some(Quantity::Precipitation),
            endpoints::WS10M | endpoints::WS10M_MAX => Some(Quantity::Wind),
            endpoints::RH2M => Some(Quantity::Humidity),
            _ => None,
        }
    }

    /// Unit values are reported in after conversion
    pub fn unit(self) -> &'static str {
        match self {
            Quantity::Temperature => "°C",
            Quantity::Precipitation => "mm",
            Quantity::Wind => "km/h",
            Quantity::Humidity => "%",
        }
    }
}

/// Acceptable range (inclusive) for one quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdBand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ThresholdBand {
    pub const fn range(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub const fn at_most(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }
}

/// Per-activity limits. Wind in km/h, precipitation in mm/day.
#[derive(Debug, Clone, Default)]
pub struct ActivityThresholds {
    pub temperature: Option<ThresholdBand>,
    pub precipitation: Option<ThresholdBand>,
    pub wind: Option<ThresholdBand>,
    pub humidity: Option<ThresholdBand>,
}

impl ActivityThresholds {
    pub fn get(&self, quantity: Quantity) -> Option<&ThresholdBand> {
        match quantity {
            Quantity::Temperature => self.temperature.as_ref(),
            Quantity::Precipitation => self.precipitation.as_ref(),
            Quantity::Wind => self.wind.as_ref(),
            Quantity::Humidity => self.humidity.as_ref(),
        }
    }
}

/// Well-known place the bot can resolve by name
#[derive(Debug, Clone)]
pub struct NamedPlace {
    pub key: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

/// Immutable keyword lists and rule tables driving the chatbot
#[derive(Debug, Clone)]
pub struct ChatbotTables {
    pub farmer_keywords: Vec<&'static str>,
    pub fisher_keywords: Vec<&'static str>,
    /// Activities that only make sense with a location attached
    pub location_activities: Vec<&'static str>,
    pub stopwords: Vec<&'static str>,
    /// Tried in order; group 1 is the place name
    pub location_patterns: Vec<Regex>,
    pub farmer: ActivityThresholds,
    pub fisher: ActivityThresholds,
    pub places: Vec<NamedPlace>,
    /// Half-window around the target date, in days
    pub window_days: u32,
}

impl Default for ChatbotTables {
    fn default() -> Self {
        let location_patterns = [
            r"\bin\s+([a-z][a-z\s]*)",
            r"\bat\s+([a-z][a-z\s]*)",
            r"\bnear\s+([a-z][a-z\s]*)",
            r"\baround\s+([a-z][a-z\s]*)",
            r"([a-z][a-z\s]*?)\s+area\b",
            r"([a-z][a-z\s]*?)\s+region\b",
        ]
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Skipping location pattern {}: {}", p, e);
                None
            }
        })
        .collect();

        Self {
            farmer_keywords: vec![
                "farmer", "farming", "farm", "crop", "plant", "harvest", "agriculture",
                "irrigation", "field", "grow", "cultivate", "seed",
            ],
            fisher_keywords: vec![
                "fisher", "fishing", "fish", "boat", "sea", "ocean", "cruise", "maritime",
                "sail", "angler", "coastal", "offshore",
            ],
            location_activities: vec!["farm", "fish", "cruise", "sail", "plant", "harvest", "boat"],
            stopwords: vec!["the", "my", "this", "that", "our", "here"],
            location_patterns,
            farmer: ActivityThresholds {
                temperature: Some(ThresholdBand::range(10.0, 35.0)),
                precipitation: Some(ThresholdBand::range(0.0, 15.0)),
                wind: Some(ThresholdBand::at_most(25.0)),
                humidity: Some(ThresholdBand::range(30.0, 85.0)),
            },
            fisher: ActivityThresholds {
                temperature: Some(ThresholdBand::range(0.0, 45.0)),
                precipitation: Some(ThresholdBand::at_most(8.0)),
                wind: Some(ThresholdBand::at_most(20.0)),
                humidity: None,
            },
            places: vec![
                NamedPlace { key: "sharm el sheikh", name: "Sharm El Sheikh, Egypt", lat: 27.9158, lon: 34.3300 },
                NamedPlace { key: "alexandria", name: "Alexandria, Egypt", lat: 31.2001, lon: 29.9187 },
                NamedPlace { key: "hurghada", name: "Hurghada, Egypt", lat: 27.2574, lon: 33.8129 },
                NamedPlace { key: "red sea", name: "Red Sea, Egypt", lat: 27.9158, lon: 34.3300 },
                NamedPlace { key: "cairo", name: "Cairo, Egypt", lat: 30.0444, lon: 31.2357 },
                NamedPlace { key: "luxor", name: "Luxor, Egypt", lat: 25.6872, lon: 32.6396 },
                NamedPlace { key: "aswan", name: "Aswan, Egypt", lat: 24.0889, lon: 32.8998 },
                NamedPlace { key: "giza", name: "Giza, Egypt", lat: 30.0131, lon: 31.2089 },
            ],
            window_days: 15,
        }
    }
}

impl ChatbotTables {
    /// Thresholds for a user type; general users have none
    pub fn thresholds(&self, user_type: UserType) -> Option<&ActivityThresholds> {
        match user_type {
            UserType::Farmer => Some(&self.farmer),
            UserType::Fisher => Some(&self.fisher),
            UserType::General => None,
        }
    }

    /// POWER parameters fetched for a user type
    pub fn parameters(&self, user_type: UserType) -> &'static [&'static str] {
        match user_type {
            UserType::Farmer => &[
                endpoints::T2M_MAX,
                endpoints::T2M_MIN,
                endpoints::PRECTOTCORR,
                endpoints::WS10M,
                endpoints::RH2M,
            ],
            UserType::Fisher => &[
                endpoints::WS10M,
                endpoints::PRECTOTCORR,
                endpoints::T2M,
                endpoints::WS10M_MAX,
            ],
            UserType::General => &[endpoints::T2M, endpoints::PRECTOTCORR, endpoints::WS10M],
        }
    }
}

/// A location as the web client sends it: coordinates, a name, or both
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, alias = "lon", skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatLocation {
    pub fn coordinates(&self) -> Option<Location> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Location::new(lat, lng)),
            _ => None,
        }
    }

    /// Place name, or "lat°, lon°" when unnamed
    pub fn label(&self) -> String {
        match (&self.name, self.lat, self.lng) {
            (Some(name), _, _) => name.clone(),
            (None, Some(lat), Some(lng)) => format!("{:.2}°, {:.2}°", lat, lng),
            _ => "your location".to_string(),
        }
    }
}

/// What the client remembers from earlier turns
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationContext {
    #[serde(default)]
    pub user_type: Option<UserType>,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid coordinates. Latitude must be between -90 and 90, longitude between -180 and 180.")]
    InvalidCoordinates,

    #[error("Weather data unavailable: {0}")]
    Fetch(#[from] PowerError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub location: Option<ChatLocation>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub context: Option<ConversationContext>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub user_type: Option<UserType>,
    pub intent: Intent,
    pub needs_location: bool,
    pub extracted_location: Option<ChatLocation>,
}

/// Answer one chat turn: classify, resolve a location, assess, and phrase the reply.
///
/// Without usable coordinates the reply is a prompt for a location, and
/// `needs_location` reports whether the query named a location-bound
/// activity. A failed assessment is reported in the reply text rather than
/// as an error.
pub async fn respond<S: SeriesSource>(
    source: &S,
    tables: &ChatbotTables,
    history: DateRange,
    request: &ChatRequest,
    today: NaiveDate,
) -> ChatReply {
    let analysis = analyze_query(
        tables,
        &request.query,
        request.location.as_ref(),
        request.context.as_ref(),
    );

    let resolved = request
        .location
        .iter()
        .chain(analysis.extracted_location.iter())
        .find_map(|l| l.coordinates().map(|c| (l, c)));

    let Some((place, location)) = resolved else {
        return ChatReply {
            response: respond::location_prompt(analysis.user_type, analysis.extracted_location.as_ref()),
            user_type: analysis.user_type,
            intent: analysis.intent,
            needs_location: analysis.needs_location,
            extracted_location: analysis.extracted_location,
        };
    };

    let user_type = analysis.user_type.unwrap_or(UserType::General);
    let target_date = request.target_date.unwrap_or(today);
    info!(
        "Chat: {} asking for {:?} at {} on {}",
        user_type, analysis.intent, place.label(), target_date
    );

    let response =
        match assess_conditions(source, tables, history, user_type, location, target_date).await {
            Ok(weather) => respond::generate_response(&weather, analysis.intent, &place.label()),
            Err(e) => {
                warn!("Chat assessment failed: {}", e);
                respond::error_response(&e.to_string())
            }
        };

    ChatReply {
        response,
        user_type: analysis.user_type,
        intent: analysis.intent,
        needs_location: false,
        extracted_location: analysis.extracted_location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::mock::StaticSource;

    fn history() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(1981, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    /// Mild conditions around late June for every parameter the bot asks for
    fn calm_source() -> StaticSource {
        let days: Vec<NaiveDate> = (2000..2005)
            .flat_map(|y| (175..=185).map(move |d| NaiveDate::from_yo_opt(y, d).unwrap()))
            .collect();
        let constant = |v: f64| days.iter().map(|&d| (d, v)).collect::<Vec<_>>();
        StaticSource::new()
            .with_series("T2M_MAX", constant(24.0))
            .with_series("T2M_MIN", constant(18.0))
            .with_series("T2M", constant(22.0))
            .with_series("PRECTOTCORR", constant(1.0))
            .with_series("WS10M", constant(2.0))
            .with_series("WS10M_MAX", constant(4.0))
            .with_series("RH2M", constant(55.0))
    }

    fn request(query: &str, location: Option<ChatLocation>) -> ChatRequest {
        ChatRequest {
            query: query.to_string(),
            location,
            target_date: None,
            context: None,
        }
    }

    #[tokio::test]
    async fn test_prompts_for_location() {
        let source = calm_source();
        let tables = ChatbotTables::default();
        let reply = respond(&source, &tables, history(), &request("should I plant my crops?", None), today()).await;
        assert!(reply.needs_location);
        assert_eq!(reply.user_type, Some(UserType::Farmer));
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_prompt_without_activity_does_not_demand_location() {
        let source = calm_source();
        let tables = ChatbotTables::default();
        let reply = respond(&source, &tables, history(), &request("what's the weather like tomorrow", None), today()).await;
        assert!(!reply.needs_location);
        assert_eq!(reply.intent, Intent::GeneralAdvice);
        assert!(reply.response.contains("latitude, longitude"), "{}", reply.response);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_known_place_is_assessed() {
        let source = calm_source();
        let tables = ChatbotTables::default();
        let reply = respond(
            &source,
            &tables,
            history(),
            &request("I'm a farmer in Cairo, is it good to harvest?", None),
            today(),
        )
        .await;
        assert!(!reply.needs_location);
        assert_eq!(reply.intent, Intent::SuitabilityCheck);
        assert!(reply.response.contains("Cairo, Egypt"), "{}", reply.response);
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provided_coordinates_win() {
        let source = calm_source();
        let tables = ChatbotTables::default();
        let location = ChatLocation { lat: Some(27.25), lng: Some(33.81), name: None };
        let reply = respond(&source, &tables, history(), &request("safe to go fishing?", Some(location)), today()).await;
        assert_eq!(reply.user_type, Some(UserType::Fisher));
        assert!(reply.response.contains("27.25°, 33.81°"), "{}", reply.response);
        let calls = source.calls.lock().unwrap();
        assert_eq!(calls[0].0, Location::new(27.25, 33.81));
    }

    #[tokio::test]
    async fn test_fetch_failure_becomes_message() {
        let source = StaticSource::failing();
        let tables = ChatbotTables::default();
        let reply = respond(&source, &tables, history(), &request("fishing near alexandria?", None), today()).await;
        assert!(!reply.needs_location);
        assert!(reply.response.contains("Sorry"), "{}", reply.response);
    }

    #[tokio::test]
    async fn test_invalid_coordinates() {
        let source = calm_source();
        let tables = ChatbotTables::default();
        let location = ChatLocation { lat: Some(120.0), lng: Some(10.0), name: None };
        let reply = respond(&source, &tables, history(), &request("is it good to farm?", Some(location)), today()).await;
        assert!(reply.response.contains("Invalid coordinates"), "{}", reply.response);
        assert_eq!(source.call_count(), 0);
    }

    #[test]
    fn test_location_label() {
        let named = ChatLocation { lat: Some(1.0), lng: Some(2.0), name: Some("Giza".into()) };
        assert_eq!(named.label(), "Giza");
        let bare = ChatLocation { lat: Some(30.04441), lng: Some(31.2357), name: None };
        assert_eq!(bare.label(), "30.04°, 31.24°");
    }

    #[test]
    fn test_chat_location_accepts_lon_alias() {
        let loc: ChatLocation = serde_json::from_str(r#"{"lat": 1.5, "lon": 2.5}"#).unwrap();
        assert_eq!(loc.coordinates(), Some(Location::new(1.5, 2.5)));
    }

    #[test]
    fn test_default_tables_compile_patterns() {
        assert_eq!(ChatbotTables::default().location_patterns.len(), 6);
    }
}
