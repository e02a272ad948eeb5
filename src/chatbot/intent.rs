use serde::Serialize;
use tracing::debug;

use super::{ChatLocation, ChatbotTables, ConversationContext, Intent, UserType};
use crate::power::Location;

#[derive(Debug, Clone, Serialize)]
pub struct QueryAnalysis {
    pub user_type: Option<UserType>,
    pub extracted_location: Option<ChatLocation>,
    pub needs_location: bool,
    pub intent: Intent,
}

pub fn analyze_query(
    tables: &ChatbotTables,
    query: &str,
    provided: Option<&ChatLocation>,
    context: Option<&ConversationContext>,
) -> QueryAnalysis {
    // A bare "lat, lon" reply to a location prompt
    if let Some(coords) = parse_coordinates(query) {
        let user_type = context
            .and_then(|c| c.user_type)
            .unwrap_or(UserType::Farmer);
        return QueryAnalysis {
            user_type: Some(user_type),
            extracted_location: Some(ChatLocation {
                lat: Some(coords.lat),
                lng: Some(coords.lon),
                name: None,
            }),
            needs_location: false,
            intent: Intent::SuitabilityCheck,
        };
    }

    let lower = query.to_lowercase();
    let user_type = detect_user_type(tables, &lower).or(context.and_then(|c| c.user_type));
    let extracted_location = extract_location(tables, &lower);
    let needs_location = needs_location(tables, &lower, provided, extracted_location.as_ref());
    let intent = detect_intent(&lower);

    debug!(
        "Query analysis: user_type={:?} intent={:?} location={:?} needs_location={}",
        user_type, intent, extracted_location, needs_location
    );

    QueryAnalysis {
        user_type,
        extracted_location,
        needs_location,
        intent,
    }
}

/// "30.04, 31.23" -> Location. Both parts must be finite numbers.
pub fn parse_coordinates(query: &str) -> Option<Location> {
    let mut parts = query.trim().split(',');
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    let lon: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some(Location::new(lat, lon))
}

/// Explicit self-identification first, then keyword score. Ties give `None`.
pub fn detect_user_type(tables: &ChatbotTables, lower: &str) -> Option<UserType> {
    for prefix in ["i'm a ", "i am a ", "im a "] {
        if lower.contains(&format!("{prefix}farmer")) {
            return Some(UserType::Farmer);
        }
        if lower.contains(&format!("{prefix}fisher")) {
            return Some(UserType::Fisher);
        }
    }

    let farmer = keyword_score(lower, &tables.farmer_keywords);
    let fisher = keyword_score(lower, &tables.fisher_keywords);

    match farmer.cmp(&fisher) {
        std::cmp::Ordering::Greater => Some(UserType::Farmer),
        std::cmp::Ordering::Less => Some(UserType::Fisher),
        std::cmp::Ordering::Equal => None,
    }
}

/// Known place names first, then the free-text patterns
pub fn extract_location(tables: &ChatbotTables, lower: &str) -> Option<ChatLocation> {
    if let Some(place) = tables.places.iter().find(|p| lower.contains(p.key)) {
        return Some(ChatLocation {
            lat: Some(place.lat),
            lng: Some(place.lon),
            name: Some(place.name.to_string()),
        });
    }

    for pattern in &tables.location_patterns {
        let Some(caps) = pattern.captures(lower) else {
            continue;
        };
        let Some(m) = caps.get(1) else {
            continue;
        };
        let mut name = m.as_str().trim();
        // "in the north field" -> "north field"
        if let Some((first, rest)) = name.split_once(' ') {
            if is_stopword(tables, first) {
                name = rest.trim();
            }
        }
        if name.is_empty() || is_stopword(tables, name) {
            continue;
        }
        return Some(ChatLocation {
            lat: None,
            lng: None,
            name: Some(name.to_string()),
        });
    }

    None
}

pub fn needs_location(
    tables: &ChatbotTables,
    lower: &str,
    provided: Option<&ChatLocation>,
    extracted: Option<&ChatLocation>,
) -> bool {
    let has_coordinates = provided
        .into_iter()
        .chain(extracted)
        .any(|l| l.coordinates().is_some());
    if has_coordinates {
        return false;
    }
    tables.location_activities.iter().any(|a| lower.contains(a))
}

pub fn detect_intent(lower: &str) -> Intent {
    if contains_any(lower, &["good", "suitable", "safe"]) {
        Intent::SuitabilityCheck
    } else if contains_any(lower, &["delay", "postpone", "wait"]) {
        Intent::TimingAdvice
    } else if contains_any(lower, &["when", "best time"]) {
        Intent::OptimalTiming
    } else if contains_any(lower, &["risk", "danger"]) {
        Intent::RiskAssessment
    } else {
        Intent::GeneralAdvice
    }
}

fn keyword_score(lower: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| lower.contains(*k)).count()
}

fn contains_any(lower: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lower.contains(w))
}

fn is_stopword(tables: &ChatbotTables, word: &str) -> bool {
    tables.stopwords.iter().any(|s| *s == word)
}
