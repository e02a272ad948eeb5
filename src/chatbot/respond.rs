use serde::Serialize;

use super::assess::{ParameterAnalysis, Suitability, WeatherAnalysis};
use super::{ChatLocation, Intent, UserType};
use crate::power::endpoints;

pub fn generate_response(analysis: &WeatherAnalysis, intent: Intent, place: &str) -> String {
    match intent {
        Intent::SuitabilityCheck | Intent::GeneralAdvice => suitability_response(analysis, place),
        Intent::TimingAdvice => timing_response(analysis),
        Intent::OptimalTiming => optimal_timing_response(analysis.user_type),
        Intent::RiskAssessment => risk_response(analysis),
    }
}

fn suitability_response(analysis: &WeatherAnalysis, place: &str) -> String {
    let (title, lines) = match analysis.user_type {
        UserType::Farmer => ("Farming outlook", farmer_lines(analysis)),
        UserType::Fisher => ("Fishing outlook", fisher_lines(analysis)),
        UserType::General => ("Weather outlook", general_lines(analysis)),
    };
    let header = format!("**{} for {} on {}**", title, place, analysis.target_date);

    if analysis.parameters.is_empty() {
        return format!(
            "{}\n\nNo historical observations fall near this date, so I can't assess it. Please try another date.",
            header
        );
    }

    let mut parts = vec![header];
    parts.extend(lines);
    parts.push(overall_verdict(analysis.user_type, analysis.overall_suitability()));
    parts.join("\n\n")
}

/// Pick the line matching a parameter's grade
fn graded(p: &ParameterAnalysis, excellent: String, good: String, poor: String) -> String {
    match p.suitability {
        Suitability::Excellent => excellent,
        Suitability::Good | Suitability::Unknown => good,
        Suitability::Poor => poor,
    }
}

fn farmer_lines(analysis: &WeatherAnalysis) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(p) = analysis.parameter(endpoints::PRECTOTCORR) {
        lines.push(graded(
            p,
            format!("**Rain**: about {:.1} mm/day, ideal for crop growth.", p.mean),
            format!("**Rain**: about {:.1} mm/day, workable for field activities.", p.mean),
            format!("**Rain**: about {:.1} mm/day, outside the comfortable range. Plan irrigation or drainage.", p.mean),
        ));
    }
    if let Some(p) = analysis.parameter(endpoints::T2M_MAX) {
        lines.push(graded(
            p,
            format!("**Temperature**: highs around {:.1}°C, very comfortable for field work.", p.mean),
            format!("**Temperature**: highs around {:.1}°C, fine for farming.", p.mean),
            format!("**Temperature**: highs around {:.1}°C, protect crops and workers from temperature stress.", p.mean),
        ));
    }
    if let Some(p) = analysis.parameter(endpoints::WS10M) {
        lines.push(graded(
            p,
            format!("**Wind**: light at {:.1} km/h, good for spraying.", p.mean),
            format!("**Wind**: {:.1} km/h, fine for most tasks.", p.mean),
            format!("**Wind**: strong at {:.1} km/h, avoid spraying and secure equipment.", p.mean),
        ));
    }
    if let Some(p) = analysis.parameter(endpoints::RH2M) {
        lines.push(graded(
            p,
            format!("**Humidity**: {:.0}%, a healthy range for crops.", p.mean),
            format!("**Humidity**: {:.0}%, acceptable.", p.mean),
            format!("**Humidity**: {:.0}%, watch for disease or drought stress.", p.mean),
        ));
    }
    lines
}

fn fisher_lines(analysis: &WeatherAnalysis) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(p) = analysis.parameter(endpoints::WS10M) {
        lines.push(graded(
            p,
            format!("**Wind**: light at {:.1} km/h, safe for small boats.", p.mean),
            format!("**Wind**: {:.1} km/h, fishable with care.", p.mean),
            format!("**Wind**: strong at {:.1} km/h, stay in sheltered water or ashore.", p.mean),
        ));
    }
    if let Some(p) = analysis.parameter(endpoints::WS10M_MAX) {
        if p.suitability == Suitability::Poor {
            lines.push(format!("**Gusts**: peaks up to {:.1} km/h have been recorded around this date.", p.max));
        }
    }
    if let Some(p) = analysis.parameter(endpoints::PRECTOTCORR) {
        lines.push(graded(
            p,
            format!("**Rain**: about {:.1} mm/day, clear and good visibility.", p.mean),
            format!("**Rain**: about {:.1} mm/day, light showers possible.", p.mean),
            format!("**Rain**: about {:.1} mm/day, heavy rain likely. Consider waiting.", p.mean),
        ));
    }
    if let Some(p) = analysis.parameter(endpoints::T2M) {
        lines.push(graded(
            p,
            format!("**Temperature**: around {:.1}°C, comfortable on the water.", p.mean),
            format!("**Temperature**: around {:.1}°C.", p.mean),
            format!("**Temperature**: around {:.1}°C, dress for extreme conditions.", p.mean),
        ));
    }
    lines
}

fn general_lines(analysis: &WeatherAnalysis) -> Vec<String> {
    analysis
        .parameters
        .iter()
        .map(|p| {
            format!(
                "**{}**: mean {:.1} {} (range {:.1} to {:.1}) from {} days",
                p.parameter, p.mean, p.unit, p.min, p.max, p.sample_count
            )
        })
        .collect()
}

fn overall_verdict(user_type: UserType, score: f64) -> String {
    let activity = match user_type {
        UserType::Farmer => "farming",
        UserType::Fisher => "fishing",
        UserType::General => "outdoor plans",
    };
    if score >= 0.8 {
        format!("**Overall**: excellent conditions for {}.", activity)
    } else if score >= 0.6 {
        format!("**Overall**: generally good for {}, but keep an eye on the forecast.", activity)
    } else {
        format!("**Overall**: challenging conditions for {}. Consider postponing or take extra precautions.", activity)
    }
}

fn timing_response(analysis: &WeatherAnalysis) -> String {
    let score = analysis.overall_suitability();
    let date = analysis.target_date;
    if score >= 0.7 {
        format!("**Timing**: {} looks favourable. No need to delay.", date)
    } else if score >= 0.5 {
        format!("**Timing**: {} is acceptable, though waiting a few days may bring better conditions.", date)
    } else {
        format!("**Timing**: conditions around {} are usually poor. I'd delay if you can.", date)
    }
}

fn optimal_timing_response(user_type: UserType) -> String {
    match user_type {
        UserType::Fisher => "**Best timing**: early morning and late afternoon are usually best. Look for winds under 10 km/h, little rain and a stable pattern.".to_string(),
        _ => "**Best timing**: spring and early autumn usually suit field work. Look for highs of 15-25°C, winds under 15 km/h and 5-15 mm of rain.".to_string(),
    }
}

fn risk_response(analysis: &WeatherAnalysis) -> String {
    let score = analysis.overall_suitability();
    let date = analysis.target_date;
    if score >= 0.8 {
        format!("**Risk**: low for {}. Historical conditions are favourable.", date)
    } else if score >= 0.6 {
        format!("**Risk**: moderate for {}. Take care and watch the forecast.", date)
    } else {
        format!("**Risk**: high for {}. Consider postponing or take extra safety precautions.", date)
    }
}

pub fn error_response(message: &str) -> String {
    format!(
        "**Sorry, something went wrong**: {}\n\nPlease try again, and check that the coordinates are valid.",
        message
    )
}

pub fn location_prompt(user_type: Option<UserType>, extracted: Option<&ChatLocation>) -> String {
    let (activity, example) = match user_type {
        Some(UserType::Farmer) => ("farming", "'I'm farming in Cairo' or '30.0444, 31.2357'"),
        Some(UserType::Fisher) => ("fishing", "'I'm fishing near Alexandria' or '31.2001, 29.9187'"),
        _ => ("weather", "'Weather in Luxor' or '25.6872, 32.6396'"),
    };
    match extracted.and_then(|l| l.name.as_deref()) {
        Some(name) => format!(
            "I understand you're asking about {} in {}, but I don't know where that is. Please send its coordinates as 'latitude, longitude' or name a nearby city.",
            activity, name
        ),
        None => format!(
            "I can help with {} advice once I know where you are. Tell me the city or area, or send coordinates as 'latitude, longitude'. For example: {}.",
            activity, example
        ),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestions {
    pub farmer: Vec<&'static str>,
    pub fisher: Vec<&'static str>,
    pub general: Vec<&'static str>,
}

/// Example questions shown by the web client
pub fn suggestions() -> Suggestions {
    Suggestions {
        farmer: vec![
            "I'm a farmer in Cairo. Is it a good time to plant?",
            "Should I delay the harvest near Luxor?",
            "When is the best time to irrigate my crops?",
            "What's the risk of heavy rain for my farm in Giza?",
        ],
        fisher: vec![
            "I'm a fisher in Alexandria. Is it safe to go out?",
            "Are winds calm enough for my boat near Hurghada?",
            "When is the best time for fishing in the Red Sea?",
            "Should I postpone my fishing trip at Sharm El Sheikh?",
        ],
        general: vec![
            "What's the weather usually like in Aswan this week?",
            "Is it a good day for outdoor activities in Cairo?",
            "30.0444, 31.2357",
        ],
    }
}
