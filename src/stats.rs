//! Cache server statistics: wire model and rendered panel.
//!
//! The server reports each statistic as a number, but substitutes a string
//! (`"N/A"` or an error message) when a value is unavailable. [`StatValue`]
//! keeps both cases so the panel can show the text instead of a number.

use chrono::{DateTime, Local};
use serde::Deserialize;

use crate::fmt::{format_count, format_duration, format_ratio};

/// Placeholder shown before the first successful refresh.
pub const EMPTY: &str = "-";

/// One statistic as reported by `/stats`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(f64),
    Text(String),
}

impl Default for StatValue {
    fn default() -> Self {
        StatValue::Text("N/A".to_string())
    }
}

impl StatValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Number(n) => Some(*n),
            StatValue::Text(_) => None,
        }
    }

    /// Renders a number with `format`, or passes text through verbatim.
    pub fn render(&self, format: fn(f64) -> String) -> String {
        match self {
            StatValue::Number(n) => format(*n),
            StatValue::Text(text) => text.clone(),
        }
    }
}

/// Response body of `GET /stats`.
///
/// Fields the dashboard does not use (histogram tables, save sizes) are
/// ignored; missing fields decode as `"N/A"`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatsResponse {
    /// Fraction of cached entries that were hit more than once.
    pub total_hit_rate: StatValue,
    pub cached_count: StatValue,
    pub cleaned_count: StatValue,
    pub saved_seconds_ago: StatValue,
    pub uptime_seconds: StatValue,
    pub cleaned_seconds_ago: StatValue,
    pub hit_count: StatValue,
    pub miss_count: StatValue,
    /// Session hit rate: hits / (hits + misses) since server start.
    pub hit_rate: StatValue,
    pub miss_rate: StatValue,
}

impl StatsResponse {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

/// Display strings for the stats panel.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsPanel {
    pub hit_rate: String,
    pub cached_count: String,
    pub cleaned_count: String,
    pub saved_ago: String,
    pub uptime: String,
    pub cleaned_ago: String,
    pub hit_count: String,
    pub miss_count: String,
    pub session_hit_rate: String,
    pub miss_rate: String,
    /// Local time of the refresh that produced these values.
    pub updated_at: Option<DateTime<Local>>,
}

impl Default for StatsPanel {
    fn default() -> Self {
        Self {
            hit_rate: EMPTY.to_string(),
            cached_count: EMPTY.to_string(),
            cleaned_count: EMPTY.to_string(),
            saved_ago: EMPTY.to_string(),
            uptime: EMPTY.to_string(),
            cleaned_ago: EMPTY.to_string(),
            hit_count: EMPTY.to_string(),
            miss_count: EMPTY.to_string(),
            session_hit_rate: EMPTY.to_string(),
            miss_rate: EMPTY.to_string(),
            updated_at: None,
        }
    }
}

impl StatsPanel {
    pub fn from_response(stats: &StatsResponse, updated_at: DateTime<Local>) -> Self {
        Self {
            hit_rate: stats.total_hit_rate.render(format_ratio),
            cached_count: stats.cached_count.render(format_count),
            cleaned_count: stats.cleaned_count.render(format_count),
            saved_ago: stats.saved_seconds_ago.render(format_duration),
            uptime: stats.uptime_seconds.render(format_duration),
            cleaned_ago: stats.cleaned_seconds_ago.render(format_duration),
            hit_count: stats.hit_count.render(format_count),
            miss_count: stats.miss_count.render(format_count),
            session_hit_rate: stats.hit_rate.render(format_ratio),
            miss_rate: stats.miss_rate.render(format_ratio),
            updated_at: Some(updated_at),
        }
    }

    /// Label/value pairs in display order.
    pub fn rows(&self) -> [(&'static str, &str); 10] {
        [
            ("Hit rate", self.hit_rate.as_str()),
            ("Cached", self.cached_count.as_str()),
            ("Cleaned", self.cleaned_count.as_str()),
            ("Saved", self.saved_ago.as_str()),
            ("Uptime", self.uptime.as_str()),
            ("Last cleanup", self.cleaned_ago.as_str()),
            ("Hits", self.hit_count.as_str()),
            ("Misses", self.miss_count.as_str()),
            ("Session hit rate", self.session_hit_rate.as_str()),
            ("Session miss rate", self.miss_rate.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "uptime_seconds": 90061.4,
        "saved_size_bytes": 2048,
        "saved_cache_size": 0,
        "saved_seconds_ago": 45.2,
        "cleaned_seconds_ago": 12.0,
        "total_hit_rate": 0.5,
        "hit_count": 120,
        "hit_rate": 0.8,
        "miss_count": 30,
        "miss_rate": 0.2,
        "cached_count": 1500,
        "cleaned_count": 7,
        "age_days_histogram": {"0": 10, "1": 4},
        "hit_count_histogram": {"1": 12}
    }"#;

    #[test]
    fn test_decode_server_stats() {
        let stats = StatsResponse::from_json(SAMPLE).unwrap();
        assert_eq!(stats.total_hit_rate, StatValue::Number(0.5));
        assert_eq!(stats.cached_count.as_f64(), Some(1500.0));
        assert_eq!(stats.uptime_seconds.as_f64(), Some(90061.4));
    }

    #[test]
    fn test_decode_not_available_values() {
        let body =
            r#"{"total_hit_rate": "N/A", "cached_count": 0, "hit_rate": "division by zero"}"#;
        let stats = StatsResponse::from_json(body).unwrap();
        assert_eq!(stats.total_hit_rate, StatValue::Text("N/A".to_string()));
        assert_eq!(
            stats.hit_rate,
            StatValue::Text("division by zero".to_string())
        );
        // Absent fields fall back to N/A.
        assert_eq!(stats.uptime_seconds, StatValue::default());
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(StatsResponse::from_json("42").is_err());
        assert!(StatsResponse::from_json("not json").is_err());
    }

    #[test]
    fn test_panel_from_response() {
        let stats = StatsResponse::from_json(SAMPLE).unwrap();
        let panel = StatsPanel::from_response(&stats, Local::now());

        assert_eq!(panel.hit_rate, "50%");
        assert_eq!(panel.cached_count, "1500");
        assert_eq!(panel.cleaned_count, "7");
        assert_eq!(panel.saved_ago, "45 sec");
        assert_eq!(panel.uptime, "1 dy");
        assert_eq!(panel.session_hit_rate, "80%");
        assert_eq!(panel.miss_rate, "20%");
        assert!(panel.updated_at.is_some());
    }

    #[test]
    fn test_panel_passes_text_through() {
        let stats = StatsResponse::default();
        let panel = StatsPanel::from_response(&stats, Local::now());
        assert_eq!(panel.hit_rate, "N/A");
        assert_eq!(panel.uptime, "N/A");
    }

    #[test]
    fn test_default_panel_is_blank() {
        let panel = StatsPanel::default();
        assert!(panel.rows().iter().all(|(_, v)| *v == EMPTY));
        assert!(panel.updated_at.is_none());
    }
}
