//! Formatting helpers for the stats panel.
//!
//! All functions are pure. Durations use the coarsest unit that keeps the
//! value at least one, rounded to the nearest whole unit.

const WEEK: f64 = 604_800.0;
const DAY: f64 = 86_400.0;
const HOUR: f64 = 3_600.0;
const MINUTE: f64 = 60.0;

/// Format a duration in seconds.
///
/// `"2 wk"`, `"1 dy"`, `"5 hr"`, `"12 min"`, `"45 sec"`. Unit boundaries are
/// exclusive: exactly one day is still shown as `"24 hr"`.
pub fn format_duration(secs: f64) -> String {
    if secs > WEEK {
        format!("{} wk", round(secs / WEEK))
    } else if secs > DAY {
        format!("{} dy", round(secs / DAY))
    } else if secs > HOUR {
        format!("{} hr", round(secs / HOUR))
    } else if secs > MINUTE {
        format!("{} min", round(secs / MINUTE))
    } else {
        format!("{} sec", round(secs))
    }
}

/// Format a 0..1 ratio as an integer percentage: `0.5` -> `"50%"`.
pub fn format_ratio(ratio: f64) -> String {
    format!("{}%", round(ratio * 100.0))
}

/// Format a count. Whole numbers drop the fractional part.
pub fn format_count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Round half away from zero.
fn round(value: f64) -> i64 {
    value.round() as i64
}
