use chrono::{DateTime, Local, Utc};
use serde::Serialize;

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

/// "Friday, 16 October" in local time.
pub(crate) fn format_day(now: DateTime<Local>) -> String {
    now.format("%A, %d %B").to_string()
}

/// Wall-clock time of an entry, local time, 24h.
pub(crate) fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

/// Whole-number quantity for display.
pub(crate) fn whole(v: f64) -> String {
    let v = no_neg_zero(v);
    format!("{v:.0}")
}
