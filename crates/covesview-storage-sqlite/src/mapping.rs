use chrono::{NaiveDateTime, TimeZone, Utc};
use covesview_core::AppError;

/// Parse a SQLite datetime text string into a chrono DateTime<Utc>.
///
/// SQLite stores datetimes as TEXT in the format produced by
/// `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`, which yields strings like
/// `2025-01-01T00:00:00.000Z`.
pub fn parse_datetime(s: &str) -> Result<chrono::DateTime<Utc>, AppError> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    Err(AppError::Storage(format!("failed to parse datetime: {s}")))
}

pub fn parse_datetime_opt(s: Option<&str>) -> Result<Option<chrono::DateTime<Utc>>, AppError> {
    match s {
        Some(s) => Ok(Some(parse_datetime(s)?)),
        None => Ok(None),
    }
}

pub fn format_datetime(dt: &chrono::DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn parse_json_opt(s: Option<&str>) -> Result<Option<serde_json::Value>, AppError> {
    match s {
        Some(s) => serde_json::from_str(s)
            .map(Some)
            .map_err(|e| AppError::Storage(format!("failed to parse json column: {e}"))),
        None => Ok(None),
    }
}

pub fn format_json_opt(v: &Option<serde_json::Value>) -> Option<String> {
    v.as_ref().map(|v| v.to_string())
}
