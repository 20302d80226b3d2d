use chrono::SecondsFormat;
use chrono::Utc;

/// Fixed-width UTC RFC 3339 with microseconds, e.g.
/// `2025-01-01T12:00:00.000000Z`. Equal-width strings sort chronologically.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `YYYYMMDD_HHMMSS` component of recording file names.
pub(crate) fn file_stamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}
