use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Lenient RFC 3339 parse. Malformed timestamps normalize to `None` so a
/// bad record degrades a metric instead of failing the whole computation.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc))
}

pub fn parse_opt_datetime(value: &Option<String>) -> Option<DateTime<Utc>> {
    value.as_deref().and_then(parse_datetime)
}

/// Calendar day of an optional timestamp, if it parses.
pub fn date_of(value: &Option<String>) -> Option<NaiveDate> {
    parse_opt_datetime(value).map(|dt| dt.date_naive())
}

/// Accepts either a plain `YYYY-MM-DD` date or a full RFC 3339 timestamp.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(value).map(|dt| dt.date_naive()))
}

pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

pub fn day_end(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).unwrap())
}
