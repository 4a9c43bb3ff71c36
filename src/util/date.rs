use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

/// Day zero of the spreadsheet serial date system (1900 system, with the
/// Lotus leap-year bug already folded in).
fn serial_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Largest serial a spreadsheet can represent (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Smallest serial accepted from a due-date cell (1950-01-01). Bare years and
/// small counts are not dates.
const MIN_DUE_SERIAL: f64 = 18_264.0;

/// Convert a spreadsheet serial date (days since the epoch, fraction is the
/// time of day) into a datetime.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let millis = (serial * 86_400_000.0).round() as i64;
    serial_epoch().checked_add_signed(Duration::milliseconds(millis))
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse a due-date cell down to its calendar date, discarding any time of day.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }

    value
        .parse::<f64>()
        .ok()
        .filter(|serial| *serial >= MIN_DUE_SERIAL)
        .and_then(serial_to_datetime)
        .map(|dt| dt.date())
}
