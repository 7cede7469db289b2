use chrono::{Duration, NaiveDate};

/// Accepted day-first layouts, tried in order
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Spreadsheet serial day count range (1900 date system)
const MAX_SERIAL: f64 = 2_958_465.0;

/// Parse a date in ISO, day-first or spreadsheet-serial form
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // ISO date, possibly with a time component
    if let Ok(date) = NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d") {
        return Some(date);
    }

    for format in DAY_FIRST_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    s.parse::<f64>().ok().and_then(serial_to_date)
}

/// Convert a spreadsheet serial to a date (1900 system, Lotus leap-year bug included)
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}

pub fn serial_to_iso(serial: f64) -> Option<String> {
    serial_to_date(serial).map(|d| d.format("%Y-%m-%d").to_string())
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_and_day_first() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15"), Some(expected));
        assert_eq!(parse_date("2024-03-15T10:00:00"), Some(expected));
        assert_eq!(parse_date("15/03/2024"), Some(expected));
        assert_eq!(parse_date("15-03-2024"), Some(expected));
    }

    #[test]
    fn test_serial() {
        assert_eq!(serial_to_iso(45366.0).as_deref(), Some("2024-03-15"));
        assert_eq!(parse_date("45366"), NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_date("31/02/2024"), None);
        assert_eq!(parse_date("ontem"), None);
        assert_eq!(serial_to_iso(0.0), None);
    }
}
