//! Date helpers for POS exports
//!
//! Point-of-sale exports use Republic-of-China era dates (`YYYMMDD`, where
//! `YYY` = Gregorian year - 1911). History bucketing reads the first three
//! characters as the year and the next two as the month, so imported dates
//! are normalized to that compact form whenever they can be parsed.

use chrono::{Datelike, Duration, NaiveDate};

/// Offset between the Gregorian and ROC calendars
const ROC_OFFSET: i32 = 1911;

/// Parse a date string in any supported POS format
///
/// Accepts ISO (`2024-03-05`, `2024/03/05`), ROC compact (`1130305`,
/// `990305`) and ROC slashed (`113/03/05`).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if d.year() > 1911 {
                return Some(d);
            }
        }
    }

    if s.chars().all(|c| c.is_ascii_digit()) && (s.len() == 6 || s.len() == 7) {
        let (year, rest) = s.split_at(s.len() - 4);
        return roc_parts(year, &rest[..2], &rest[2..]);
    }

    let parts: Vec<&str> = s.split(['/', '-', '.']).collect();
    if parts.len() == 3 && parts[0].len() <= 3 {
        return roc_parts(parts[0], parts[1], parts[2]);
    }

    None
}

fn roc_parts(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year + ROC_OFFSET, month, day)
}

/// Format a date as ROC compact `YYYMMDD`
pub fn to_roc_compact(date: NaiveDate) -> String {
    format!(
        "{:03}{:02}{:02}",
        date.year() - ROC_OFFSET,
        date.month(),
        date.day()
    )
}

/// Normalize a date string to ROC compact form, leaving unparseable input as-is
pub fn normalize_date(s: &str) -> String {
    parse_date(s)
        .map(to_roc_compact)
        .unwrap_or_else(|| s.trim().to_string())
}

/// Convert an Excel serial day number to a date
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Two-digit `MM/DD` display string used for sorting classified rows
pub fn display_date(s: &str) -> String {
    match parse_date(s) {
        Some(d) => format!("{:02}/{:02}", d.month(), d.day()),
        None => s.trim().to_string(),
    }
}

/// ROC year prefix of a stored date (first three characters, digits only)
pub fn year_prefix(date: &str) -> Option<&str> {
    let prefix = date.get(..3)?;
    prefix
        .chars()
        .all(|c| c.is_ascii_digit())
        .then_some(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso() {
        let d = parse_date("2024-03-05").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn test_parse_roc_compact() {
        let d = parse_date("1130305").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());

        let d = parse_date("990101").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_roc_slashed() {
        let d = parse_date("113/12/31").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_date("").is_none());
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("1131345").is_none());
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2024-03-05"), "1130305");
        assert_eq!(normalize_date("1130305"), "1130305");
        assert_eq!(normalize_date("990101"), "0990101");
        assert_eq!(normalize_date("garbage"), "garbage");
    }

    #[test]
    fn test_excel_serial() {
        // 45356 = 2024-03-05
        let d = from_excel_serial(45356.0).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert!(from_excel_serial(0.0).is_none());
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date("1130305"), "03/05");
        assert_eq!(display_date("2024-11-20"), "11/20");
        assert_eq!(display_date("?"), "?");
    }

    #[test]
    fn test_year_prefix() {
        assert_eq!(year_prefix("1130305"), Some("113"));
        assert_eq!(year_prefix("ab30305"), None);
        assert_eq!(year_prefix("12"), None);
    }
}
