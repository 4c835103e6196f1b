//! Date parsing into canonical `YYYY-MM-DD`

use chrono::{DateTime, Datelike, NaiveDate};

/// Accepted input formats, tried in order
///
/// Month-first numeric forms are deliberately absent: "01/10/2024" is read
/// as 1 October.
pub const DATE_FORMATS: [&str; 11] = [
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%d %B %Y",
    "%a, %d %b %Y",
    "%a, %d %b, %Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%d-%m-%Y",
    "%A, %d %B %Y",
    "%A, %B %d, %Y",
];

/// chrono's `%Y` also takes one to three digits; only four-digit years count
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

/// Separators between the two ends of a date range
const RANGE_SEPARATORS: [&str; 3] = [" - ", " – ", " to "];

/// Parse a date string in any supported format
///
/// RFC 3339 timestamps contribute their calendar date. For a range such as
/// "1 October 2024 - 3 October 2024" the start date is used. Returns `None`
/// when nothing matches.
pub fn normalize_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    parse_single(input).or_else(|| {
        RANGE_SEPARATORS
            .iter()
            .find_map(|sep| input.split_once(sep))
            .and_then(|(start, _)| parse_single(start.trim()))
    })
}

fn parse_single(input: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(input, format).ok())
        .find(|date| YEAR_RANGE.contains(&date.year()))
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Canonical text form of a date
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_known_inputs() {
        let expected = ymd(2024, 10, 1);
        for input in [
            "2024-10-01",
            "01/10/2024",
            "October 1, 2024",
            "1 October 2024",
            "Tue, 01 Oct 2024",
            "Tue, 01 Oct, 2024",
            "01 Oct 2024",
            "Oct 01, 2024",
            "01-10-2024",
            "Tuesday, 01 October 2024",
            "Tuesday, October 01, 2024",
            "  2024-10-01  ",
        ] {
            assert_eq!(normalize_date(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_rfc3339_takes_calendar_date() {
        assert_eq!(normalize_date("2024-10-01T23:30:00+10:00"), ymd(2024, 10, 1));
    }

    #[test]
    fn test_range_uses_start() {
        assert_eq!(normalize_date("5 October 2024 - 7 October 2024"), ymd(2024, 10, 5));
    }

    #[test]
    fn test_day_first_is_not_swapped() {
        assert_eq!(normalize_date("02/10/2024"), ymd(2024, 10, 2));
        assert_eq!(normalize_date("10/31/2024"), None);
    }

    #[test]
    fn test_unrecognized_is_none() {
        for input in ["", "soon", "Every Sunday", "32/01/2024", "2024-02-30"] {
            assert_eq!(normalize_date(input), None, "input: {input:?}");
        }
    }

    #[test]
    fn test_short_years_are_none() {
        for input in [
            "01/10/24",
            "1-10-24",
            "24-10-01",
            "1 October 24",
            "Oct 01, 24",
            "01/10/024",
        ] {
            assert_eq!(normalize_date(input), None, "input: {input:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_every_format_round_trips(
            year in 1900i32..2100,
            ordinal in 1u32..=365,
            format_index in 0usize..DATE_FORMATS.len(),
        ) {
            let date = NaiveDate::from_yo_opt(year, ordinal).unwrap();
            let rendered = date.format(DATE_FORMATS[format_index]).to_string();
            prop_assert_eq!(normalize_date(&rendered), Some(date), "rendered: {}", rendered);
        }

        #[test]
        fn prop_canonical_form_is_stable(year in 1900i32..2100, ordinal in 1u32..=365) {
            let date = NaiveDate::from_yo_opt(year, ordinal).unwrap();
            prop_assert_eq!(normalize_date(&format_date(date)), Some(date));
        }
    }
}
