//! Document date parsing and formatting.
//!
//! Accepted input forms:
//! - ISO `YYYY-MM-DD`
//! - `day monthName year`, e.g. `17 Agustus 2025` or `3 march 2024`
//!
//! Month names come from a fixed Indonesian table plus English names,
//! matched case-insensitively.

use chrono::{Datelike, NaiveDate};

use crate::error::LifecycleError;

const INDONESIAN_MONTHS: [&str; 12] = [
    "januari",
    "februari",
    "maret",
    "april",
    "mei",
    "juni",
    "juli",
    "agustus",
    "september",
    "oktober",
    "november",
    "desember",
];

const ENGLISH_MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    INDONESIAN_MONTHS
        .iter()
        .position(|m| *m == name)
        .or_else(|| ENGLISH_MONTHS.iter().position(|m| *m == name))
        .map(|i| i as u32 + 1)
}

/// Parse a document date in one of the accepted forms.
pub fn parse_document_date(input: &str) -> Result<NaiveDate, LifecycleError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(LifecycleError::InvalidInput(
            "document date is required".to_string(),
        ));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }

    let parts: Vec<&str> = input.split_whitespace().collect();
    if let [day, month, year] = parts.as_slice() {
        let day = day.parse::<u32>().ok();
        let month = month_number(month);
        let year = year.parse::<i32>().ok().filter(|y| (1000..=9999).contains(y));
        if let (Some(day), Some(month), Some(year)) = (day, month, year) {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Ok(date);
            }
        }
    }

    Err(LifecycleError::InvalidInput(format!(
        "unrecognised document date '{}' (use YYYY-MM-DD or e.g. '17 Agustus 2025')",
        input
    )))
}

/// Long Indonesian form used in letters, e.g. `17 Agustus 2025`.
pub fn format_long_date(date: NaiveDate) -> String {
    let month = INDONESIAN_MONTHS[date.month0() as usize];
    let mut chars = month.chars();
    let month = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{} {} {}", date.day(), month, date.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_iso() {
        assert_eq!(parse_document_date("2025-03-01").unwrap(), ymd(2025, 3, 1));
        assert_eq!(parse_document_date(" 2024-02-29 ").unwrap(), ymd(2024, 2, 29));
    }

    #[test]
    fn test_indonesian_and_english_names() {
        assert_eq!(parse_document_date("17 Agustus 2025").unwrap(), ymd(2025, 8, 17));
        assert_eq!(parse_document_date("1 MEI 2024").unwrap(), ymd(2024, 5, 1));
        assert_eq!(parse_document_date("3 march 2024").unwrap(), ymd(2024, 3, 3));
        assert_eq!(parse_document_date("09  Desember   2023").unwrap(), ymd(2023, 12, 9));
    }

    #[test]
    fn test_rejects_invalid() {
        for input in ["", "2025-13-01", "31 Februari 2025", "17 Agt 2025", "17 Agustus", "yesterday"] {
            let err = parse_document_date(input).unwrap_err();
            assert!(matches!(err, LifecycleError::InvalidInput(_)), "{input}");
        }
    }

    #[test]
    fn test_format_long_date() {
        assert_eq!(format_long_date(ymd(2025, 8, 17)), "17 Agustus 2025");
        assert_eq!(format_long_date(ymd(2024, 1, 5)), "5 Januari 2024");
    }
}
