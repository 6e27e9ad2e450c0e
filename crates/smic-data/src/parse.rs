//! Cell-level parsing shared by the ledger and price loaders.

use chrono::NaiveDate;
use csv::StringRecord;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Normalise a header cell for alias matching.
fn normalize(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_ascii_lowercase()
        .replace(['_', ' '], "")
}

/// Index of the first header matching any alias.
pub(crate) fn find_column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(normalize).collect();
    aliases.iter().find_map(|alias| {
        let alias = normalize(alias);
        normalized.iter().position(|h| *h == alias)
    })
}

/// Trimmed, non-empty cell value.
pub(crate) fn cell(record: &StringRecord, index: Option<usize>) -> Option<&str> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parse a numeric cell, tolerating currency symbols and thousands separators.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2024-01-31", Some((2024, 1, 31)))]
    #[case("01/31/2024", Some((2024, 1, 31)))]
    #[case("2024/01/31", Some((2024, 1, 31)))]
    #[case("31.01.2024", None)]
    #[case("", None)]
    fn test_parse_date(#[case] raw: &str, #[case] expected: Option<(i32, u32, u32)>) {
        let expected = expected.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        assert_eq!(parse_date(raw), expected);
    }

    #[rstest]
    #[case("12.5", Some(12.5))]
    #[case("$1,234.50", Some(1234.5))]
    #[case("-3", Some(-3.0))]
    #[case("NaN", None)]
    #[case("abc", None)]
    fn test_parse_number(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_number(raw), expected);
    }

    #[test]
    fn test_find_column_is_case_and_spacing_insensitive() {
        let headers = StringRecord::from(vec!["\u{feff}Date", "Ticker", "Adj Close"]);
        assert_eq!(find_column(&headers, &["date"]), Some(0));
        assert_eq!(find_column(&headers, &["symbol", "ticker"]), Some(1));
        assert_eq!(find_column(&headers, &["close", "adj_close"]), Some(2));
        assert_eq!(find_column(&headers, &["volume"]), None);
    }
}
