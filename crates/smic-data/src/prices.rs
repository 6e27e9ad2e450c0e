//! Price history loading and point-in-time lookup.
//!
//! Quotes are stored per symbol as a sorted list of `(date, close)` points.
//! Lookups forward-fill: the price on a date without a quote is the last
//! close at or before it. There is no back-fill and no interpolation.

use crate::error::{DataError, Result, RowViolation};
use crate::parse::{cell, find_column, parse_date, parse_number};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const SOURCE: &str = "prices";

/// Ordered close prices for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    points: Vec<(NaiveDate, f64)>,
}

impl PriceHistory {
    /// Build a history from unordered points.
    ///
    /// When a date appears more than once the last occurrence wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use smic_data::PriceHistory;
    ///
    /// let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
    /// let history = PriceHistory::new([(d(1, 1), 10.0), (d(6, 1), 12.0)]);
    ///
    /// assert_eq!(history.price_at(d(3, 15)), Some(10.0));
    /// assert_eq!(history.price_at(d(6, 1)), Some(12.0));
    /// assert_eq!(history.price_at(d(12, 31)), Some(12.0));
    /// ```
    pub fn new(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let mut raw: Vec<(NaiveDate, f64)> = points.into_iter().collect();
        raw.sort_by_key(|(date, _)| *date);

        let mut points: Vec<(NaiveDate, f64)> = Vec::with_capacity(raw.len());
        for (date, price) in raw {
            match points.last_mut() {
                Some(last) if last.0 == date => last.1 = price,
                _ => points.push((date, price)),
            }
        }
        Self { points }
    }

    /// Close at or before `date`, if any quote precedes it.
    pub fn price_at(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.points.partition_point(|(d, _)| *d <= date);
        idx.checked_sub(1).map(|i| self.points[i].1)
    }

    /// Close quoted exactly on `date`.
    pub fn quote_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|i| self.points[i].1)
    }

    /// Fill dates this history does not cover with points from `fallback`.
    ///
    /// Existing quotes take precedence on dates present in both.
    pub fn with_fallback(&self, fallback: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let extra = fallback
            .into_iter()
            .filter(|(date, _)| self.quote_on(*date).is_none());
        Self::new(self.points.iter().copied().chain(extra))
    }

    /// All points in date order.
    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    /// Quote dates in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|(d, _)| *d)
    }

    /// Earliest quote date.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    /// Latest quote date.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }

    /// Number of quotes.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the history has no quotes.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Price histories keyed by upper-cased symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBook {
    series: BTreeMap<String, PriceHistory>,
}

impl PriceBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a long-format quote file (`Date, Symbol, Close`).
    ///
    /// Every invalid row is collected before failing.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        let date_col = find_column(&headers, &["date"]).ok_or(DataError::MissingColumn {
            source_name: SOURCE,
            column: "Date",
        })?;
        let symbol_col =
            find_column(&headers, &["symbol", "ticker"]).ok_or(DataError::MissingColumn {
                source_name: SOURCE,
                column: "Symbol",
            })?;
        let close_col = find_column(&headers, &["close", "adj close", "adjusted close", "price"])
            .ok_or(DataError::MissingColumn {
                source_name: SOURCE,
                column: "Close",
            })?;

        let mut grouped: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        let mut violations = Vec::new();
        let mut rows = 0usize;

        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            let row = i + 1;
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            rows += 1;

            let date = match cell(&record, Some(date_col)) {
                Some(raw) => parse_date(raw).or_else(|| {
                    violations.push(RowViolation::new(row, "Date", format!("invalid date '{raw}'")));
                    None
                }),
                None => {
                    violations.push(RowViolation::new(row, "Date", "missing value"));
                    None
                }
            };
            let symbol = cell(&record, Some(symbol_col)).map(str::to_ascii_uppercase);
            if symbol.is_none() {
                violations.push(RowViolation::new(row, "Symbol", "missing value"));
            }
            let close = match cell(&record, Some(close_col)) {
                Some(raw) => match parse_number(raw) {
                    Some(v) if v >= 0.0 => Some(v),
                    Some(v) => {
                        violations.push(RowViolation::new(
                            row,
                            "Close",
                            format!("must be non-negative, got {v}"),
                        ));
                        None
                    }
                    None => {
                        violations.push(RowViolation::new(
                            row,
                            "Close",
                            format!("invalid number '{raw}'"),
                        ));
                        None
                    }
                },
                None => {
                    violations.push(RowViolation::new(row, "Close", "missing value"));
                    None
                }
            };

            if let (Some(date), Some(symbol), Some(close)) = (date, symbol, close) {
                grouped.entry(symbol).or_default().push((date, close));
            }
        }

        if !violations.is_empty() {
            return Err(DataError::Validation {
                source_name: SOURCE,
                violations,
            });
        }
        if rows == 0 {
            return Err(DataError::Empty(SOURCE));
        }

        let series = grouped
            .into_iter()
            .map(|(symbol, points)| (symbol, PriceHistory::new(points)))
            .collect();
        Ok(Self { series })
    }

    /// Load a quote file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DataError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let book = Self::from_reader(file)?;
        tracing::info!(path = %path.display(), symbols = book.len(), "loaded price history");
        Ok(book)
    }

    /// Insert or replace a symbol's history.
    pub fn insert(&mut self, symbol: impl Into<String>, history: PriceHistory) {
        self.series.insert(symbol.into().to_ascii_uppercase(), history);
    }

    /// Combine two books. Quotes from `other` win on overlapping dates.
    pub fn merge(mut self, other: Self) -> Self {
        for (symbol, history) in other.series {
            let merged = match self.series.remove(&symbol) {
                Some(existing) => history.with_fallback(existing.points),
                None => history,
            };
            self.series.insert(symbol, merged);
        }
        self
    }

    /// History for a symbol.
    pub fn get(&self, symbol: &str) -> Option<&PriceHistory> {
        self.series.get(&symbol.to_ascii_uppercase())
    }

    /// Forward-filled close for a symbol on a date.
    pub fn price_at(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        self.get(symbol).and_then(|h| h.price_at(date))
    }

    /// Symbols in the book, sorted.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Union of quote dates across the given symbols.
    pub fn dates_for<'a>(&self, symbols: impl IntoIterator<Item = &'a str>) -> BTreeSet<NaiveDate> {
        symbols
            .into_iter()
            .filter_map(|s| self.get(s))
            .flat_map(PriceHistory::dates)
            .collect()
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether the book holds no symbols.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
