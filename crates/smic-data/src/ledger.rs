//! Transaction ledger loading and validation.
//!
//! The ledger is the single source of truth for what the portfolio held and
//! when. Rows are validated once here; everything downstream works on typed
//! [`TransactionEvent`]s and assumes they are well formed.

use crate::error::{DataError, Result, RowViolation};
use crate::parse::{cell, find_column, parse_date, parse_number};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const SOURCE: &str = "transactions";

/// Whether an instrument is a fund or an individual company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstrumentClass {
    /// Exchange-traded fund
    #[serde(rename = "ETF")]
    Etf,

    /// Individual stock
    #[serde(rename = "Stocks")]
    Stock,
}

impl InstrumentClass {
    /// Both classes, ETF first.
    pub const fn all() -> [Self; 2] {
        [Self::Etf, Self::Stock]
    }

    /// Display label used in tables and chart legends.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Etf => "ETF",
            Self::Stock => "Stocks",
        }
    }

    /// Parse a class code from the ledger.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ETF" | "ETFS" | "FUND" => Some(Self::Etf),
            "STOCK" | "STOCKS" | "EQUITY" | "INDIVIDUAL STOCK" => Some(Self::Stock),
            _ => None,
        }
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Purchase of units.
    Buy,
    /// Sale of units.
    Sell,
    /// Cash distribution; units unchanged.
    Dividend,
}

impl Action {
    /// Parse an action code from the ledger.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BUY" | "BOUGHT" => Some(Self::Buy),
            "SELL" | "SOLD" => Some(Self::Sell),
            "DIVIDEND" | "DIV" => Some(Self::Dividend),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buy => "Buy",
            Self::Sell => "Sell",
            Self::Dividend => "Dividend",
        };
        f.write_str(name)
    }
}

/// One validated ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    /// Trade or ex-dividend date.
    pub date: NaiveDate,

    /// Upper-cased ticker.
    pub symbol: String,

    /// Sector tag.
    pub sector: String,

    /// ETF or individual stock.
    pub class: InstrumentClass,

    /// Buy, sell, or dividend.
    pub action: Action,

    /// Units traded (zero for most dividends).
    pub quantity: f64,

    /// Price per unit.
    pub price: f64,

    /// Cash value of the event. Direction comes from `action`.
    pub amount: f64,
}

impl TransactionEvent {
    /// Quantity with the sign it contributes to holdings.
    pub const fn signed_quantity(&self) -> f64 {
        match self.action {
            Action::Buy => self.quantity,
            Action::Sell => -self.quantity,
            Action::Dividend => 0.0,
        }
    }

    fn check(&self, row: usize, violations: &mut Vec<RowViolation>) {
        if self.symbol.trim().is_empty() {
            violations.push(RowViolation::new(row, "Symbol", "missing value"));
        }
        if self.sector.trim().is_empty() {
            violations.push(RowViolation::new(row, "Sector", "missing value"));
        }
        for (field, value) in [
            ("Quantity", self.quantity),
            ("Price", self.price),
            ("Amount", self.amount),
        ] {
            if !value.is_finite() || value < 0.0 {
                violations.push(RowViolation::new(
                    row,
                    field,
                    format!("must be a non-negative number, got {value}"),
                ));
            }
        }
        match self.action {
            Action::Buy | Action::Sell if self.quantity == 0.0 => {
                violations.push(RowViolation::new(
                    row,
                    "Quantity",
                    format!("{} requires a positive quantity", self.action),
                ));
            }
            Action::Dividend if self.amount == 0.0 => {
                violations.push(RowViolation::new(
                    row,
                    "Amount",
                    "dividend requires an amount or quantity and price",
                ));
            }
            _ => {}
        }
    }
}

/// Column positions resolved from the header row.
#[derive(Debug)]
struct LedgerColumns {
    date: usize,
    symbol: usize,
    sector: usize,
    class: usize,
    action: usize,
    quantity: Option<usize>,
    price: Option<usize>,
    amount: Option<usize>,
}

impl LedgerColumns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let required = |column: &'static str, aliases: &[&str]| {
            find_column(headers, aliases).ok_or(DataError::MissingColumn {
                source_name: SOURCE,
                column,
            })
        };

        Ok(Self {
            date: required("Date", &["date", "trade date", "transaction date"])?,
            symbol: required("Symbol", &["symbol", "ticker"])?,
            sector: required("Sector", &["sector"])?,
            class: required("Type", &["type", "class", "instrument class", "asset type"])?,
            action: required("Action", &["action", "transaction", "side"])?,
            quantity: find_column(headers, &["quantity", "shares", "units"]),
            price: find_column(headers, &["price", "unit price"]),
            amount: find_column(headers, &["amount", "total", "value"]),
        })
    }
}

/// Date-ordered, validated transaction history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    events: Vec<TransactionEvent>,
}

impl Ledger {
    /// Build a ledger from already-typed events.
    ///
    /// Events are checked with the same rules as file input (row numbers are
    /// 1-based positions in `events`) and then sorted by date. The sort is
    /// stable, so same-day events keep their input order.
    pub fn from_events(events: Vec<TransactionEvent>) -> Result<Self> {
        let mut violations = Vec::new();
        for (i, event) in events.iter().enumerate() {
            event.check(i + 1, &mut violations);
        }
        if !violations.is_empty() {
            return Err(DataError::Validation {
                source_name: SOURCE,
                violations,
            });
        }
        if events.is_empty() {
            return Err(DataError::Empty(SOURCE));
        }

        let mut events = events;
        events.sort_by_key(|e| e.date);
        Ok(Self { events })
    }

    /// Parse a ledger from CSV text.
    ///
    /// All rows are validated before returning; if any fail, the error lists
    /// every violation rather than only the first.
    ///
    /// # Examples
    ///
    /// ```
    /// use smic_data::{Action, Ledger};
    ///
    /// let csv = "Date,Symbol,Sector,Type,Action,Quantity,Price\n\
    ///            2024-01-01,aaa,Tech,Stock,Buy,10,10\n";
    /// let ledger = Ledger::from_reader(csv.as_bytes()).unwrap();
    ///
    /// assert_eq!(ledger.len(), 1);
    /// assert_eq!(ledger.events()[0].symbol, "AAA");
    /// assert_eq!(ledger.events()[0].action, Action::Buy);
    /// assert_eq!(ledger.events()[0].amount, 100.0);
    /// ```
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let columns = LedgerColumns::resolve(rdr.headers()?)?;

        let mut events = Vec::new();
        let mut violations = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            if let Some(event) = parse_row(&record, i + 1, &columns, &mut violations) {
                events.push(event);
            }
        }

        if !violations.is_empty() {
            return Err(DataError::Validation {
                source_name: SOURCE,
                violations,
            });
        }

        let ledger = Self::from_events(events)?;
        tracing::debug!(
            events = ledger.len(),
            symbols = ledger.symbols().len(),
            "parsed transaction ledger"
        );
        Ok(ledger)
    }

    /// Load a ledger from a CSV file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DataError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let ledger = Self::from_reader(file)?;
        tracing::info!(path = %path.display(), events = ledger.len(), "loaded ledger");
        Ok(ledger)
    }

    /// All events in date order.
    pub fn events(&self) -> &[TransactionEvent] {
        &self.events
    }

    /// Iterate over events in date order.
    pub fn iter(&self) -> std::slice::Iter<'_, TransactionEvent> {
        self.events.iter()
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the ledger has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Date of the earliest event.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.events.first().map(|e| e.date)
    }

    /// Date of the latest event.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.events.last().map(|e| e.date)
    }

    /// Distinct symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.events.iter().map(|e| e.symbol.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Distinct sectors, sorted.
    pub fn sectors(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.events.iter().map(|e| e.sector.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Instrument classes that appear in a sector.
    pub fn classes_in_sector(&self, sector: &str) -> BTreeSet<InstrumentClass> {
        self.events
            .iter()
            .filter(|e| e.sector == sector)
            .map(|e| e.class)
            .collect()
    }

    /// Sorted, de-duplicated dates of events matching the filters.
    pub fn transaction_dates(
        &self,
        sector: Option<&str>,
        class: Option<InstrumentClass>,
    ) -> Vec<NaiveDate> {
        let dates: BTreeSet<NaiveDate> = self
            .events
            .iter()
            .filter(|e| sector.is_none_or(|s| e.sector == s))
            .filter(|e| class.is_none_or(|c| e.class == c))
            .map(|e| e.date)
            .collect();
        dates.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a TransactionEvent;
    type IntoIter = std::slice::Iter<'a, TransactionEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Parse one record, recording every problem found.
fn parse_row(
    record: &csv::StringRecord,
    row: usize,
    columns: &LedgerColumns,
    violations: &mut Vec<RowViolation>,
) -> Option<TransactionEvent> {
    let before = violations.len();

    let date = match cell(record, Some(columns.date)) {
        None => {
            violations.push(RowViolation::new(row, "Date", "missing value"));
            None
        }
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                violations.push(RowViolation::new(row, "Date", format!("invalid date '{raw}'")));
            }
            parsed
        }
    };

    let symbol = cell(record, Some(columns.symbol)).map(str::to_ascii_uppercase);
    if symbol.is_none() {
        violations.push(RowViolation::new(row, "Symbol", "missing value"));
    }

    let sector = cell(record, Some(columns.sector)).map(str::to_string);
    if sector.is_none() {
        violations.push(RowViolation::new(row, "Sector", "missing value"));
    }

    let class = match cell(record, Some(columns.class)) {
        None => {
            violations.push(RowViolation::new(row, "Type", "missing value"));
            None
        }
        Some(raw) => {
            let parsed = InstrumentClass::parse(raw);
            if parsed.is_none() {
                violations.push(RowViolation::new(
                    row,
                    "Type",
                    format!("unknown instrument class '{raw}'"),
                ));
            }
            parsed
        }
    };

    let action = match cell(record, Some(columns.action)) {
        None => {
            violations.push(RowViolation::new(row, "Action", "missing value"));
            None
        }
        Some(raw) => {
            let parsed = Action::parse(raw);
            if parsed.is_none() {
                violations.push(RowViolation::new(
                    row,
                    "Action",
                    format!("unknown action '{raw}'"),
                ));
            }
            parsed
        }
    };

    let mut number = |field: &'static str, index: Option<usize>| -> Option<f64> {
        let raw = cell(record, index)?;
        let Some(value) = parse_number(raw) else {
            violations.push(RowViolation::new(row, field, format!("invalid number '{raw}'")));
            return None;
        };
        if value < 0.0 {
            violations.push(RowViolation::new(
                row,
                field,
                format!("must be a non-negative number, got {value}"),
            ));
        }
        Some(value)
    };
    let quantity = number("Quantity", columns.quantity).unwrap_or(0.0);
    let price = number("Price", columns.price).unwrap_or(0.0);
    let amount = number("Amount", columns.amount);

    if violations.len() > before {
        return None;
    }

    let event = TransactionEvent {
        date: date?,
        symbol: symbol?,
        sector: sector?,
        class: class?,
        action: action?,
        quantity,
        price,
        amount: amount.unwrap_or(quantity * price),
    };
    event.check(row, violations);
    (violations.len() == before).then_some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Date,Symbol,Sector,Type,Action,Quantity,Price,Amount\n";

    fn ledger(rows: &str) -> Result<Ledger> {
        Ledger::from_reader(format!("{HEADER}{rows}").as_bytes())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sorted_by_date_with_stable_ties() {
        let ledger = ledger(
            "2024-03-01,BBB,Tech,Stock,Buy,1,5,\n\
             2024-01-01,AAA,Tech,ETF,Buy,1,5,\n\
             2024-03-01,CCC,Energy,Stock,Buy,1,5,\n",
        )
        .unwrap();

        let symbols: Vec<&str> = ledger.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(ledger.first_date(), Some(date(2024, 1, 1)));
        assert_eq!(ledger.last_date(), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_amount_defaults_to_quantity_times_price() {
        let ledger = ledger(
            "2024-01-01,AAA,Tech,Stock,Buy,10,12.5,\n\
             2024-02-01,AAA,Tech,Stock,Sell,4,15,61.0\n",
        )
        .unwrap();

        assert_eq!(ledger.events()[0].amount, 125.0);
        assert_eq!(ledger.events()[1].amount, 61.0);
        assert_eq!(ledger.events()[1].signed_quantity(), -4.0);
    }

    #[test]
    fn test_negative_amount_is_a_violation() {
        let err = ledger("2024-01-01,AAA,Tech,Stock,Buy,10,10,-100\n").unwrap_err();
        let fields: Vec<&str> = err.violations().iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["Amount"]);
    }

    #[test]
    fn test_reports_all_violations_in_one_pass() {
        let err = ledger(
            ",AAA,Tech,Stock,Buy,1,5,\n\
             2024-01-02,BBB,Tech,Stock,Hold,1,5,\n\
             2024-01-03,CCC,Tech,Stock,Buy,-2,5,\n\
             2024-01-04,DDD,Tech,Bond,Buy,1,-5,\n\
             2024-01-05,EEE,Tech,Stock,Buy,1,5,\n",
        )
        .unwrap_err();

        let violations = err.violations();
        let rows: Vec<(usize, &str)> = violations.iter().map(|v| (v.row, v.field)).collect();
        assert_eq!(
            rows,
            vec![
                (1, "Date"),
                (2, "Action"),
                (3, "Quantity"),
                (4, "Type"),
                (4, "Price"),
            ]
        );
    }

    #[test]
    fn test_sign_errors_are_not_hidden_by_other_fields() {
        let err = ledger("2024-01-04,DDD,Tech,Bond,Buy,-1,-5,\n").unwrap_err();
        let fields: Vec<&str> = err.violations().iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["Type", "Quantity", "Price"]);
    }

    #[test]
    fn test_negative_price_is_reported_when_row_otherwise_parses() {
        let err = ledger("2024-01-04,DDD,Tech,Stock,Buy,1,-5,\n").unwrap_err();
        assert_eq!(err.violations()[0].field, "Price");
    }

    #[test]
    fn test_missing_required_column() {
        let err = Ledger::from_reader("Date,Symbol,Type,Action\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingColumn {
                column: "Sector",
                ..
            }
        ));
    }

    #[test]
    fn test_empty_ledger_is_an_error() {
        assert!(matches!(ledger(""), Err(DataError::Empty(_))));
    }

    #[test]
    fn test_dividend_requires_cash_amount() {
        let err = ledger("2024-01-05,AAA,Tech,Stock,Dividend,0,0,\n").unwrap_err();
        assert_eq!(err.violations()[0].field, "Amount");

        let ok = ledger("2024-01-05,AAA,Tech,Stock,Dividend,0,0,3.20\n").unwrap();
        assert_eq!(ok.events()[0].amount, 3.2);
        assert_eq!(ok.events()[0].signed_quantity(), 0.0);
    }

    #[test]
    fn test_sector_and_date_queries() {
        let ledger = ledger(
            "2024-01-01,XLK,Tech,ETF,Buy,1,5,\n\
             2024-01-03,AAPL,Tech,Stock,Buy,1,5,\n\
             2024-01-03,MSFT,Tech,Stock,Buy,1,5,\n\
             2024-02-01,XLE,Energy,ETF,Buy,1,5,\n",
        )
        .unwrap();

        assert_eq!(ledger.sectors(), vec!["Energy", "Tech"]);
        assert_eq!(
            ledger.classes_in_sector("Energy").into_iter().collect::<Vec<_>>(),
            vec![InstrumentClass::Etf]
        );
        assert_eq!(
            ledger.transaction_dates(Some("Tech"), Some(InstrumentClass::Stock)),
            vec![date(2024, 1, 3)]
        );
        assert_eq!(ledger.transaction_dates(None, None).len(), 3);
    }

    #[test]
    fn test_class_and_action_aliases() {
        assert_eq!(InstrumentClass::parse("etf"), Some(InstrumentClass::Etf));
        assert_eq!(InstrumentClass::parse("Stocks"), Some(InstrumentClass::Stock));
        assert_eq!(Action::parse("sold"), Some(Action::Sell));
        assert_eq!(Action::parse("DIV"), Some(Action::Dividend));
        assert_eq!(Action::parse("split"), None);
    }
}
