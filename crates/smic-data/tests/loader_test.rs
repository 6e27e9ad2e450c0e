//! File-based loader tests.

use chrono::NaiveDate;
use smic_data::{DataError, InstrumentClass, Ledger, PriceBook};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_ledger_from_path() {
    let file = write_temp(
        "Date,Symbol,Sector,Type,Action,Quantity,Price\n\
         2024-01-01,XLK,Technology,ETF,Buy,10,200\n\
         2024-01-15,AAPL,Technology,Stock,Buy,5,185\n\
         2024-03-01,AAPL,Technology,Stock,Sell,2,190\n",
    );

    let ledger = Ledger::from_path(file.path()).unwrap();
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.symbols(), vec!["AAPL", "XLK"]);
    assert_eq!(
        ledger.classes_in_sector("Technology").len(),
        InstrumentClass::all().len()
    );
}

#[test]
fn test_missing_file_names_the_path() {
    let err = Ledger::from_path("/definitely/not/here/transactions.csv").unwrap_err();
    assert!(matches!(err, DataError::File { .. }));
    assert!(err.to_string().contains("transactions.csv"));
}

#[test]
fn test_price_book_from_path_and_merge() {
    let quotes = write_temp(
        "Date,Ticker,Adj Close\n\
         2024-01-02,XLK,201.0\n\
         2024-01-03,XLK,203.5\n",
    );
    let index = write_temp(
        "Date,Symbol,Close\n\
         2020-01-02,SPY,324.9\n\
         2024-01-03,SPY,470.0\n",
    );

    let book = PriceBook::from_path(quotes.path())
        .unwrap()
        .merge(PriceBook::from_path(index.path()).unwrap());

    let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    assert_eq!(book.len(), 2);
    assert_eq!(book.price_at("XLK", day), Some(201.0));
    assert_eq!(book.price_at("SPY", day), Some(324.9));
}
