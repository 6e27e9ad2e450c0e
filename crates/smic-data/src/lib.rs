#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/gcsu-smic/smic-analytics/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod ledger;
pub mod prices;

mod parse;

pub use error::{DataError, Result, RowViolation};
pub use ledger::{Action, InstrumentClass, Ledger, TransactionEvent};
pub use prices::{PriceBook, PriceHistory};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
