//! Holdings reconstruction
//!
//! Replays the ledger in date order and records, for every observation date,
//! what the portfolio held and what it was worth. Each snapshot is a pure
//! function of the ledger prefix and the price book up to that date.
//!
//! Running state per instrument:
//! - quantity and total cost basis (average cost = basis / quantity)
//! - realized P&L: sale proceeds minus average cost of the units sold
//! - dividend income
//!
//! The observation grid is the union of ledger dates and quote dates for the
//! traded symbols, from the first transaction up to `as_of`.

use crate::error::{AnalyticsError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smic_data::{Action, InstrumentClass, Ledger, PriceBook, PriceHistory, TransactionEvent};
use std::collections::{BTreeMap, BTreeSet};

/// Static attributes of a traded instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    /// Ticker.
    pub symbol: String,
    /// Sector tag.
    pub sector: String,
    /// ETF or Stock.
    pub class: InstrumentClass,
}

/// One open position on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Units held at end of day.
    pub quantity: f64,
    /// Remaining cost basis of those units.
    pub cost_basis: f64,
    /// Weighted-average cost per unit.
    pub average_cost: f64,
    /// Forward-filled price used for valuation.
    pub price: f64,
    /// quantity × price
    pub market_value: f64,
}

impl Holding {
    /// Market value minus cost basis.
    pub fn unrealized_pnl(&self) -> f64 {
        self.market_value - self.cost_basis
    }
}

/// Cash that moved in or out of one instrument on one date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentFlows {
    /// Cash spent on purchases.
    pub purchases: f64,
    /// Cash received from sales.
    pub sales: f64,
    /// Dividend cash received.
    pub dividends: f64,
}

impl InstrumentFlows {
    fn add(&mut self, other: &Self) {
        self.purchases += other.purchases;
        self.sales += other.sales;
        self.dividends += other.dividends;
    }
}

/// Holdings and flows at the end of one observation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSnapshot {
    /// Observation date.
    pub date: NaiveDate,
    /// Open positions keyed by symbol.
    pub holdings: BTreeMap<String, Holding>,
    /// Flows recorded on this date keyed by symbol.
    pub flows: BTreeMap<String, InstrumentFlows>,
}

impl HoldingSnapshot {
    /// Sum of market values.
    pub fn total_value(&self) -> f64 {
        self.holdings.values().map(|h| h.market_value).sum()
    }

    /// Quantity held of a symbol (zero when not held).
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.holdings.get(symbol).map_or(0.0, |h| h.quantity)
    }

    /// Sum of all flows on this date.
    pub fn total_flows(&self) -> InstrumentFlows {
        let mut total = InstrumentFlows::default();
        for flow in self.flows.values() {
            total.add(flow);
        }
        total
    }
}

/// Lifetime totals for one instrument at the end of the replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    /// Units still held.
    pub quantity: f64,
    /// Cost basis of units still held.
    pub cost_basis: f64,
    /// Gains realized on sales.
    pub realized_pnl: f64,
    /// Dividend income received.
    pub dividends: f64,
    /// Total cash spent on purchases.
    pub invested: f64,
    /// Total cash received from sales.
    pub proceeds: f64,
}

impl PositionSummary {
    fn average_cost(&self) -> f64 {
        if self.quantity > 0.0 {
            self.cost_basis / self.quantity
        } else {
            0.0
        }
    }
}

/// Output of a reconstruction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingsHistory {
    snapshots: Vec<HoldingSnapshot>,
    instruments: BTreeMap<String, InstrumentInfo>,
    positions: BTreeMap<String, PositionSummary>,
    transaction_count: usize,
}

impl HoldingsHistory {
    /// Snapshots in date order.
    pub fn snapshots(&self) -> &[HoldingSnapshot] {
        &self.snapshots
    }

    /// Snapshot in effect on `date` (the latest one at or before it).
    pub fn at(&self, date: NaiveDate) -> Option<&HoldingSnapshot> {
        let idx = self.snapshots.partition_point(|s| s.date <= date);
        idx.checked_sub(1).map(|i| &self.snapshots[i])
    }

    /// Observation dates in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.snapshots.iter().map(|s| s.date).collect()
    }

    /// First observation date.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.snapshots.first().map(|s| s.date)
    }

    /// Last observation date.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.snapshots.last().map(|s| s.date)
    }

    /// Final snapshot.
    pub fn latest(&self) -> Option<&HoldingSnapshot> {
        self.snapshots.last()
    }

    /// Attributes of every instrument that appeared in the ledger.
    pub fn instruments(&self) -> &BTreeMap<String, InstrumentInfo> {
        &self.instruments
    }

    /// Lifetime totals per instrument.
    pub fn positions(&self) -> &BTreeMap<String, PositionSummary> {
        &self.positions
    }

    /// Number of ledger events replayed.
    pub const fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    /// Gains realized on sales across all instruments.
    pub fn realized_pnl(&self) -> f64 {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    /// Dividend income across all instruments.
    pub fn dividend_income(&self) -> f64 {
        self.positions.values().map(|p| p.dividends).sum()
    }

    /// Market value minus cost basis of the final holdings.
    pub fn unrealized_pnl(&self) -> f64 {
        self.latest()
            .map_or(0.0, |s| s.holdings.values().map(Holding::unrealized_pnl).sum())
    }

    /// Purchases minus sale proceeds over the whole history.
    pub fn net_invested(&self) -> f64 {
        self.positions.values().map(|p| p.invested - p.proceeds).sum()
    }

    /// Sectors that appear in the ledger, sorted.
    pub fn sectors(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.instruments.values().map(|i| i.sector.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }
}

/// Replays a ledger against a price book.
#[derive(Debug, Clone)]
pub struct HoldingsReconstructor {
    quantity_tolerance: f64,
}

impl Default for HoldingsReconstructor {
    fn default() -> Self {
        Self {
            quantity_tolerance: 1e-9,
        }
    }
}

impl HoldingsReconstructor {
    /// Create a reconstructor.
    ///
    /// `quantity_tolerance` absorbs floating-point dust when comparing a sale
    /// against the held quantity, and is the threshold below which a position
    /// counts as closed.
    pub fn new(quantity_tolerance: f64) -> Result<Self> {
        if !quantity_tolerance.is_finite() || quantity_tolerance < 0.0 {
            return Err(AnalyticsError::InvalidParameter(format!(
                "quantity tolerance must be a non-negative number, got {quantity_tolerance}"
            )));
        }
        Ok(Self { quantity_tolerance })
    }

    /// Reconstruct holdings for every observation date up to `as_of`.
    ///
    /// Events dated after `as_of` are ignored.
    ///
    /// # Errors
    ///
    /// [`AnalyticsError::LedgerIntegrity`] when a sale exceeds the quantity
    /// held, [`AnalyticsError::NoActivity`] when nothing happened by `as_of`.
    pub fn reconstruct(
        &self,
        ledger: &Ledger,
        prices: &PriceBook,
        as_of: NaiveDate,
    ) -> Result<HoldingsHistory> {
        let events: Vec<&TransactionEvent> = ledger.iter().filter(|e| e.date <= as_of).collect();
        let Some(first) = events.first().map(|e| e.date) else {
            return Err(AnalyticsError::NoActivity(as_of));
        };
        let skipped = ledger.len() - events.len();
        if skipped > 0 {
            tracing::warn!(skipped, %as_of, "ignoring transactions dated after the analysis date");
        }

        let instruments = instrument_table(&events);
        let valuation_prices = valuation_prices(&events, prices);

        let mut grid: BTreeSet<NaiveDate> = events.iter().map(|e| e.date).collect();
        grid.extend(
            prices
                .dates_for(instruments.keys().map(String::as_str))
                .into_iter()
                .filter(|d| *d >= first && *d <= as_of),
        );

        let mut positions: BTreeMap<String, PositionSummary> = BTreeMap::new();
        let mut snapshots = Vec::with_capacity(grid.len());
        let mut cursor = 0;

        for date in grid {
            let mut flows: BTreeMap<String, InstrumentFlows> = BTreeMap::new();
            while let Some(event) = events.get(cursor).filter(|e| e.date <= date) {
                let position = positions.entry(event.symbol.clone()).or_default();
                let flow = flows.entry(event.symbol.clone()).or_default();
                self.apply(event, cursor + 1, position, flow)?;
                cursor += 1;
            }

            let holdings = positions
                .iter()
                .filter(|(_, p)| p.quantity > self.quantity_tolerance)
                .map(|(symbol, p)| {
                    let price = valuation_prices
                        .get(symbol)
                        .and_then(|h| h.price_at(date))
                        .unwrap_or_else(|| p.average_cost());
                    let holding = Holding {
                        quantity: p.quantity,
                        cost_basis: p.cost_basis,
                        average_cost: p.average_cost(),
                        price,
                        market_value: p.quantity * price,
                    };
                    (symbol.clone(), holding)
                })
                .collect();

            snapshots.push(HoldingSnapshot {
                date,
                holdings,
                flows,
            });
        }

        tracing::debug!(
            snapshots = snapshots.len(),
            instruments = instruments.len(),
            "reconstructed holdings"
        );

        Ok(HoldingsHistory {
            snapshots,
            instruments,
            positions,
            transaction_count: events.len(),
        })
    }

    fn apply(
        &self,
        event: &TransactionEvent,
        entry: usize,
        position: &mut PositionSummary,
        flow: &mut InstrumentFlows,
    ) -> Result<()> {
        match event.action {
            Action::Buy => {
                position.quantity += event.quantity;
                position.cost_basis += event.amount;
                position.invested += event.amount;
                flow.purchases += event.amount;
            }
            Action::Sell => {
                if event.quantity > position.quantity + self.quantity_tolerance {
                    return Err(AnalyticsError::LedgerIntegrity {
                        date: event.date,
                        symbol: event.symbol.clone(),
                        requested: event.quantity,
                        held: position.quantity,
                        entry,
                    });
                }
                let sold = event.quantity.min(position.quantity);
                let cost_of_sold = position.average_cost() * sold;
                position.realized_pnl += event.amount - cost_of_sold;
                position.cost_basis -= cost_of_sold;
                position.quantity -= sold;
                position.proceeds += event.amount;
                if position.quantity <= self.quantity_tolerance {
                    position.quantity = 0.0;
                    position.cost_basis = 0.0;
                }
                flow.sales += event.amount;
            }
            Action::Dividend => {
                position.dividends += event.amount;
                flow.dividends += event.amount;
            }
        }
        Ok(())
    }
}

/// Sector and class per symbol, taken from its first ledger entry.
fn instrument_table(events: &[&TransactionEvent]) -> BTreeMap<String, InstrumentInfo> {
    let mut table: BTreeMap<String, InstrumentInfo> = BTreeMap::new();
    for event in events {
        match table.get(&event.symbol) {
            Some(info) if info.sector != event.sector || info.class != event.class => {
                tracing::warn!(
                    symbol = %event.symbol,
                    first_sector = %info.sector,
                    sector = %event.sector,
                    "instrument tagged inconsistently; keeping first classification"
                );
            }
            Some(_) => {}
            None => {
                table.insert(
                    event.symbol.clone(),
                    InstrumentInfo {
                        symbol: event.symbol.clone(),
                        sector: event.sector.clone(),
                        class: event.class,
                    },
                );
            }
        }
    }
    table
}

/// Quote history per traded symbol, with trade prices filling dates the
/// quotes do not cover.
fn valuation_prices(
    events: &[&TransactionEvent],
    prices: &PriceBook,
) -> BTreeMap<String, PriceHistory> {
    let mut trade_prices: BTreeMap<&str, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for event in events {
        let entry = trade_prices.entry(event.symbol.as_str()).or_default();
        if event.action != Action::Dividend && event.price > 0.0 {
            entry.push((event.date, event.price));
        }
    }

    trade_prices
        .into_iter()
        .map(|(symbol, trades)| {
            let history = prices.get(symbol).map_or_else(
                || PriceHistory::new(trades.iter().copied()),
                |quotes| quotes.with_fallback(trades.iter().copied()),
            );
            if prices.get(symbol).is_none() {
                tracing::warn!(symbol, "no quote history; valuing at trade prices");
            }
            (symbol.to_string(), history)
        })
        .collect()
}
