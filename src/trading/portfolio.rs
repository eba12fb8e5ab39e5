use crate::data::QuoteBundle;
use crate::error::EvaluationError;
use crate::types::{QuoteKind, Trade};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// An open long position in one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub symbol: String,
    pub entry_day: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: f64,
}

/// Cash plus open positions plus the trade log, mutated day by day while a
/// rule pair is simulated.
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub initial_capital: f64,
    pub cash: f64,
    pub positions: HashMap<String, Position>,
    pub trades: Vec<Trade>,
    pub fees_paid: f64,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: HashMap::new(),
            trades: Vec::new(),
            fees_paid: 0.0,
        }
    }

    pub fn holds(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Days the position in `symbol` has been held as of `day` (0 if none).
    pub fn days_held(&self, symbol: &str, day: usize) -> usize {
        self.positions
            .get(symbol)
            .map(|p| day.saturating_sub(p.entry_day))
            .unwrap_or(0)
    }

    /// Buy `shares` of `symbol` at `price`, paying `cost` in fees. Returns
    /// false without mutating when cash cannot cover the purchase.
    pub fn open_position(
        &mut self,
        symbol: &str,
        day: usize,
        date: NaiveDate,
        price: f64,
        shares: f64,
        cost: f64,
    ) -> bool {
        let outlay = shares * price + cost;
        if shares <= 0.0 || outlay > self.cash {
            return false;
        }
        self.cash -= outlay;
        self.fees_paid += cost;
        self.positions.insert(
            symbol.to_string(),
            Position {
                symbol: symbol.to_string(),
                entry_day: day,
                entry_date: date,
                entry_price: price,
                shares,
            },
        );
        true
    }

    /// Sell the whole position in `symbol` at `price`, paying `cost` in fees.
    pub fn close_position(&mut self, symbol: &str, date: NaiveDate, price: f64, cost: f64) {
        if let Some(position) = self.positions.remove(symbol) {
            let proceeds = position.shares * price - cost;
            self.cash += proceeds;
            self.fees_paid += cost;
            self.trades.push(Trade {
                symbol: position.symbol,
                entry_date: position.entry_date,
                exit_date: date,
                entry_price: position.entry_price,
                exit_price: price,
                shares: position.shares,
                profit: (price - position.entry_price) * position.shares - cost,
                fees: cost,
            });
        }
    }

    /// Mark-to-market value on `day`: cash plus open positions at that day's
    /// close. Fails when a held symbol has no quote that day.
    pub fn value_on(&self, quotes: &QuoteBundle, day: usize) -> Result<f64, EvaluationError> {
        let mut total = self.cash;
        for position in self.positions.values() {
            let close = quotes.quote(&position.symbol, QuoteKind::Close, day, 0)?;
            total += position.shares * close;
        }
        Ok(total)
    }
}
