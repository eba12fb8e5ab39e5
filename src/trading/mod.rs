pub mod paper_trade;
pub mod portfolio;

pub use paper_trade::{paper_trade, StockSizing};
pub use portfolio::{Portfolio, Position};
