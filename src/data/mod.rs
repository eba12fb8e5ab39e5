pub mod csv_loader;
pub mod order_cache;
pub mod quote_bundle;

pub use csv_loader::load_quotes;
pub use order_cache::OrderCache;
pub use quote_bundle::{Bar, QuoteBundle};
