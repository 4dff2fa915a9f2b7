//! Price lookup, the reference unit of work.

pub mod args;
pub mod lookup;
pub mod source;

pub use args::{DEFAULT_CURRENCY, PriceArgs};
pub use lookup::{PriceLookup, PriceQuote, QUOTE_SOURCE};
pub use source::{HttpPriceSource, MockPriceSource, PriceSource};
