//! Hash-chained traceability log for blood units.

mod chain;

pub use chain::*;
